//! `validator-keys sign` and `sign_hex`.

use anyhow::Result;
use std::path::Path;

use validator_keys_core::encoding::to_hex;
use validator_keys_core::ValidatorKeys;

use super::exit_code;
use crate::cli::args::SignArgs;

pub fn cmd_sign(keyfile: &Path, args: SignArgs) -> i32 {
    exit_code(run_sign(keyfile, &args, false))
}

pub fn cmd_sign_hex(keyfile: &Path, args: SignArgs) -> i32 {
    exit_code(run_sign(keyfile, &args, true))
}

fn run_sign(keyfile: &Path, args: &SignArgs, hex_input: bool) -> Result<()> {
    let keys = ValidatorKeys::load(keyfile)?;

    if keys.revoked() {
        eprintln!("WARNING: Validator keys have been revoked!\n");
    }

    let signature = if hex_input {
        keys.sign_hex(&args.data)?
    } else {
        keys.sign(&args.data)?
    };
    println!("{}", to_hex(&signature));
    Ok(())
}
