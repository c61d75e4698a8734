//! `validator-keys revoke_keys`, `start_revoke_keys` and `finish_revoke_keys`.

use anyhow::Result;
use std::path::Path;

use validator_keys_core::encoding::parse_master_signature;
use validator_keys_core::ValidatorKeys;

use super::exit_code;
use super::output::{print_config_block, print_signing_request};
use crate::cli::args::SignatureArgs;

pub fn cmd_revoke_keys(keyfile: &Path) -> i32 {
    exit_code(run_revoke_keys(keyfile))
}

pub fn cmd_start_revoke_keys(keyfile: &Path) -> i32 {
    exit_code(run_start_revoke_keys(keyfile))
}

pub fn cmd_finish_revoke_keys(keyfile: &Path, args: SignatureArgs) -> i32 {
    exit_code(run_finish_revoke_keys(keyfile, args))
}

fn warn_revocation(keys: &ValidatorKeys) {
    if keys.revoked() {
        eprintln!("WARNING: Validator keys have already been revoked!\n");
    } else {
        eprintln!("WARNING: This will revoke your validator keys!\n");
    }
}

fn run_revoke_keys(keyfile: &Path) -> Result<()> {
    let mut keys = ValidatorKeys::load(keyfile)?;
    warn_revocation(&keys);

    let revocation = keys.revoke()?;
    keys.save(keyfile)?;

    print_config_block(&keys, "validator_key_revocation", &revocation);
    Ok(())
}

fn run_start_revoke_keys(keyfile: &Path) -> Result<()> {
    let mut keys = ValidatorKeys::load(keyfile)?;
    warn_revocation(&keys);

    let data = keys.start_revoke();
    keys.save(keyfile)?;

    print_signing_request(&data, "finish_revoke_keys");
    Ok(())
}

fn run_finish_revoke_keys(keyfile: &Path, args: SignatureArgs) -> Result<()> {
    let mut keys = ValidatorKeys::load(keyfile)?;

    let signature = parse_master_signature(&args.signature)?;
    let revocation = keys.finish_revoke(&signature)?;
    keys.save(keyfile)?;

    print_config_block(&keys, "validator_key_revocation", &revocation);
    Ok(())
}
