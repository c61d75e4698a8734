//! `validator-keys create_keys` and `create_external`.

use anyhow::{bail, Result};
use std::path::Path;

use validator_keys_core::encoding::{encode_node_public, parse_public_key};
use validator_keys_core::ValidatorKeys;

use super::exit_code;
use crate::cli::args::{CreateExternalArgs, CreateKeysArgs};

pub fn cmd_create_keys(keyfile: &Path, args: CreateKeysArgs) -> i32 {
    exit_code(run_create_keys(keyfile, args))
}

pub fn cmd_create_external(keyfile: &Path, args: CreateExternalArgs) -> i32 {
    exit_code(run_create_external(keyfile, args))
}

fn refuse_overwrite(keyfile: &Path) -> Result<()> {
    if keyfile.exists() {
        bail!(
            "refusing to overwrite existing key file: {}",
            keyfile.display()
        );
    }
    Ok(())
}

fn run_create_keys(keyfile: &Path, args: CreateKeysArgs) -> Result<()> {
    refuse_overwrite(keyfile)?;

    let keys = ValidatorKeys::new(args.key_type);
    keys.save(keyfile)?;

    println!("Validator keys stored in {}\n", keyfile.display());
    println!("This file should be stored securely and not shared.\n");
    Ok(())
}

fn run_create_external(keyfile: &Path, args: CreateExternalArgs) -> Result<()> {
    refuse_overwrite(keyfile)?;

    let public_key = parse_public_key(&args.public_key)?;
    let keys = ValidatorKeys::external(public_key);
    keys.save(keyfile)?;

    println!(
        "External validator key {} stored in {}\n",
        encode_node_public(keys.public_key()),
        keyfile.display()
    );
    println!("The master secret is not in this file. Use start_token and finish_token");
    println!("to create tokens, and start_revoke_keys and finish_revoke_keys to revoke.\n");
    Ok(())
}
