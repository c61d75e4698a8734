//! `validator-keys create_token`, `start_token` and `finish_token`.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use validator_keys_core::encoding::parse_master_signature;
use validator_keys_core::{ValidatorKeys, ValidatorToken};

use super::exit_code;
use super::output::{print_config_block, print_signing_request};
use crate::cli::args::{SignatureArgs, TokenArgs};

pub fn cmd_create_token(keyfile: &Path, args: TokenArgs) -> i32 {
    exit_code(run_create_token(keyfile, args))
}

pub fn cmd_start_token(keyfile: &Path, args: TokenArgs) -> i32 {
    exit_code(run_start_token(keyfile, args))
}

pub fn cmd_finish_token(keyfile: &Path, args: SignatureArgs) -> i32 {
    exit_code(run_finish_token(keyfile, args))
}

pub(crate) fn ensure_not_revoked(keys: &ValidatorKeys) -> Result<()> {
    if keys.revoked() {
        bail!("validator keys have been revoked");
    }
    Ok(())
}

pub(crate) fn tokens_exhausted() -> anyhow::Error {
    anyhow::anyhow!(
        "maximum number of tokens have already been generated; \
         revoke validator keys if previous token has been compromised"
    )
}

pub(crate) fn print_token(keys: &ValidatorKeys, token: &ValidatorToken) {
    print_config_block(keys, "validator_token", &token.encode());
}

fn run_create_token(keyfile: &Path, args: TokenArgs) -> Result<()> {
    let mut keys = ValidatorKeys::load(keyfile)?;
    ensure_not_revoked(&keys)?;

    let token = keys
        .create_token(args.token_key_type)?
        .ok_or_else(tokens_exhausted)?;
    keys.save(keyfile)?;

    info!(sequence = keys.token_sequence(), "token created");
    print_token(&keys, &token);
    Ok(())
}

fn run_start_token(keyfile: &Path, args: TokenArgs) -> Result<()> {
    let mut keys = ValidatorKeys::load(keyfile)?;
    ensure_not_revoked(&keys)?;

    let data = keys
        .start_token(args.token_key_type)
        .ok_or_else(tokens_exhausted)?;
    keys.save(keyfile)?;

    print_signing_request(&data, "finish_token");
    Ok(())
}

fn run_finish_token(keyfile: &Path, args: SignatureArgs) -> Result<()> {
    let mut keys = ValidatorKeys::load(keyfile)?;
    ensure_not_revoked(&keys)?;

    let signature = parse_master_signature(&args.signature)?;
    let token = keys
        .finish_token(&signature)?
        .ok_or_else(tokens_exhausted)?;
    keys.save(keyfile)?;

    info!(sequence = keys.token_sequence(), "token finished");
    print_token(&keys, &token);
    Ok(())
}
