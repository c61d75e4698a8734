//! `validator-keys set_domain`, `clear_domain` and `attest_domain`.

use anyhow::{bail, Result};
use std::path::Path;

use validator_keys_core::encoding::{encode_node_public, to_hex};
use validator_keys_core::{KeyType, ValidatorKeys};

use super::exit_code;
use super::token::{ensure_not_revoked, print_token, tokens_exhausted};

/// Ephemeral key type of the token minted when the domain changes.
const DOMAIN_TOKEN_KEY_TYPE: KeyType = KeyType::Secp256k1;

pub fn cmd_set_domain(keyfile: &Path, domain: &str) -> i32 {
    exit_code(run_set_domain(keyfile, domain))
}

pub fn cmd_attest_domain(keyfile: &Path) -> i32 {
    exit_code(run_attest_domain(keyfile))
}

/// Signed statement that the validator key controls `domain`, published in
/// the domain's `xrp-ledger.toml`.
fn attestation(keys: &ValidatorKeys, domain: &str) -> Result<String> {
    let blob = format!(
        "[domain-attestation-blob:{domain}:{}]",
        encode_node_public(keys.public_key())
    );
    Ok(to_hex(&keys.sign(blob)?))
}

fn print_attestation(keys: &ValidatorKeys, domain: &str, attestation: &str) {
    println!(
        "The domain attestation for validator {} is:\n",
        encode_node_public(keys.public_key())
    );
    println!("attestation=\"{attestation}\"\n");
    println!("Include it in the section for this validator in https://{domain}/.well-known/xrp-ledger.toml\n");
}

fn run_set_domain(keyfile: &Path, domain: &str) -> Result<()> {
    let mut keys = ValidatorKeys::load(keyfile)?;
    ensure_not_revoked(&keys)?;

    if keys.domain().unwrap_or_default() == domain {
        if domain.is_empty() {
            println!("The domain name has already been cleared");
        } else {
            println!("The domain name has already been set to {domain}");
        }
        return Ok(());
    }

    keys.set_domain(domain)?;

    if keys.is_external() {
        keys.save(keyfile)?;
        if domain.is_empty() {
            println!("The domain name has been cleared.");
        } else {
            println!("The domain name has been set to {domain}.");
        }
        println!("Run start_token to stage a token with the new domain.\n");
        return Ok(());
    }

    let token = keys
        .create_token(DOMAIN_TOKEN_KEY_TYPE)?
        .ok_or_else(tokens_exhausted)?;
    keys.save(keyfile)?;

    if domain.is_empty() {
        println!("The domain name has been cleared.\n");
    } else {
        println!("The domain name has been set to {domain}.\n");
    }
    print_token(&keys, &token);

    if !domain.is_empty() {
        print_attestation(&keys, domain, &attestation(&keys, domain)?);
    }
    Ok(())
}

fn run_attest_domain(keyfile: &Path) -> Result<()> {
    let keys = ValidatorKeys::load(keyfile)?;

    let Some(domain) = keys.domain() else {
        bail!("no domain is set; use set_domain first");
    };
    print_attestation(&keys, domain, &attestation(&keys, domain)?);
    Ok(())
}
