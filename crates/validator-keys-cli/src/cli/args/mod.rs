use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use validator_keys_core::KeyType;

#[derive(Parser, Debug)]
#[command(
    name = "validator-keys",
    version,
    about = "Manage validator master keys, tokens and revocations"
)]
pub struct Cli {
    /// Key file (default: $HOME/.ripple/validator-keys.json)
    #[arg(long, global = true, env = "VALIDATOR_KEYS_FILE", value_name = "PATH")]
    pub keyfile: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "snake_case")]
pub enum Command {
    /// Generate validator keys
    CreateKeys(CreateKeysArgs),
    /// Create a key file holding only the master public key
    CreateExternal(CreateExternalArgs),
    /// Generate a validator token
    CreateToken(TokenArgs),
    /// Stage a validator token and print the data to sign externally
    StartToken(TokenArgs),
    /// Finish a staged validator token with the external master signature
    FinishToken(SignatureArgs),
    /// Revoke validator keys
    RevokeKeys,
    /// Print the revocation data to sign externally
    StartRevokeKeys,
    /// Revoke validator keys with the external master signature
    FinishRevokeKeys(SignatureArgs),
    /// Set the domain for the validator keys and generate a new token
    SetDomain(SetDomainArgs),
    /// Clear the domain for the validator keys and generate a new token
    ClearDomain,
    /// Sign the domain attestation for the configured domain
    AttestDomain,
    /// Print the last manifest
    ShowManifest(ShowManifestArgs),
    /// Sign a string with the validator key
    Sign(SignArgs),
    /// Sign hex data with the validator key
    SignHex(SignArgs),
}

#[derive(Args, Debug)]
pub struct CreateKeysArgs {
    /// Master key type
    #[arg(long, default_value = "ed25519")]
    pub key_type: KeyType,
}

#[derive(Args, Debug)]
pub struct CreateExternalArgs {
    /// Master public key (base58, hex or base64)
    pub public_key: String,
}

#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Ephemeral key type
    #[arg(long, default_value = "secp256k1")]
    pub token_key_type: KeyType,
}

#[derive(Args, Debug)]
pub struct SignatureArgs {
    /// Master signature (hex or base64)
    pub signature: String,
}

#[derive(Args, Debug)]
pub struct SetDomainArgs {
    /// Domain, e.g. validator.example.com
    pub domain: String,
}

#[derive(Args, Debug)]
pub struct ShowManifestArgs {
    #[arg(long, value_enum, default_value_t = ManifestFormat::Base64)]
    pub format: ManifestFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestFormat {
    Base64,
    Hex,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Data to sign
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub data: String,
}

#[cfg(test)]
mod tests;
