use std::path::PathBuf;

use anyhow::Result;

use super::args::*;
use crate::exit_codes;

pub mod domain;
pub mod keys;
pub mod manifest;
mod output;
pub mod revoke;
pub mod sign;
pub mod token;

pub fn dispatch(cli: Cli) -> i32 {
    let keyfile = cli.keyfile.unwrap_or_else(default_keyfile);

    match cli.cmd {
        Command::CreateKeys(args) => keys::cmd_create_keys(&keyfile, args),
        Command::CreateExternal(args) => keys::cmd_create_external(&keyfile, args),
        Command::CreateToken(args) => token::cmd_create_token(&keyfile, args),
        Command::StartToken(args) => token::cmd_start_token(&keyfile, args),
        Command::FinishToken(args) => token::cmd_finish_token(&keyfile, args),
        Command::RevokeKeys => revoke::cmd_revoke_keys(&keyfile),
        Command::StartRevokeKeys => revoke::cmd_start_revoke_keys(&keyfile),
        Command::FinishRevokeKeys(args) => revoke::cmd_finish_revoke_keys(&keyfile, args),
        Command::SetDomain(args) => domain::cmd_set_domain(&keyfile, &args.domain),
        Command::ClearDomain => domain::cmd_set_domain(&keyfile, ""),
        Command::AttestDomain => domain::cmd_attest_domain(&keyfile),
        Command::ShowManifest(args) => manifest::cmd_show_manifest(&keyfile, args),
        Command::Sign(args) => sign::cmd_sign(&keyfile, args),
        Command::SignHex(args) => sign::cmd_sign_hex(&keyfile, args),
    }
}

/// `$HOME/.ripple/validator-keys.json`, or under the current directory when
/// there is no home directory.
fn default_keyfile() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ripple")
        .join("validator-keys.json")
}

/// Print a failed command's error and map it to an exit code.
fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::from_error(&e)
        }
    }
}
