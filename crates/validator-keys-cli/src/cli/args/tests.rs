use super::*;
use clap::CommandFactory;
use clap::Parser;

#[test]
fn cli_debug_assert() {
    Cli::command().debug_assert();
}

#[test]
fn create_keys_defaults_to_ed25519() {
    let cli = Cli::try_parse_from(["validator-keys", "create_keys"]).expect("parse should succeed");
    match cli.cmd {
        Command::CreateKeys(args) => assert_eq!(args.key_type, KeyType::Ed25519),
        _ => panic!("expected Command::CreateKeys"),
    }
}

#[test]
fn token_key_type_defaults_to_secp256k1() {
    let cli = Cli::try_parse_from(["validator-keys", "start_token"]).expect("parse should succeed");
    match cli.cmd {
        Command::StartToken(args) => assert_eq!(args.token_key_type, KeyType::Secp256k1),
        _ => panic!("expected Command::StartToken"),
    }

    let cli = Cli::try_parse_from([
        "validator-keys",
        "create_token",
        "--token-key-type",
        "ed25519",
    ])
    .expect("parse should succeed");
    match cli.cmd {
        Command::CreateToken(args) => assert_eq!(args.token_key_type, KeyType::Ed25519),
        _ => panic!("expected Command::CreateToken"),
    }
}

#[test]
fn unknown_key_type_is_rejected() {
    assert!(Cli::try_parse_from(["validator-keys", "create_keys", "--key-type", "rsa"]).is_err());
}

#[test]
fn keyfile_is_global() {
    let cli = Cli::try_parse_from([
        "validator-keys",
        "show_manifest",
        "--format",
        "hex",
        "--keyfile",
        "/tmp/keys.json",
    ])
    .expect("parse should succeed");

    assert_eq!(cli.keyfile, Some(PathBuf::from("/tmp/keys.json")));
    match cli.cmd {
        Command::ShowManifest(args) => assert_eq!(args.format, ManifestFormat::Hex),
        _ => panic!("expected Command::ShowManifest"),
    }
}

#[test]
fn sign_requires_non_empty_data() {
    assert!(Cli::try_parse_from(["validator-keys", "sign"]).is_err());
    assert!(Cli::try_parse_from(["validator-keys", "sign", ""]).is_err());
    assert!(Cli::try_parse_from(["validator-keys", "sign_hex", ""]).is_err());
    assert!(Cli::try_parse_from(["validator-keys", "sign", "hello"]).is_ok());
}

#[test]
fn finish_commands_take_a_signature() {
    assert!(Cli::try_parse_from(["validator-keys", "finish_token"]).is_err());
    let cli = Cli::try_parse_from(["validator-keys", "finish_revoke_keys", "ABCD"])
        .expect("parse should succeed");
    match cli.cmd {
        Command::FinishRevokeKeys(args) => assert_eq!(args.signature, "ABCD"),
        _ => panic!("expected Command::FinishRevokeKeys"),
    }
}
