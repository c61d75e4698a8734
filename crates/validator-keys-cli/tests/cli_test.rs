//! Integration tests for the `validator-keys` binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

use validator_keys_core::encoding::from_base64;

fn validator_keys(keyfile: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_validator-keys"));
    cmd.env_remove("VALIDATOR_KEYS_FILE")
        .env_remove("RUST_LOG")
        .arg("--keyfile")
        .arg(keyfile);
    cmd
}

fn run(keyfile: &Path, args: &[&str]) -> Output {
    validator_keys(keyfile)
        .args(args)
        .output()
        .expect("failed to run validator-keys")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Last non-empty stdout line: the data or signature a command prints.
fn last_line(output: &Output) -> String {
    stdout(output)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Lines of the `[section]` block, joined back together.
fn config_block(output: &Output, section: &str) -> String {
    let text = stdout(output);
    let header = format!("[{section}]");
    text.lines()
        .skip_while(|line| *line != header)
        .skip(1)
        .take_while(|line| !line.is_empty())
        .collect()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_create_keys_refuses_overwrite() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("keys/validator-keys.json");

    let output = run(&keyfile, &["create_keys"]);
    assert!(output.status.success(), "create_keys should succeed");
    assert!(stdout(&output).contains("Validator keys stored in"));
    assert_eq!(read_json(&keyfile)["key_type"], "ed25519");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&keyfile).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "key file should have mode 0600");
    }

    let output = run(&keyfile, &["create_keys"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("refusing to overwrite existing key file"));
}

#[test]
fn test_create_token_and_show_manifest() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("validator-keys.json");
    assert!(run(&keyfile, &["create_keys", "--key-type", "secp256k1"])
        .status
        .success());

    let output = run(&keyfile, &["create_token"]);
    assert!(output.status.success(), "create_token should succeed");
    assert!(stdout(&output).contains("# validator public key: n"));

    let token = config_block(&output, "validator_token");
    let document: serde_json::Value =
        serde_json::from_slice(&from_base64(&token).expect("token is base64")).unwrap();
    assert!(document["manifest"].is_string());
    assert!(document["validation_secret_key"].is_string());
    assert_eq!(read_json(&keyfile)["token_sequence"], 1);

    let output = run(&keyfile, &["show_manifest"]);
    assert!(output.status.success());
    assert_eq!(last_line(&output), document["manifest"].as_str().unwrap());

    let output = run(&keyfile, &["show_manifest", "--format", "hex"]);
    assert!(output.status.success());
    assert_eq!(
        last_line(&output),
        read_json(&keyfile)["manifest"].as_str().unwrap()
    );
}

#[test]
fn test_show_manifest_without_token_fails() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("validator-keys.json");
    assert!(run(&keyfile, &["create_keys"]).status.success());

    let output = run(&keyfile, &["show_manifest"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no manifest has been generated yet"));
}

#[test]
fn test_external_signing_flow() {
    let tmp = TempDir::new().unwrap();
    // Stands in for the offline device holding the master secret
    let signer = tmp.path().join("signer.json");
    let external = tmp.path().join("external.json");

    assert!(run(&signer, &["create_keys"]).status.success());
    let public_key = read_json(&signer)["public_key"]
        .as_str()
        .unwrap()
        .to_string();

    let output = run(&external, &["create_external", &public_key]);
    assert!(output.status.success(), "create_external: {}", stderr(&output));
    assert_eq!(read_json(&external)["secret_key"], "external");

    // Local signing is refused
    let output = run(&external, &["create_token"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("this key file cannot be used to sign tokens"));

    // Two-phase token
    let output = run(&external, &["start_token"]);
    assert!(output.status.success(), "start_token: {}", stderr(&output));
    let data = last_line(&output);
    assert!(read_json(&external)["pending_token_secret"].is_string());

    let output = run(&signer, &["sign_hex", &data]);
    assert!(output.status.success());
    let signature = last_line(&output);

    let output = run(&external, &["finish_token", &signature]);
    assert!(output.status.success(), "finish_token: {}", stderr(&output));
    assert!(!config_block(&output, "validator_token").is_empty());
    let saved = read_json(&external);
    assert_eq!(saved["token_sequence"], 1);
    assert!(saved.get("pending_token_secret").is_none());

    // Nothing left to finish
    let output = run(&external, &["finish_token", &signature]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("no pending token to finish"));

    // Two-phase revocation
    let output = run(&external, &["start_revoke_keys"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("WARNING: This will revoke your validator keys!"));
    let data = last_line(&output);

    let output = run(&signer, &["sign_hex", &data]);
    let signature = last_line(&output);

    let output = run(&external, &["finish_revoke_keys", &signature]);
    assert!(output.status.success(), "finish_revoke_keys: {}", stderr(&output));
    assert!(!config_block(&output, "validator_key_revocation").is_empty());
    assert_eq!(read_json(&external)["revoked"], true);

    let output = run(&external, &["start_token"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("validator keys have been revoked"));
}

#[test]
fn test_finish_token_rejects_undecodable_signature() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("validator-keys.json");
    assert!(run(&keyfile, &["create_keys"]).status.success());
    assert!(run(&keyfile, &["start_token"]).status.success());

    let output = run(&keyfile, &["finish_token", "not a signature"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("invalid master signature"));

    // A decodable but wrong signature leaves the key file as it was
    let before = read_json(&keyfile);
    let output = run(&keyfile, &["finish_token", "ABCD"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("manifest is not properly signed"));
    assert_eq!(read_json(&keyfile), before);
}

#[test]
fn test_revoke_keys_is_repeatable() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("validator-keys.json");
    assert!(run(&keyfile, &["create_keys"]).status.success());

    let output = run(&keyfile, &["revoke_keys"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("WARNING: This will revoke your validator keys!"));
    assert!(!config_block(&output, "validator_key_revocation").is_empty());

    let output = run(&keyfile, &["revoke_keys"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("WARNING: Validator keys have already been revoked!"));

    let output = run(&keyfile, &["create_token"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("validator keys have been revoked"));

    // Still signs, with a warning
    let output = run(&keyfile, &["sign", "hello"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("WARNING: Validator keys have been revoked!"));
}

#[test]
fn test_domain_commands() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("validator-keys.json");
    assert!(run(&keyfile, &["create_keys"]).status.success());

    let output = run(&keyfile, &["attest_domain"]);
    assert_eq!(output.status.code(), Some(1));

    let output = run(&keyfile, &["set_domain", "-bad.com"]);
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).contains("[host.][subdomain.]domain.tld"));

    let output = run(&keyfile, &["set_domain", "validator.example.com"]);
    assert!(output.status.success(), "set_domain: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("[validator_token]"));
    assert!(text.contains("attestation=\""));
    assert_eq!(read_json(&keyfile)["domain"], "validator.example.com");
    assert_eq!(read_json(&keyfile)["token_sequence"], 1);

    let output = run(&keyfile, &["set_domain", "validator.example.com"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("already been set"));
    assert_eq!(read_json(&keyfile)["token_sequence"], 1);

    let output = run(&keyfile, &["attest_domain"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("attestation=\""));

    let output = run(&keyfile, &["clear_domain"]);
    assert!(output.status.success());
    assert!(read_json(&keyfile).get("domain").is_none());
    assert_eq!(read_json(&keyfile)["token_sequence"], 2);
}

#[test]
fn test_sign_requires_data_and_valid_hex() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("validator-keys.json");
    assert!(run(&keyfile, &["create_keys"]).status.success());

    let output = run(&keyfile, &["sign", ""]);
    assert!(!output.status.success(), "empty data is a syntax error");

    let output = run(&keyfile, &["sign_hex", "xyz"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("could not decode hex string: xyz"));

    let output = run(&keyfile, &["sign", "hello"]);
    assert!(output.status.success());
    // ed25519 signatures are 64 bytes
    assert_eq!(last_line(&output).len(), 128);
}

#[test]
fn test_missing_key_file() {
    let tmp = TempDir::new().unwrap();
    let keyfile = tmp.path().join("missing.json");

    let output = run(&keyfile, &["create_token"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("failed to open key file"));
}
