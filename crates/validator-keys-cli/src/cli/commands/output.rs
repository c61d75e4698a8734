//! Text the operator copies into the validator's config file.

use validator_keys_core::encoding::{encode_node_public, to_hex};
use validator_keys_core::ValidatorKeys;

/// Width of wrapped token and revocation blobs.
pub(crate) const LINE_WIDTH: usize = 72;

/// Split `text` into lines of at most [`LINE_WIDTH`] characters.
pub(crate) fn wrap(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(LINE_WIDTH)
            .map_or(rest.len(), |(index, _)| index);
        let (line, tail) = rest.split_at(end);
        lines.push(line);
        rest = tail;
    }
    lines
}

/// Print a `[section]` block with the wrapped value, preceded by the
/// validator public key.
pub(crate) fn print_config_block(keys: &ValidatorKeys, section: &str, value: &str) {
    println!("Update rippled.cfg file with these values and restart rippled:\n");
    println!(
        "# validator public key: {}\n",
        encode_node_public(keys.public_key())
    );
    println!("[{section}]");
    for line in wrap(value) {
        println!("{line}");
    }
    println!();
}

/// Print data the master key has to sign on another device.
pub(crate) fn print_signing_request(data: &[u8], next_command: &str) {
    println!(
        "Sign the following data with the validator master key, then run {next_command} with the signature:\n"
    );
    println!("{}\n", to_hex(data));
}
