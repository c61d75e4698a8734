//! `validator-keys show_manifest`.

use anyhow::{Context, Result};
use std::path::Path;

use validator_keys_core::encoding::{to_base64, to_hex};
use validator_keys_core::ValidatorKeys;

use super::exit_code;
use crate::cli::args::{ManifestFormat, ShowManifestArgs};

pub fn cmd_show_manifest(keyfile: &Path, args: ShowManifestArgs) -> i32 {
    exit_code(run_show_manifest(keyfile, args))
}

fn run_show_manifest(keyfile: &Path, args: ShowManifestArgs) -> Result<()> {
    let keys = ValidatorKeys::load(keyfile)?;
    let manifest = keys
        .manifest()?
        .context("no manifest has been generated yet")?;

    match args.format {
        ManifestFormat::Base64 => println!("{}", to_base64(manifest)),
        ManifestFormat::Hex => println!("{}", to_hex(manifest)),
    }
    Ok(())
}
