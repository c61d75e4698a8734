//! Process exit codes.
//!
//! Failures raised by the key library carry their own code (see
//! `KeyError::exit_code`): 2 for file system errors, 3 for malformed input,
//! 4 for protocol errors, 5 when the key file holds no secret, 6 for domain
//! validation. Everything else the command layer refuses exits with 1.

use validator_keys_core::KeyError;

pub const SUCCESS: i32 = 0;
pub const COMMAND_FAILED: i32 = 1; // Refused by the command layer (revoked, exhausted, file exists)

/// Exit code for an error returned by a command.
pub fn from_error(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<KeyError>()
        .map_or(COMMAND_FAILED, KeyError::exit_code)
}
