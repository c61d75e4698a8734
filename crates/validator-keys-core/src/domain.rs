//! Validator domain validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{KeyError, KeyResult};

pub const DOMAIN_MIN_LEN: usize = 4;
pub const DOMAIN_MAX_LEN: usize = 128;

// One or more labels of up to 63 alphanumerics and hyphens, not starting or
// ending with a hyphen, then an alphabetic TLD. IDNs are not supported.
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
        .expect("domain pattern is valid")
});

/// Check a domain before it is attached to future manifests.
///
/// The empty string is always accepted and means "no domain".
pub fn validate_domain(domain: &str) -> KeyResult<()> {
    if domain.is_empty() {
        return Ok(());
    }

    if !(DOMAIN_MIN_LEN..=DOMAIN_MAX_LEN).contains(&domain.len()) {
        return Err(KeyError::DomainLength {
            min: DOMAIN_MIN_LEN,
            max: DOMAIN_MAX_LEN,
        });
    }

    if !DOMAIN_RE.is_match(domain) {
        return Err(KeyError::DomainFormat);
    }

    Ok(())
}
