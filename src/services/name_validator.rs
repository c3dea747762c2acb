//! Bucket name validation.
//!
//! Rules are checked in order and the first failure is reported:
//! 1. 3–63 characters
//! 2. lowercase letters, digits, dots and hyphens, starting and ending with
//!    a letter or digit
//! 3. no `..`, no `--`, no leading or trailing hyphen
//! 4. not formatted like an IPv4 address

use crate::services::storage_service::{StorageError, StorageResult};
use regex::Regex;
use std::sync::LazyLock;

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

static BUCKET_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("bucket name pattern compiles")
});

pub fn validate_bucket_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| StorageError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("bucket name must be between 3 and 63 characters"));
    }

    if !BUCKET_NAME_PATTERN.is_match(name) {
        return Err(invalid(
            "bucket name can only contain lowercase letters, numbers, hyphens, and dots, \
             and must start and end with a letter or number",
        ));
    }

    if name.contains("..") || name.contains("--") || name.starts_with('-') || name.ends_with('-')
    {
        return Err(invalid(
            "bucket name must not contain consecutive periods or dashes, \
             and must not start or end with a hyphen",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("bucket name must not be formatted as an IP address"));
    }

    Ok(())
}

/// Check if a string is a dotted-quad IPv4 address such as `192.168.0.1`.
///
/// Each group must be 0–255 without leading zeros, so `01.2.3.4` is not an
/// address (and is a valid bucket name).
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|segment| {
        !segment.is_empty()
            && segment.len() <= 3
            && segment.bytes().all(|b| b.is_ascii_digit())
            && !(segment.len() > 1 && segment.starts_with('0'))
            && segment.parse::<u8>().is_ok()
    })
}
