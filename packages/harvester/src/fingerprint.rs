//! Content fingerprinting for duplicate detection.
//!
//! The fingerprint is the dedup key: a posting is stored at most once per
//! fingerprint, so this hash must be pure and stable. Identical logical
//! postings re-scraped weeks apart have to hash to the same value.

use sha2::{Digest, Sha256};

use crate::model::RawPosting;

/// How much of the description participates in the hash. Career pages often
/// append rotating footers (share links, "posted N days ago"), so only the
/// leading part of the description is considered identity-bearing.
const DESCRIPTION_PREFIX_CHARS: usize = 200;

/// Compute the dedup fingerprint for a raw posting.
///
/// Lower-cases and trims title, company and location, takes the first
/// [`DESCRIPTION_PREFIX_CHARS`] characters of the description, and hashes the
/// fields with a separator so adjacent fields cannot bleed into each other.
pub fn fingerprint(raw: &RawPosting) -> String {
    let description_prefix: String = raw
        .description
        .trim()
        .to_lowercase()
        .chars()
        .take(DESCRIPTION_PREFIX_CHARS)
        .collect();

    let mut hasher = Sha256::new();
    for field in [
        raw.title.trim().to_lowercase(),
        raw.company.trim().to_lowercase(),
        raw.location.trim().to_lowercase(),
        description_prefix,
    ] {
        hasher.update(field.as_bytes());
        hasher.update(b"\x1f");
    }
    hex::encode(hasher.finalize())
}
