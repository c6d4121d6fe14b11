//! Device fingerprints and bearer tokens.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Derive the server-side fingerprint for a device.
///
/// Only the durable visitor identifier is hashed. The locally stored
/// identifier is accepted from the client but ignored, so clearing browser
/// storage does not reset the device's vote count.
pub fn compute_fingerprint(visitor_id: &str, _local_id: &str) -> String {
    hex::encode(Sha256::digest(visitor_id.as_bytes()))
}

/// Generate a random 128-bit bearer token, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Normalize a contestant name for allow-list comparison.
pub fn normalize_contestant(name: &str) -> String {
    name.trim().to_lowercase()
}
