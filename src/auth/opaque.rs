/// Opaque secret generation and hashing.
///
/// Tokens and one-time codes are random values whose only stored form is
/// a SHA-256 hex digest. This is deliberately a fast hash, distinct from
/// the bcrypt password path: the secrets here carry enough entropy (or a
/// short enough lifetime) that slow hashing buys nothing.
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

const OPAQUE_TOKEN_LENGTH: usize = 32;

/// Generate a random opaque token for verification/reset links.
///
/// The raw value goes to the recipient; the server stores only its hash.
pub fn generate_opaque_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OPAQUE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Generate a zero-padded numeric one-time code for SMS delivery.
pub fn generate_numeric_code(digits: u32) -> String {
    let upper = 10u64.pow(digits);
    let value = thread_rng().gen_range(0..upper);
    format!("{:0width$}", value, width = digits as usize)
}

/// Hash an opaque secret with SHA-256 for storage or comparison.
pub fn hash_secret(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}
