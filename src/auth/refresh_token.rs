/// Refresh token storage key
///
/// The store never sees a refresh token in plaintext. It keeps the SHA-256
/// digest, which identifies the literal token string exactly.

use sha2::{Digest, Sha256};

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
