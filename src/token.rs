//! Session token generation and verification
//!
//! Tokens are high-entropy values stored inside the session itself, used
//! to check that a request legitimately belongs to the current session
//! (e.g. as a hidden form field against cross-site request forgery).

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha384};

/// Storage key of the session token, distinct from user data. May be used
/// as the name of a hidden form input.
pub const TOKEN_NAME: &str = "__SESSION_TOKEN__";

/// Amount of OS randomness folded into each token.
const TOKEN_ENTROPY_BYTES: usize = 4096;

/// Derive a fresh token: a SHA-384 digest over several kilobytes of OS
/// randomness, base64 encoded without padding.
pub(crate) fn generate() -> String {
    let mut bytes = vec![0u8; TOKEN_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let digest = Sha384::digest(&bytes);
    STANDARD
        .encode(digest)
        .trim_end_matches('=')
        .to_string()
}

/// Constant-time string comparison to prevent timing attacks
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_token_shape() {
        // SHA-384 digests are 48 bytes, which base64 encodes to 64
        // characters with no padding.
        let token = generate();
        assert_eq!(token.len(), 64);
        assert!(!token.contains('='));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }
}
