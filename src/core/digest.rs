//! SHA3-256 helpers for batch checksums and payload signatures.
//!
//! These give integrity checks on stored batches. They are not a substitute
//! for authenticated encryption of PHI.

use crate::core::Hash256;
use sha3::{Digest, Sha3_256};

/// Compute SHA3-256 hash of multiple data chunks.
pub fn sha3_256_multi(chunks: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash256::new(bytes)
}

/// Keyed digest: SHA3-256 over `key || payload`.
///
/// SHA3 is not subject to length extension, so the prefix construction binds
/// the key. Receivers recompute it with the shared secret.
pub fn keyed_digest(key: &[u8], payload: &[u8]) -> Hash256 {
    sha3_256_multi(&[key, payload])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha3_known_vector() {
        // SHA3-256("")
        assert_eq!(
            sha3_256_multi(&[]).to_hex(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_multi_equals_concatenation() {
        assert_eq!(sha3_256_multi(&[b"ab", b"cd"]), sha3_256_multi(&[b"abcd"]));
    }

    #[test]
    fn test_keyed_digest_depends_on_key() {
        let a = keyed_digest(b"secret-a", b"payload");
        let b = keyed_digest(b"secret-b", b"payload");
        assert_ne!(a, b);
        assert_eq!(a, keyed_digest(b"secret-a", b"payload"));
    }
}
