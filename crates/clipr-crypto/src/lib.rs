//! clipr-crypto: key material for the clipr secure channel
//!
//! ```text
//! client                                   service
//! ~/.clipr/key      (Ed25519 seed ∥ pk)    ~/.clipr/trusted  (hex pk per line)
//! ~/.clipr/key.pub  (pk)                        │
//!        │                                      ▼
//!        └── digest = SHA-256(pk) ──────▶  TrustStore: digest → pk
//! ```
//!
//! Every client message is sealed as `magic ∥ digest ∥ sig ∥ message`;
//! the service resolves the digest and verifies the signature.

pub mod envelope;
pub mod keys;
pub mod perms;
pub mod trust;

use sha2::{Digest, Sha256};

use clipr_core::types::{DIGEST_SIZE, PUBLIC_KEY_SIZE};

pub use envelope::{open, seal};
pub use keys::{create_keys, default_key_dir, read_keys, KeyPair};
pub use trust::{format_trusted_line, TrustStore};

/// SHA-256 digest of a public key, the lookup key of the trust store
pub type KeyDigest = [u8; DIGEST_SIZE];

/// Public key file name inside the key directory
pub const PUBLIC_KEY_FILE: &str = "key.pub";

/// Private key file name inside the key directory
pub const PRIVATE_KEY_FILE: &str = "key";

/// Trusted keys file name inside the key directory
pub const TRUSTED_KEYS_FILE: &str = "trusted";

pub fn key_digest(public_key: &[u8; PUBLIC_KEY_SIZE]) -> KeyDigest {
    Sha256::digest(public_key).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_digest_is_deterministic() {
        let pk = [7u8; PUBLIC_KEY_SIZE];
        assert_eq!(key_digest(&pk), key_digest(&pk));
    }

    #[test]
    fn test_generated_key_digests_distinct() {
        let digests: HashSet<KeyDigest> = (0..128).map(|_| KeyPair::generate().digest()).collect();
        assert_eq!(digests.len(), 128);
    }
}
