//! Service allow-list: trusted public keys indexed by SHA-256 digest

use ed25519_dalek::VerifyingKey;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use clipr_core::types::PUBLIC_KEY_SIZE;
use clipr_core::{ClipError, ClipResult};

use crate::perms::is_private;
use crate::{key_digest, KeyDigest, TRUSTED_KEYS_FILE};

/// Immutable mapping from key digest to trusted public key.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    keys: HashMap<KeyDigest, VerifyingKey>,
}

impl TrustStore {
    /// Load `<key_dir>/trusted`, refusing files that others can read.
    pub fn load(key_dir: &Path) -> ClipResult<Self> {
        if !key_dir.is_dir() {
            return Err(ClipError::KeysNotFound(format!(
                "keys directory {} does not exist",
                key_dir.display()
            )));
        }
        let path = key_dir.join(TRUSTED_KEYS_FILE);
        if !path.exists() {
            return Err(ClipError::TrustFileNotFound(path));
        }
        if !is_private(&path)? {
            return Err(ClipError::InsecurePermissions(path));
        }
        // comments may carry any encoding; key lines that are not valid
        // UTF-8 fail hex decoding and get skipped
        let content = std::fs::read(&path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&content)))
    }

    /// Parse allow-list text. Bad lines are logged and skipped.
    pub fn parse(content: &str) -> Self {
        let mut keys = HashMap::new();

        for line in content.split(['\r', '\n']) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let prefix: String = line.chars().take(8).collect();

            let bytes = match hex::decode(line) {
                Ok(b) => b,
                Err(e) => {
                    warn!(key = %prefix, "bad key in trusted keys file: {e}, ignoring");
                    continue;
                }
            };
            let Ok(public) = <[u8; PUBLIC_KEY_SIZE]>::try_from(bytes.as_slice()) else {
                warn!(key = %prefix, size = bytes.len(), "wrong size for key in trusted keys file, ignoring");
                continue;
            };
            let verifying = match VerifyingKey::from_bytes(&public) {
                Ok(vk) => vk,
                Err(_) => {
                    warn!(key = %prefix, "not a valid Ed25519 public key, ignoring");
                    continue;
                }
            };

            let digest = key_digest(&public);
            if keys.contains_key(&digest) {
                warn!(key = %prefix, "duplicate key in trusted keys file, ignoring");
                continue;
            }
            keys.insert(digest, verifying);
        }

        Self { keys }
    }

    /// Build a store from already-validated public keys.
    pub fn from_keys<I>(public_keys: I) -> ClipResult<Self>
    where
        I: IntoIterator<Item = [u8; PUBLIC_KEY_SIZE]>,
    {
        let mut keys = HashMap::new();
        for public in public_keys {
            let verifying = VerifyingKey::from_bytes(&public)
                .map_err(|_| ClipError::Config(format!("invalid public key {}", hex::encode(public))))?;
            keys.entry(key_digest(&public)).or_insert(verifying);
        }
        Ok(Self { keys })
    }

    pub fn get(&self, digest: &KeyDigest) -> Option<&VerifyingKey> {
        self.keys.get(digest)
    }

    pub fn contains(&self, digest: &KeyDigest) -> bool {
        self.keys.contains_key(digest)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyDigest, &VerifyingKey)> {
        self.keys.iter()
    }
}

/// One `trusted` file line for `public_key`.
pub fn format_trusted_line(public_key: &[u8; PUBLIC_KEY_SIZE]) -> String {
    hex::encode(public_key)
}
