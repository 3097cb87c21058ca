//! Client signing identity: Ed25519 keypair persisted under the key directory

use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

use clipr_core::types::{PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
use clipr_core::{ClipError, ClipResult};

use crate::perms::{is_private, write_with_mode};
use crate::{key_digest, KeyDigest, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};

/// A client signing keypair. The private half is zeroized on drop.
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a keypair from its 64-byte `seed ∥ public key` encoding.
    pub fn from_keypair_bytes(bytes: &[u8; PRIVATE_KEY_SIZE]) -> ClipResult<Self> {
        let signing = SigningKey::from_keypair_bytes(bytes).map_err(|_| {
            ClipError::CorruptKeys("private key does not match its embedded public key".into())
        })?;
        Ok(Self { signing })
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing.verifying_key().to_bytes()
    }

    /// SHA-256 of the public key, as looked up by the service.
    pub fn digest(&self) -> KeyDigest {
        key_digest(&self.public_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing.sign(message)
    }

    /// Hex form of the public key, one line of a `trusted` file.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Default key directory: `$HOME/.clipr`
pub fn default_key_dir() -> ClipResult<PathBuf> {
    key_dir_under(std::env::var_os("HOME"))
}

fn key_dir_under(home: Option<OsString>) -> ClipResult<PathBuf> {
    match home {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(".clipr")),
        _ => Err(ClipError::KeysNotFound("HOME is not set; pass --key-dir".into())),
    }
}

/// Generate a new keypair and save it, overwriting existing keys.
pub fn create_keys(key_dir: &Path) -> ClipResult<KeyPair> {
    create_key_dir(key_dir)?;

    let keys = KeyPair::generate();

    write_with_mode(&key_dir.join(PUBLIC_KEY_FILE), &keys.public_key(), 0o644)?;

    let mut private = keys.signing.to_keypair_bytes();
    let written = write_with_mode(&key_dir.join(PRIVATE_KEY_FILE), &private, 0o600);
    private.zeroize();
    written?;

    tracing::debug!(dir = %key_dir.display(), public_key = %keys.public_key_hex(), "keys created");
    Ok(keys)
}

/// Load the keypair previously saved by [`create_keys`].
pub fn read_keys(key_dir: &Path) -> ClipResult<KeyPair> {
    if !key_dir.is_dir() {
        return Err(ClipError::KeysNotFound(format!(
            "keys directory {} does not exist",
            key_dir.display()
        )));
    }

    let pub_path = key_dir.join(PUBLIC_KEY_FILE);
    let public = std::fs::read(&pub_path).map_err(|e| {
        ClipError::KeysNotFound(format!("unable to read public key {}: {e}", pub_path.display()))
    })?;
    if public.len() != PUBLIC_KEY_SIZE {
        return Err(ClipError::BadKeySize {
            kind: "public",
            size: public.len(),
        });
    }

    let key_path = key_dir.join(PRIVATE_KEY_FILE);
    let mut raw = std::fs::read(&key_path).map_err(|e| {
        ClipError::KeysNotFound(format!("unable to read private key {}: {e}", key_path.display()))
    })?;
    if raw.len() != PRIVATE_KEY_SIZE {
        let size = raw.len();
        raw.zeroize();
        return Err(ClipError::BadKeySize {
            kind: "private",
            size,
        });
    }
    if !is_private(&key_path)? {
        raw.zeroize();
        return Err(ClipError::InsecurePermissions(key_path));
    }

    let mut bytes = [0u8; PRIVATE_KEY_SIZE];
    bytes.copy_from_slice(&raw);
    raw.zeroize();
    let keys = KeyPair::from_keypair_bytes(&bytes);
    bytes.zeroize();
    let keys = keys?;

    if keys.public_key()[..] != public[..] {
        return Err(ClipError::CorruptKeys(format!(
            "{} does not match {}",
            pub_path.display(),
            key_path.display()
        )));
    }
    Ok(keys)
}

fn create_key_dir(key_dir: &Path) -> ClipResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(key_dir)?;
    }
    #[cfg(not(unix))]
    std::fs::create_dir_all(key_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Verifier, VerifyingKey};
    use tempfile::TempDir;

    #[test]
    fn test_create_and_read_keys() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".clipr");

        let created = create_keys(&dir).unwrap();
        let loaded = read_keys(&dir).unwrap();

        assert_eq!(created.public_key(), loaded.public_key());
        assert_eq!(created.digest(), loaded.digest());
        // same pair on every read
        assert_eq!(read_keys(&dir).unwrap().public_key(), loaded.public_key());
    }

    #[test]
    fn test_create_keys_overwrites() {
        let tmp = TempDir::new().unwrap();
        let first = create_keys(tmp.path()).unwrap();
        let second = create_keys(tmp.path()).unwrap();

        assert_ne!(first.public_key(), second.public_key());
        assert_eq!(read_keys(tmp.path()).unwrap().public_key(), second.public_key());
    }

    #[test]
    fn test_read_keys_no_directory() {
        let tmp = TempDir::new().unwrap();
        let err = read_keys(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, ClipError::KeysNotFound(_)));
    }

    #[test]
    fn test_read_keys_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".clipr");
        std::fs::write(&path, b"not a dir").unwrap();
        assert!(matches!(read_keys(&path), Err(ClipError::KeysNotFound(_))));
    }

    #[test]
    fn test_read_keys_missing_private() {
        let tmp = TempDir::new().unwrap();
        create_keys(tmp.path()).unwrap();
        std::fs::remove_file(tmp.path().join(PRIVATE_KEY_FILE)).unwrap();
        assert!(matches!(read_keys(tmp.path()), Err(ClipError::KeysNotFound(_))));
    }

    #[test]
    fn test_read_keys_mismatched_public_key() {
        let tmp = TempDir::new().unwrap();
        create_keys(tmp.path()).unwrap();
        let other = KeyPair::generate();
        std::fs::write(tmp.path().join(PUBLIC_KEY_FILE), other.public_key()).unwrap();
        assert!(matches!(read_keys(tmp.path()), Err(ClipError::CorruptKeys(_))));
    }

    #[test]
    fn test_keypair_bytes_with_wrong_public_half() {
        let keys = KeyPair::generate();
        let other = KeyPair::generate();
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        bytes[..32].copy_from_slice(&keys.signing.to_bytes());
        bytes[32..].copy_from_slice(&other.public_key());
        assert!(matches!(
            KeyPair::from_keypair_bytes(&bytes),
            Err(ClipError::CorruptKeys(_))
        ));
    }

    #[test]
    fn test_key_dir_requires_home() {
        assert_eq!(
            key_dir_under(Some("/home/ren".into())).unwrap(),
            Path::new("/home/ren/.clipr")
        );
        assert!(matches!(key_dir_under(None), Err(ClipError::KeysNotFound(_))));
        assert!(matches!(
            key_dir_under(Some(OsString::new())),
            Err(ClipError::KeysNotFound(_))
        ));
    }

    #[test]
    fn test_read_keys_bad_public_size() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(PUBLIC_KEY_FILE), b"short").unwrap();
        write_with_mode(&tmp.path().join(PRIVATE_KEY_FILE), &[0u8; 64], 0o600).unwrap();

        let err = read_keys(tmp.path()).unwrap_err();
        assert!(matches!(err, ClipError::BadKeySize { kind: "public", size: 5 }));
    }

    #[test]
    fn test_read_keys_bad_private_size() {
        let tmp = TempDir::new().unwrap();
        create_keys(tmp.path()).unwrap();
        write_with_mode(&tmp.path().join(PRIVATE_KEY_FILE), &[0u8; 32], 0o600).unwrap();

        let err = read_keys(tmp.path()).unwrap_err();
        assert!(matches!(err, ClipError::BadKeySize { kind: "private", size: 32 }));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_keys_insecure_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        create_keys(tmp.path()).unwrap();
        let key_path = tmp.path().join(PRIVATE_KEY_FILE);
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(matches!(
            read_keys(tmp.path()),
            Err(ClipError::InsecurePermissions(p)) if p == key_path
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_created_file_modes() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("keys");
        create_keys(&dir).unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&dir), 0o700);
        assert_eq!(mode(&dir.join(PRIVATE_KEY_FILE)), 0o600);
        assert_eq!(mode(&dir.join(PUBLIC_KEY_FILE)), 0o644);
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let keys = KeyPair::generate();
        let sig = keys.sign(b"payload");
        let vk = VerifyingKey::from_bytes(&keys.public_key()).unwrap();
        assert!(vk.verify(b"payload", &sig).is_ok());
        assert!(vk.verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let rendered = format!("{:?}", KeyPair::generate());
        assert!(rendered.contains("[REDACTED]"));
    }
}
