use std::fmt;
use std::time::Duration;

/// Default loopback TCP port of the clipboard service
pub const DEFAULT_PORT: u16 = 2850;

/// Default TCP connect timeout for clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-operation read/write deadline
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum frame payload size (16 MiB)
pub const MAX_FRAME_SIZE: usize = 16 << 20;

/// Maximum clipboard payload accepted by `Clipboard.Copy` (1 MiB)
pub const MAX_CLIPBOARD_SIZE: usize = 1 << 20;

/// Size of an Ed25519 public key
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an Ed25519 keypair as stored on disk (seed ∥ public key)
pub const PRIVATE_KEY_SIZE: usize = 64;

/// Size of a SHA-256 public key digest
pub const DIGEST_SIZE: usize = 32;

/// Bytes the signature adds in front of a signed message
pub const SIGNATURE_OVERHEAD: usize = 64;

/// Length of the protocol magic header
pub const MAGIC_LEN: usize = 8;

/// Leading magic bytes that must match: product signature + major version
pub const MAGIC_CHECKED_LEN: usize = 6;

pub const PROTOCOL_MAJOR: u8 = 1;
pub const PROTOCOL_MINOR: u8 = 0;

/// Protocol family header carried in front of every client envelope.
///
/// Layout: `b"CLIPR"`, major, minor, flags. Only the first
/// [`MAGIC_CHECKED_LEN`] bytes take part in compatibility checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Magic([u8; MAGIC_LEN]);

impl Magic {
    pub const PRODUCT: &'static [u8; 5] = b"CLIPR";

    pub const fn new(major: u8, minor: u8, flags: u8) -> Self {
        let p = Self::PRODUCT;
        Self([p[0], p[1], p[2], p[3], p[4], major, minor, flags])
    }

    /// Magic compiled into this build
    pub const fn current() -> Self {
        Self::new(PROTOCOL_MAJOR, PROTOCOL_MINOR, 0)
    }

    pub const fn from_bytes(bytes: [u8; MAGIC_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MAGIC_LEN] {
        &self.0
    }

    pub fn major(&self) -> u8 {
        self.0[5]
    }

    /// Check a received header prefix against this magic.
    pub fn is_compatible(&self, received: &[u8]) -> bool {
        received.len() >= MAGIC_CHECKED_LEN
            && received[..MAGIC_CHECKED_LEN] == self.0[..MAGIC_CHECKED_LEN]
    }
}

impl Default for Magic {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Magic({self})")
    }
}
