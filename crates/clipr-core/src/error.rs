use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type ClipResult<T> = Result<T, ClipError>;

#[derive(Debug, Error)]
pub enum ClipError {
    // ── Transport ────────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("frame: unexpected end of stream inside length prefix")]
    UnexpectedEof,

    #[error("frame: payload size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("frame: truncated payload, got {got} of {expected} bytes")]
    TruncatedPayload { expected: usize, got: usize },

    #[error("I/O timed out after {0:?}")]
    Timeout(Duration),

    // ── Protocol ─────────────────────────────────────────────────────────
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("bad signature or incompatible versions: server [{expected}], client [{got}]")]
    IncompatibleProtocol { expected: String, got: String },

    #[error("message codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("response sequence {got} does not match request {expected}")]
    SequenceMismatch { expected: u64, got: u64 },

    // ── Trust ────────────────────────────────────────────────────────────
    #[error("call with unauthorized key: {0}")]
    Unauthorized(String),

    #[error("call fails verification with key: {0}")]
    BadSignature(String),

    // ── Session ──────────────────────────────────────────────────────────
    #[error("session is locked")]
    SessionLocked,

    // ── Key material ─────────────────────────────────────────────────────
    #[error("keys not found: {0}")]
    KeysNotFound(String),

    #[error("bad {kind} key size {size}")]
    BadKeySize { kind: &'static str, size: usize },

    #[error("corrupt keys: {0}")]
    CorruptKeys(String),

    #[error("{} permissions are too open", .0.display())]
    InsecurePermissions(PathBuf),

    #[error("trusted keys file not found: {}", .0.display())]
    TrustFileNotFound(PathBuf),

    #[error("no trusted public keys configured")]
    NoTrustedKeys,

    // ── Procedures ───────────────────────────────────────────────────────
    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("clipboard payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ClipError {
    /// Whether a service-side worker must drop the connection after this error.
    ///
    /// Procedure failures travel back to the client inside a response; every
    /// transport, protocol, trust, session and key-material error ends the
    /// connection.
    pub fn is_fatal_for_connection(&self) -> bool {
        !matches!(
            self,
            ClipError::Remote(_)
                | ClipError::PayloadTooLarge { .. }
                | ClipError::InvalidUri(_)
                | ClipError::Backend(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_errors_keep_connection() {
        assert!(!ClipError::Backend("no display".into()).is_fatal_for_connection());
        assert!(!ClipError::PayloadTooLarge { size: 2, max: 1 }.is_fatal_for_connection());
        assert!(!ClipError::InvalidUri("ftp://x".into()).is_fatal_for_connection());
    }

    #[test]
    fn test_channel_errors_close_connection() {
        assert!(ClipError::SessionLocked.is_fatal_for_connection());
        assert!(ClipError::Unauthorized("ab".into()).is_fatal_for_connection());
        assert!(ClipError::Timeout(Duration::from_secs(1)).is_fatal_for_connection());
        assert!(ClipError::ConnectionClosed.is_fatal_for_connection());
        assert!(ClipError::CorruptKeys("mismatch".into()).is_fatal_for_connection());
    }

    #[test]
    fn test_display_mentions_limits() {
        let msg = ClipError::FrameTooLarge { size: 17, max: 16 }.to_string();
        assert!(msg.contains("17") && msg.contains("16"));
    }
}
