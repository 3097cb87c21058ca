//! Signed envelope: `magic(8) ∥ digest(32) ∥ signature(64) ∥ message`
//!
//! Only `message` is covered by the signature. The magic and digest prefix
//! route the envelope (version check, key lookup) but are not bound to it,
//! and nothing prevents an envelope from being replayed verbatim. Both
//! properties are kept for wire compatibility with existing clients.

use ed25519_dalek::{Signature, Verifier};

use clipr_core::types::{DIGEST_SIZE, MAGIC_LEN, SIGNATURE_OVERHEAD};
use clipr_core::{ClipError, ClipResult, Magic};

use crate::keys::KeyPair;
use crate::trust::TrustStore;
use crate::KeyDigest;

/// Routing prefix length: magic + key digest
pub const HEADER_LEN: usize = MAGIC_LEN + DIGEST_SIZE;

/// Envelopes of this length or shorter carry no message and are malformed
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + SIGNATURE_OVERHEAD;

/// Sign `message` and prepend the routing header.
pub fn seal(magic: &Magic, keys: &KeyPair, message: &[u8]) -> Vec<u8> {
    let signature = keys.sign(message);

    let mut out = Vec::with_capacity(MIN_ENVELOPE_LEN + message.len());
    out.extend_from_slice(magic.as_bytes());
    out.extend_from_slice(&keys.digest());
    out.extend_from_slice(&signature.to_bytes());
    out.extend_from_slice(message);
    out
}

/// Authenticate an envelope against the trust store and return its message.
pub fn open<'a>(magic: &Magic, trust: &TrustStore, envelope: &'a [u8]) -> ClipResult<&'a [u8]> {
    if envelope.len() <= MIN_ENVELOPE_LEN {
        return Err(ClipError::Malformed(format!(
            "message is too short: {}",
            envelope.len()
        )));
    }

    if !magic.is_compatible(&envelope[..MAGIC_LEN]) {
        return Err(ClipError::IncompatibleProtocol {
            expected: magic.to_string(),
            got: hex::encode(&envelope[..MAGIC_LEN]),
        });
    }

    let mut digest: KeyDigest = [0u8; DIGEST_SIZE];
    digest.copy_from_slice(&envelope[MAGIC_LEN..HEADER_LEN]);

    let public = trust
        .get(&digest)
        .ok_or_else(|| ClipError::Unauthorized(hex::encode(digest)))?;

    let mut sig_bytes = [0u8; SIGNATURE_OVERHEAD];
    sig_bytes.copy_from_slice(&envelope[HEADER_LEN..MIN_ENVELOPE_LEN]);
    let signature = Signature::from_bytes(&sig_bytes);

    let message = &envelope[MIN_ENVELOPE_LEN..];
    public
        .verify(message, &signature)
        .map_err(|_| ClipError::BadSignature(hex::encode(public.to_bytes())))?;

    Ok(message)
}
