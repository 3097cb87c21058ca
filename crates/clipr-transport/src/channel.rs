//! Secure channel over a raw duplex stream
//!
//! [`ClientChannel`] seals every outgoing message with the client's key;
//! [`ServerChannel`] authenticates every incoming message against the trust
//! store before handing it on. Responses travel back as plain frames.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tracing::warn;

use clipr_core::{ClipError, ClipResult, Magic};
use clipr_crypto::{envelope, KeyPair, TrustStore};

use crate::frame::{read_frame, write_frame};

/// Shared "desktop session is locked" flag.
///
/// Written by the session-event source, read by every connection worker.
#[derive(Debug, Clone, Default)]
pub struct SessionLock(Arc<AtomicBool>);

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn unlock(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run `fut` under the optional per-operation deadline.
async fn with_deadline<T, F>(deadline: Option<Duration>, fut: F) -> ClipResult<T>
where
    F: Future<Output = ClipResult<T>>,
{
    match deadline {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| ClipError::Timeout(d))?,
        None => fut.await,
    }
}

/// Client side: signs what it sends, trusts what it receives.
pub struct ClientChannel<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    keys: Arc<KeyPair>,
    magic: Magic,
    io_timeout: Option<Duration>,
}

impl<S> ClientChannel<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, keys: Arc<KeyPair>, magic: Magic, io_timeout: Option<Duration>) -> Self {
        let (r, w) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(r),
            writer: w,
            keys,
            magic,
            io_timeout,
        }
    }

    /// Seal `message` and write it as one frame.
    pub async fn send(&mut self, message: &[u8]) -> ClipResult<()> {
        let sealed = envelope::seal(&self.magic, &self.keys, message);
        with_deadline(self.io_timeout, write_frame(&mut self.writer, &sealed)).await
    }

    /// Read one unauthenticated response frame.
    pub async fn recv(&mut self) -> ClipResult<Vec<u8>> {
        with_deadline(self.io_timeout, read_frame(&mut self.reader)).await
    }

    /// Send an already-sealed envelope as is.
    pub async fn send_raw(&mut self, sealed: &[u8]) -> ClipResult<()> {
        with_deadline(self.io_timeout, write_frame(&mut self.writer, sealed)).await
    }

    pub async fn shutdown(&mut self) -> ClipResult<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Service side: authenticates what it receives, sends responses unsigned.
pub struct ServerChannel<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    trust: Arc<TrustStore>,
    magic: Magic,
    lock: Option<SessionLock>,
    io_timeout: Option<Duration>,
}

impl<S> ServerChannel<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(
        stream: S,
        trust: Arc<TrustStore>,
        magic: Magic,
        lock: Option<SessionLock>,
        io_timeout: Option<Duration>,
    ) -> Self {
        let (r, w) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(r),
            writer: w,
            trust,
            magic,
            lock,
            io_timeout,
        }
    }

    /// Read one frame and return its authenticated message.
    ///
    /// Every error is terminal for the connection.
    pub async fn recv(&mut self) -> ClipResult<Vec<u8>> {
        self.check_unlocked()?;
        let frame = with_deadline(self.io_timeout, read_frame(&mut self.reader)).await?;
        // the lock may have engaged while we were waiting
        self.check_unlocked()?;

        match envelope::open(&self.magic, &self.trust, &frame) {
            Ok(message) => Ok(message.to_vec()),
            Err(e) => {
                warn!(error = %e, "rejecting message");
                Err(e)
            }
        }
    }

    /// Write one plain response frame.
    pub async fn send(&mut self, message: &[u8]) -> ClipResult<()> {
        with_deadline(self.io_timeout, write_frame(&mut self.writer, message)).await
    }

    fn check_unlocked(&self) -> ClipResult<()> {
        if self.lock.as_ref().is_some_and(SessionLock::is_locked) {
            warn!("session is locked, rejecting call");
            return Err(ClipError::SessionLocked);
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) -> ClipResult<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
