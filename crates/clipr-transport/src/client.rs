//! RPC client: one TCP connection, many sequential calls

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use clipr_core::types::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT};
use clipr_core::{ClipError, ClipResult, Magic};
use clipr_crypto::KeyPair;

use crate::channel::ClientChannel;
use crate::rpc::{Call, Output, Request, Response};

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub magic: Magic,
    pub connect_timeout: Duration,
    pub io_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            magic: Magic::current(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
        }
    }
}

pub struct Client<S = TcpStream> {
    channel: ClientChannel<S>,
    next_seq: u64,
}

impl Client<TcpStream> {
    pub async fn connect<A>(addr: A, keys: Arc<KeyPair>, opts: ClientOptions) -> ClipResult<Self>
    where
        A: ToSocketAddrs,
    {
        let stream = tokio::time::timeout(opts.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClipError::Timeout(opts.connect_timeout))??;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "connected");
        Ok(Self::from_channel(ClientChannel::new(
            stream,
            keys,
            opts.magic,
            opts.io_timeout,
        )))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn from_channel(channel: ClientChannel<S>) -> Self {
        Self {
            channel,
            next_seq: 0,
        }
    }

    /// Invoke a remote procedure and wait for its reply.
    pub async fn call(&mut self, call: Call) -> ClipResult<Output> {
        let seq = self.next_seq;
        self.next_seq += 1;

        debug!(seq, method = call.method(), "calling");
        let request = Request { seq, call }.encode()?;
        self.channel.send(&request).await?;

        let response = Response::decode(&self.channel.recv().await?)?;
        if response.seq != seq {
            return Err(ClipError::SequenceMismatch {
                expected: seq,
                got: response.seq,
            });
        }
        response.reply.into_result()
    }

    pub async fn copy(&mut self, text: impl Into<String>) -> ClipResult<()> {
        self.call(Call::ClipboardCopy { text: text.into() })
            .await
            .map(drop)
    }

    pub async fn paste(&mut self) -> ClipResult<String> {
        match self.call(Call::ClipboardPaste).await? {
            Output::Text(text) => Ok(text),
            other => Err(ClipError::Malformed(format!(
                "paste returned {other:?} instead of text"
            ))),
        }
    }

    pub async fn open(&mut self, uri: impl Into<String>) -> ClipResult<()> {
        self.call(Call::UriOpen { uri: uri.into() }).await.map(drop)
    }

    /// Access the underlying channel, e.g. to replay a raw envelope.
    pub fn channel_mut(&mut self) -> &mut ClientChannel<S> {
        &mut self.channel
    }
}
