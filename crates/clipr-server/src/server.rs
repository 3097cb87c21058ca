//! TCP accept loop and per-connection workers

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use clipr_core::types::DEFAULT_IO_TIMEOUT;
use clipr_core::{ClipError, ClipResult, Magic};
use clipr_crypto::TrustStore;
use clipr_transport::{Request, Response, ServerChannel, SessionLock};

use crate::dispatch::{dispatch, Services};

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub addr: SocketAddr,
    pub trust: Arc<TrustStore>,
    pub magic: Magic,
    /// `None` disables session-lock enforcement
    pub lock: Option<SessionLock>,
    pub io_timeout: Option<Duration>,
}

impl ServerOptions {
    /// Loopback-only listener on `port` (0 picks a free port).
    pub fn new(port: u16, trust: Arc<TrustStore>) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            trust,
            magic: Magic::current(),
            lock: None,
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
        }
    }
}

/// State shared by every connection worker.
struct Shared {
    trust: Arc<TrustStore>,
    magic: Magic,
    lock: Option<SessionLock>,
    io_timeout: Option<Duration>,
    services: Services,
}

pub struct Server {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl Server {
    pub async fn bind(opts: ServerOptions, services: Services) -> ClipResult<Self> {
        if opts.trust.is_empty() {
            return Err(ClipError::NoTrustedKeys);
        }
        let listener = TcpListener::bind(opts.addr).await?;
        info!(
            addr = %listener.local_addr()?,
            trusted_keys = opts.trust.len(),
            lock_enforced = opts.lock.is_some(),
            "listening"
        );

        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                trust: opts.trust,
                magic: opts.magic,
                lock: opts.lock,
                io_timeout: opts.io_timeout,
                services,
            }),
        })
    }

    pub fn local_addr(&self) -> ClipResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `cancel` fires.
    ///
    /// Cancellation only stops accepting; connections already being served
    /// run to completion. Any other accept failure ends the loop with an error.
    pub async fn run(self, cancel: CancellationToken) -> ClipResult<()> {
        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("stopped accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted?,
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!(%peer, error = %e, "set_nodelay failed");
            }
            debug!(%peer, "accepted connection");

            let shared = self.shared.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, &shared).await;
            });
        }
    }
}

/// Bind and serve until cancelled.
pub async fn serve(
    cancel: CancellationToken,
    opts: ServerOptions,
    services: Services,
) -> ClipResult<()> {
    Server::bind(opts, services).await?.run(cancel).await
}

/// Serve calls on one connection until the peer leaves or misbehaves.
async fn handle_connection<S>(stream: S, peer: SocketAddr, shared: &Shared)
where
    S: AsyncRead + AsyncWrite,
{
    let mut channel = ServerChannel::new(
        stream,
        shared.trust.clone(),
        shared.magic,
        shared.lock.clone(),
        shared.io_timeout,
    );

    loop {
        match serve_call(&mut channel, &shared.services).await {
            Ok(()) => {}
            Err(ClipError::ConnectionClosed) => {
                debug!(%peer, "peer closed connection");
                break;
            }
            Err(e) if e.is_fatal_for_connection() => {
                warn!(%peer, error = %e, "dropping connection");
                break;
            }
            Err(e) => debug!(%peer, error = %e, "call failed, keeping connection"),
        }
    }

    if let Err(e) = channel.shutdown().await {
        debug!(%peer, error = %e, "shutdown after close");
    }
}

/// One round trip: recv, decode, dispatch, reply.
async fn serve_call<S>(channel: &mut ServerChannel<S>, services: &Services) -> ClipResult<()>
where
    S: AsyncRead + AsyncWrite,
{
    let message = channel.recv().await?;
    let request = Request::decode(&message)?;
    let seq = request.seq;
    let reply = dispatch(services, request.call).await;
    let bytes = Response { seq, reply }.encode()?;
    channel.send(&bytes).await
}
