//! Desktop session lock/unlock events
//!
//! The service session manager (or a screen-locker hook) delivers
//! `SIGUSR1` when the desktop locks and `SIGUSR2` when it unlocks.

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use clipr_core::ClipResult;
use clipr_transport::SessionLock;

pub struct SessionSignals {
    locked: Signal,
    unlocked: Signal,
}

impl SessionSignals {
    /// Install the handlers. Must be called inside a tokio runtime.
    pub fn register() -> ClipResult<Self> {
        Ok(Self {
            locked: signal(SignalKind::user_defined1())?,
            unlocked: signal(SignalKind::user_defined2())?,
        })
    }

    /// Mirror lock/unlock signals into `lock` until `cancel` fires.
    pub async fn run(mut self, lock: SessionLock, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(()) = self.locked.recv() => {
                    lock.lock();
                    info!("session locked, calls will be refused");
                }
                Some(()) = self.unlocked.recv() => {
                    lock.unlock();
                    info!("session unlocked");
                }
                else => break,
            }
        }
    }
}
