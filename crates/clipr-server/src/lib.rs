//! clipr-server: serves clipboard and URI procedures over the secure channel
//!
//! One accept loop per [`Server`]; one tokio task per accepted connection.
//! Connections share only the read-only trust store and the session lock.

pub mod clipboard;
pub mod dispatch;
pub mod server;
#[cfg(unix)]
pub mod session;
pub mod uri;

pub use clipboard::{ClipboardBackend, CommandClipboard, MemoryClipboard};
pub use dispatch::{dispatch, Services};
pub use server::{serve, Server, ServerOptions};
#[cfg(unix)]
pub use session::SessionSignals;
pub use uri::{validate_uri, RecordingOpener, SystemOpener, UriOpener};
