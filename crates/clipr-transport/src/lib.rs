//! clipr-transport: the authenticated request channel
//!
//! ```text
//! client ── frame(magic ∥ digest ∥ sig ∥ json request) ──▶ service
//! client ◀──────────── frame(json response) ─────────────── service
//! ```
//!
//! Only the client → service direction is authenticated.

pub mod channel;
pub mod client;
pub mod frame;
pub mod rpc;

pub use channel::{ClientChannel, ServerChannel, SessionLock};
pub use client::{Client, ClientOptions};
pub use frame::{read_frame, write_frame};
pub use rpc::{Call, Output, Reply, Request, Response};
