pub mod config;
pub mod error;
pub mod line_ending;
pub mod types;

pub use error::{ClipError, ClipResult};
pub use line_ending::LineEnding;
pub use types::Magic;
