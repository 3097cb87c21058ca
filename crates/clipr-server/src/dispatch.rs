//! Procedure dispatch: maps an authenticated [`Call`] onto the OS adapters

use std::sync::Arc;

use tracing::{debug, info};

use clipr_core::types::MAX_CLIPBOARD_SIZE;
use clipr_core::{ClipError, ClipResult, LineEnding};
use clipr_transport::{Call, Output, Reply};

use crate::clipboard::ClipboardBackend;
use crate::uri::{validate_uri, UriOpener};

/// The adapters a server hands its procedures.
#[derive(Clone)]
pub struct Services {
    pub clipboard: Arc<dyn ClipboardBackend>,
    pub opener: Arc<dyn UriOpener>,
    /// Applied to text before it is written to the clipboard
    pub line_ending: LineEnding,
}

impl Services {
    pub fn new(
        clipboard: Arc<dyn ClipboardBackend>,
        opener: Arc<dyn UriOpener>,
        line_ending: LineEnding,
    ) -> Self {
        Self {
            clipboard,
            opener,
            line_ending,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("line_ending", &self.line_ending)
            .finish_non_exhaustive()
    }
}

/// Run a blocking adapter call off the async workers.
async fn blocking<T, F>(f: F) -> ClipResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ClipResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ClipError::Backend(format!("adapter task failed: {e}")))?
}

/// Execute one call. Procedure failures become [`Reply::Err`].
pub async fn dispatch(services: &Services, call: Call) -> Reply {
    let method = call.method();
    let result = match call {
        Call::ClipboardCopy { text } => copy(services, text).await,
        Call::ClipboardPaste => {
            let clipboard = services.clipboard.clone();
            blocking(move || clipboard.read()).await.map(Output::Text)
        }
        Call::UriOpen { uri } => open(services, uri).await,
    };

    match &result {
        Ok(_) => debug!(method, "call succeeded"),
        Err(e) => info!(method, error = %e, "call failed"),
    }
    Reply::from(result)
}

async fn copy(services: &Services, text: String) -> ClipResult<Output> {
    if text.len() > MAX_CLIPBOARD_SIZE {
        return Err(ClipError::PayloadTooLarge {
            size: text.len(),
            max: MAX_CLIPBOARD_SIZE,
        });
    }
    let text = services.line_ending.convert(&text);
    let clipboard = services.clipboard.clone();
    blocking(move || clipboard.write(&text)).await?;
    Ok(Output::Unit)
}

async fn open(services: &Services, uri: String) -> ClipResult<Output> {
    validate_uri(&uri)?;
    let opener = services.opener.clone();
    blocking(move || opener.open(&uri)).await?;
    Ok(Output::Unit)
}
