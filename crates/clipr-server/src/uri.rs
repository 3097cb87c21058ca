//! URI validation and "open with default handler" adapters

use std::process::{Command, Stdio};
use std::sync::Mutex;

use clipr_core::{ClipError, ClipResult};

/// Schemes the service is willing to hand to the desktop
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Scheme of an absolute URI, if `uri` has one.
pub fn parse_scheme(uri: &str) -> Option<&str> {
    let (scheme, rest) = uri.split_once(':')?;
    let mut chars = scheme.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (first_ok && rest_ok && !rest.is_empty()).then_some(scheme)
}

/// Accept only well-formed absolute http(s) URIs.
pub fn validate_uri(uri: &str) -> ClipResult<()> {
    if uri.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ClipError::InvalidUri(format!("{uri:?} contains whitespace")));
    }
    let scheme = parse_scheme(uri)
        .ok_or_else(|| ClipError::InvalidUri(format!("{uri:?} is not an absolute URI")))?
        .to_ascii_lowercase();
    if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
        return Err(ClipError::InvalidUri(format!(
            "URI scheme {scheme:?} is not allowed"
        )));
    }
    Ok(())
}

pub trait UriOpener: Send + Sync {
    fn open(&self, uri: &str) -> ClipResult<()>;
}

/// Opens URIs with the desktop's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl UriOpener for SystemOpener {
    fn open(&self, uri: &str) -> ClipResult<()> {
        let program = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(windows) {
            "explorer"
        } else {
            "xdg-open"
        };

        let status = Command::new(program)
            .arg(uri)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| ClipError::Backend(format!("running {program}: {e}")))?;
        // explorer.exe reports 1 even on success
        if !status.success() && !cfg!(windows) {
            return Err(ClipError::Backend(format!("{program} exited with {status}")));
        }
        Ok(())
    }
}

/// Remembers opened URIs instead of launching anything.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl UriOpener for RecordingOpener {
    fn open(&self, uri: &str) -> ClipResult<()> {
        self.opened
            .lock()
            .map_err(|_| ClipError::Backend("opener lock poisoned".into()))?
            .push(uri.to_string());
        Ok(())
    }
}
