//! Clipboard adapters

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use clipr_core::{ClipError, ClipResult};

/// OS clipboard access. Calls may block; the server runs them on the
/// blocking pool.
pub trait ClipboardBackend: Send + Sync {
    fn read(&self) -> ClipResult<String>;
    fn write(&self, text: &str) -> ClipResult<()>;
}

/// Process-local clipboard, used headless and in tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
        }
    }

    pub fn contents(&self) -> String {
        self.text.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn read(&self) -> ClipResult<String> {
        self.text
            .lock()
            .map(|t| t.clone())
            .map_err(|_| ClipError::Backend("clipboard lock poisoned".into()))
    }

    fn write(&self, text: &str) -> ClipResult<()> {
        let mut guard = self
            .text
            .lock()
            .map_err(|_| ClipError::Backend("clipboard lock poisoned".into()))?;
        *guard = text.to_string();
        Ok(())
    }
}

/// Clipboard driven by the platform's copy/paste tools.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    copy: Vec<String>,
    paste: Vec<String>,
}

impl CommandClipboard {
    pub fn new(copy: Vec<String>, paste: Vec<String>) -> ClipResult<Self> {
        if copy.is_empty() || paste.is_empty() {
            return Err(ClipError::Config("clipboard commands must not be empty".into()));
        }
        Ok(Self { copy, paste })
    }

    /// Pick the tools for the current platform / display server.
    pub fn detect() -> ClipResult<Self> {
        let argv = |s: &[&str]| s.iter().map(|a| a.to_string()).collect::<Vec<_>>();

        if cfg!(target_os = "macos") {
            return Self::new(argv(&["pbcopy"]), argv(&["pbpaste"]));
        }
        if cfg!(windows) {
            return Self::new(
                argv(&["powershell", "-NoProfile", "-Command", "$input | Set-Clipboard"]),
                argv(&["powershell", "-NoProfile", "-Command", "Get-Clipboard -Raw"]),
            );
        }
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            return Self::new(argv(&["wl-copy"]), argv(&["wl-paste", "--no-newline"]));
        }
        if std::env::var_os("DISPLAY").is_some() {
            return Self::new(
                argv(&["xclip", "-selection", "clipboard", "-in"]),
                argv(&["xclip", "-selection", "clipboard", "-out"]),
            );
        }
        Err(ClipError::Backend(
            "no clipboard available: neither WAYLAND_DISPLAY nor DISPLAY is set".into(),
        ))
    }
}

impl ClipboardBackend for CommandClipboard {
    fn read(&self) -> ClipResult<String> {
        let output = Command::new(&self.paste[0])
            .args(&self.paste[1..])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ClipError::Backend(format!("running {}: {e}", self.paste[0])))?;
        if !output.status.success() {
            return Err(ClipError::Backend(format!(
                "{} exited with {}",
                self.paste[0], output.status
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| ClipError::Backend("clipboard does not contain UTF-8 text".into()))
    }

    fn write(&self, text: &str) -> ClipResult<()> {
        let mut child = Command::new(&self.copy[0])
            .args(&self.copy[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| ClipError::Backend(format!("running {}: {e}", self.copy[0])))?;

        // reap the child even when it stops reading early
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written.map_err(|e| ClipError::Backend(format!("writing to {}: {e}", self.copy[0])))?;
        if !status.success() {
            return Err(ClipError::Backend(format!(
                "{} exited with {status}",
                self.copy[0]
            )));
        }
        Ok(())
    }
}
