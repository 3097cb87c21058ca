use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ClipError, ClipResult};
use crate::line_ending::LineEnding;
use crate::types::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, DEFAULT_PORT};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub keys: KeysConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Loopback TCP port to listen on (default: 2850)
    pub port: u16,
    /// Per-operation read/write deadline in seconds (0 disables it)
    pub io_timeout_secs: u64,
    /// Line-ending conversion applied to copied text
    pub line_ending: LineEnding,
    /// Keep serving while the desktop session is locked
    pub ignore_session_lock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Port of the service to call (default: 2850)
    pub port: u16,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Per-operation read/write deadline in seconds (0 disables it)
    pub io_timeout_secs: u64,
    /// Line-ending conversion applied to pasted text
    pub line_ending: LineEnding,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Key directory holding key.pub, key and trusted (default: ~/.clipr)
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl ClipConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> ClipResult<Self> {
        toml::from_str(text).map_err(|e| ClipError::Config(e.to_string()))
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> ClipResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| ClipError::Config(format!("parsing {}: {e}", path.display())))
    }
}

impl ServerConfig {
    pub fn io_timeout(&self) -> Option<Duration> {
        secs_or_none(self.io_timeout_secs)
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        secs_or_none(self.io_timeout_secs)
    }
}

fn secs_or_none(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            io_timeout_secs: DEFAULT_IO_TIMEOUT.as_secs(),
            line_ending: LineEnding::Keep,
            ignore_session_lock: false,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            io_timeout_secs: DEFAULT_IO_TIMEOUT.as_secs(),
            line_ending: LineEnding::Keep,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[server]
port = 3000
io_timeout_secs = 5
line_ending = "crlf"
ignore_session_lock = true

[client]
port = 3001
connect_timeout_secs = 2
io_timeout_secs = 0
line_ending = "lf"

[keys]
dir = "/home/user/.clipr"

[log]
level = "debug"
format = "json"
"#;
        let config = ClipConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.io_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.server.line_ending, LineEnding::Crlf);
        assert!(config.server.ignore_session_lock);
        assert_eq!(config.client.port, 3001);
        assert_eq!(config.client.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.client.io_timeout(), None);
        assert_eq!(config.client.line_ending, LineEnding::Lf);
        assert_eq!(config.keys.dir, Some(PathBuf::from("/home/user/.clipr")));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config = ClipConfig::from_toml("").unwrap();

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.io_timeout(), Some(DEFAULT_IO_TIMEOUT));
        assert!(!config.server.ignore_session_lock);
        assert_eq!(config.client.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.client.line_ending, LineEnding::Keep);
        assert!(config.keys.dir.is_none());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let config = ClipConfig::from_toml("[client]\nport = 4000\n").unwrap();

        // Overridden
        assert_eq!(config.client.port, 4000);
        // Defaults
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_unknown_line_ending_rejected() {
        assert!(ClipConfig::from_toml("[server]\nline_ending = \"cr\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = ClipConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = ClipConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = ClipConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.server.port, parsed.server.port);
        assert_eq!(config.client.io_timeout_secs, parsed.client.io_timeout_secs);
        assert_eq!(config.log.level, parsed.log.level);
    }
}
