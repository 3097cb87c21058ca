//! clipr: remote clipboard and URL opener
//!
//! Client commands (run on the remote host, talk to the service over a
//! forwarded loopback port):
//!   copy [TEXT]   - send TEXT (or stdin) to the service clipboard
//!   paste         - print the service clipboard
//!   open URL      - open URL with the service host's default handler
//!   genkey        - create the signing keypair in the key directory
//!
//! Service commands:
//!   server        - serve calls from trusted keys
//!   config show   - print the effective configuration
//!
//! Installed as `pbcopy`, `pbpaste` or `xdg-open`, behaves as the matching
//! client command.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clipr_core::config::ClipConfig;
use clipr_core::{ClipError, LineEnding, Magic};
use clipr_crypto::{create_keys, default_key_dir, format_trusted_line, read_keys, TrustStore};
use clipr_server::uri::parse_scheme;
use clipr_server::{
    serve, ClipboardBackend, CommandClipboard, MemoryClipboard, ServerOptions, Services,
    SystemOpener,
};
use clipr_transport::{Client, ClientOptions, SessionLock};

const EXIT_USAGE: u8 = 6;
const EXIT_NO_KEYS: u8 = 7;
const EXIT_FAILURE: u8 = 8;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "clipr",
    version,
    about = "Remote clipboard and URL opener over an authenticated channel"
)]
struct Cli {
    /// Path to clipr.toml configuration file (default: ~/.clipr/config.toml)
    #[arg(long, short = 'c', env = "CLIPR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// TCP port of the service
    #[arg(long, short = 'p', global = true)]
    port: Option<u16>,

    /// Line ending conversion for clipboard text (lf, crlf)
    #[arg(long, global = true)]
    line_ending: Option<LineEnding>,

    /// Connect timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    connect_timeout: Option<u64>,

    /// Per-read/write timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Directory holding key, key.pub and trusted
    #[arg(long, env = "CLIPR_KEY_DIR", global = true)]
    key_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CLIPR_LOG", global = true)]
    log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "CLIPR_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    /// Shorthand for --log debug
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send text to the service clipboard
    Copy {
        /// Text to copy (default: read stdin)
        text: Option<String>,
    },

    /// Print the service clipboard
    Paste,

    /// Open a URL on the service host
    Open {
        url: String,
    },

    /// Generate the signing keypair
    Genkey,

    /// Serve clipboard and URL calls from trusted keys
    Server {
        /// Keep serving while the desktop session is locked
        #[arg(long)]
        ignore_session_lock: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (defaults + file + flags)
    Show,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(resolve_alias(std::env::args_os().collect())) {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("clipr: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Rewrite `pbcopy ARGS` to `clipr copy ARGS` (and likewise for the
/// other aliases). Other invocations pass through untouched.
fn resolve_alias(args: Vec<OsString>) -> Vec<OsString> {
    let program = args
        .first()
        .and_then(|a| Path::new(a).file_stem())
        .and_then(|s| s.to_str());
    let command = match program {
        Some("pbcopy") => "copy",
        Some("pbpaste") => "paste",
        Some("xdg-open") => "open",
        _ => return args,
    };

    let mut rewritten = vec![OsString::from("clipr"), OsString::from(command)];
    rewritten.extend(args.into_iter().skip(1));
    rewritten
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<UsageError>().is_some() {
        return EXIT_USAGE;
    }
    match err.downcast_ref::<ClipError>() {
        Some(
            ClipError::KeysNotFound(_)
            | ClipError::BadKeySize { .. }
            | ClipError::CorruptKeys(_)
            | ClipError::InsecurePermissions(_)
            | ClipError::TrustFileNotFound(_)
            | ClipError::NoTrustedKeys,
        ) => EXIT_NO_KEYS,
        _ => EXIT_FAILURE,
    }
}

async fn run(cli: Cli) -> Result<()> {
    // without HOME there is no default config file, only defaults
    let config_path = cli
        .config
        .clone()
        .or_else(|| default_key_dir().ok().map(|d| d.join("config.toml")));
    let mut config = match &config_path {
        Some(path) => ClipConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClipConfig::default(),
    };
    apply_overrides(&mut config, &cli);

    let is_server = matches!(cli.command, Commands::Server { .. });
    init_logging(&log_level(&cli, &config, is_server), &log_format(&cli, &config));

    let key_dir = match config.keys.dir.clone() {
        Some(dir) => dir,
        None => default_key_dir()?,
    };

    match cli.command {
        Commands::Copy { text } => cmd_copy(&config, &key_dir, text).await,
        Commands::Paste => cmd_paste(&config, &key_dir).await,
        Commands::Open { url } => cmd_open(&config, &key_dir, url).await,
        Commands::Genkey => cmd_genkey(&key_dir),
        Commands::Server { .. } => cmd_server(&config, &key_dir).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, config_path.as_deref()),
    }
}

// ── Config & logging ──────────────────────────────────────────────────────────

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut ClipConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.server.port = port;
        config.client.port = port;
    }
    if let Some(le) = cli.line_ending {
        config.server.line_ending = le;
        config.client.line_ending = le;
    }
    if let Some(secs) = cli.connect_timeout {
        config.client.connect_timeout_secs = secs;
    }
    if let Some(secs) = cli.timeout {
        config.server.io_timeout_secs = secs;
        config.client.io_timeout_secs = secs;
    }
    if let Some(dir) = &cli.key_dir {
        config.keys.dir = Some(dir.clone());
    }
    if let Commands::Server {
        ignore_session_lock: true,
    } = cli.command
    {
        config.server.ignore_session_lock = true;
    }
}

/// Client commands stay quiet unless asked; stdout carries their output.
fn log_level(cli: &Cli, config: &ClipConfig, is_server: bool) -> String {
    if cli.debug {
        return "debug".into();
    }
    match (&cli.log, is_server) {
        (Some(level), _) => level.clone(),
        (None, true) => config.log.level.clone(),
        (None, false) => "warn".into(),
    }
}

fn log_format(cli: &Cli, config: &ClipConfig) -> LogFormat {
    cli.log_format
        .clone()
        .or_else(|| LogFormat::from_str(&config.log.format, true).ok())
        .unwrap_or(LogFormat::Text)
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Client commands ───────────────────────────────────────────────────────────

async fn connect(config: &ClipConfig, key_dir: &Path) -> Result<Client> {
    let keys = read_keys(key_dir)
        .with_context(|| format!("loading keys from {}", key_dir.display()))?;
    let opts = ClientOptions {
        magic: Magic::current(),
        connect_timeout: config.client.connect_timeout(),
        io_timeout: config.client.io_timeout(),
    };
    let port = config.client.port;
    Client::connect((Ipv4Addr::LOCALHOST, port), Arc::new(keys), opts)
        .await
        .with_context(|| format!("connecting to localhost:{port}"))
}

async fn cmd_copy(config: &ClipConfig, key_dir: &Path, text: Option<String>) -> Result<()> {
    let text = match text {
        Some(t) => t,
        None => {
            use tokio::io::AsyncReadExt;
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading stdin")?;
            buf
        }
    };

    let mut client = connect(config, key_dir).await?;
    client.copy(text).await.context("Clipboard.Copy")?;
    Ok(())
}

async fn cmd_paste(config: &ClipConfig, key_dir: &Path) -> Result<()> {
    use std::io::Write;

    let mut client = connect(config, key_dir).await?;
    let text = client.paste().await.context("Clipboard.Paste")?;
    let text = config.client.line_ending.convert(&text);

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

async fn cmd_open(config: &ClipConfig, key_dir: &Path, url: String) -> Result<()> {
    if parse_scheme(&url).is_none() {
        return Err(UsageError(format!("{url:?} is not an absolute URI")).into());
    }
    let mut client = connect(config, key_dir).await?;
    client.open(url).await.context("URI.Open")?;
    Ok(())
}

fn cmd_genkey(key_dir: &Path) -> Result<()> {
    if read_keys(key_dir).is_ok() {
        anyhow::bail!(
            "usable keys already exist in {}; remove them to generate new ones",
            key_dir.display()
        );
    }

    let keys = create_keys(key_dir)
        .with_context(|| format!("creating keys in {}", key_dir.display()))?;
    println!("{}", format_trusted_line(&keys.public_key()));
    eprintln!(
        "Keys written to {}. Add the public key above to the service's trusted file.",
        key_dir.display()
    );
    Ok(())
}

// ── Service commands ──────────────────────────────────────────────────────────

async fn cmd_server(config: &ClipConfig, key_dir: &Path) -> Result<()> {
    let trust = TrustStore::load(key_dir)
        .with_context(|| format!("loading trusted keys from {}", key_dir.display()))?;
    for (digest, _) in trust.iter() {
        info!(digest = %hex::encode(digest), "trusting key");
    }

    let clipboard: Arc<dyn ClipboardBackend> = match CommandClipboard::detect() {
        Ok(cb) => Arc::new(cb),
        Err(e) => {
            warn!("{e}; serving a process-local clipboard");
            Arc::new(MemoryClipboard::new())
        }
    };
    let services = Services::new(clipboard, Arc::new(SystemOpener), config.server.line_ending);

    let cancel = CancellationToken::new();
    spawn_shutdown_handler(cancel.clone())?;

    let mut opts = ServerOptions::new(config.server.port, Arc::new(trust));
    opts.io_timeout = config.server.io_timeout();
    if !config.server.ignore_session_lock {
        let lock = SessionLock::new();
        watch_session(lock.clone(), cancel.clone())?;
        opts.lock = Some(lock);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        line_ending = %config.server.line_ending,
        "clipr server starting"
    );
    serve(cancel, opts, services).await?;
    info!("clipr server stopped");
    Ok(())
}

#[cfg(unix)]
fn watch_session(lock: SessionLock, cancel: CancellationToken) -> Result<()> {
    let signals = clipr_server::SessionSignals::register()
        .context("registering session lock signals")?;
    tokio::spawn(signals.run(lock, cancel));
    Ok(())
}

#[cfg(not(unix))]
fn watch_session(_lock: SessionLock, _cancel: CancellationToken) -> Result<()> {
    warn!("session lock events are not supported on this platform");
    Ok(())
}

#[cfg(unix)]
fn spawn_shutdown_handler(cancel: CancellationToken) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("registering SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("registering SIGINT handler")?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
            _ = sigint.recv() => info!("SIGINT received, shutting down"),
        }
        cancel.cancel();
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_shutdown_handler(cancel: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });
    Ok(())
}

fn cmd_config_show(config: &ClipConfig, config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) if path.exists() => println!("# Configuration from: {}", path.display()),
        Some(path) => println!("# Configuration: defaults (no file at {})", path.display()),
        None => println!("# Configuration: defaults"),
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("rendering config")?;
    print!("{rendered}");
    Ok(())
}
