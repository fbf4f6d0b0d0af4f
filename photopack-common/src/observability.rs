//! `tracing` setup shared by the `photopack` binary and integration tests.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "PHOTOPACK_LOG_DIR";

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Lenient parse used for env/config strings; anything but `json` is text.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component (used for defaults and file names).
    pub app_name: &'static str,
    /// Optional explicit directory for log output. If `None`, we consult
    /// `PHOTOPACK_LOG_DIR` and finally fall back to `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Whether to duplicate events to `stderr` in addition to the file sink.
    pub emit_stderr: bool,
    /// Preferred log encoding.
    pub format: LogFormat,
    /// Default filter applied when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "photopack",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn layer_for<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

/// Install the global `tracing` subscriber: a daily rolling file under the
/// resolved log directory, optionally mirrored to stderr.
///
/// Returns today's log file path. Only the first call installs anything;
/// later calls return the path resolved by the first.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let prefix = format!("{}.log", config.app_name);
    let today_file = dir.join(format!("{prefix}.{}", Local::now().format("%Y-%m-%d")));
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &prefix));
    let _ = LOG_GUARD.set(guard);

    let mut layers = vec![layer_for(config.format, writer, false)];
    if config.emit_stderr {
        layers.push(layer_for(config.format, std::io::stderr, true));
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.as_str()));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(today_file.clone());
    Ok(today_file)
}

/// Explicit directory, then `PHOTOPACK_LOG_DIR`, then the per-user data dir.
fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))
        .map(|dir| expand_home(&dir))
        .unwrap_or_else(|| default_data_dir(app_name))
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

fn default_data_dir(app_name: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".local/share").join(app_name),
        None => PathBuf::from(".").join(app_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = resolve_log_dir("photopack", Some(tmp.path()));
        assert_eq!(dir, tmp.path());
    }

    #[test]
    fn default_dir_ends_with_app_name() {
        assert!(default_data_dir("photopack").ends_with("photopack"));
    }

    #[test]
    fn home_prefix_is_expanded() {
        assert_eq!(expand_home(Path::new("/var/log")), PathBuf::from("/var/log"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_home(Path::new("~/logs")), PathBuf::from(home).join("logs"));
        }
    }

    #[test]
    fn format_names() {
        assert_eq!(LogFormat::from_name(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::from_name("pretty"), LogFormat::Text);
    }
}
