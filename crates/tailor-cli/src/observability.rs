use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "tailor.logs.jsonl";

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Logging settings resolved from the environment and CLI flags.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    enabled: bool,
    /// Explicit filter directive; `None` defers to `RUST_LOG` then the default.
    filter: Option<String>,
    default_level: &'static str,
    json_path: Option<PathBuf>,
}

impl LogSettings {
    fn resolve(lookup: impl Fn(&str) -> Option<String>, verbose: bool) -> Self {
        let enabled = ["TAILOR_OBSERVABILITY_ENABLED", "TAILOR_OBSERVABILITY"]
            .into_iter()
            .find_map(|key| lookup(key))
            .map(|value| parse_bool_env(&value).unwrap_or(true))
            .unwrap_or(true);
        Self {
            enabled,
            filter: lookup("TAILOR_LOG_LEVEL").filter(|v| !v.trim().is_empty()),
            default_level: if verbose { "debug" } else { "warn" },
            json_path: lookup("TAILOR_JSON_LOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        if let Some(level) = &self.filter
            && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
        {
            return filter;
        }
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.default_level))
    }
}

/// Installs the global subscriber once per process.
///
/// Environment variables:
/// - `TAILOR_OBSERVABILITY_ENABLED` / `TAILOR_OBSERVABILITY`: enable/disable flag (default enabled).
/// - `TAILOR_LOG_LEVEL`: level/filter override (`info`, `tailor_client=debug`, ...).
/// - `TAILOR_JSON_LOG_PATH`: when set, logs are JSONL in that file; otherwise they
///   go to stderr in compact form so stdout only carries results.
/// - `RUST_LOG`: used when `TAILOR_LOG_LEVEL` is unset.
///
/// `verbose` lowers the default level from `warn` to `debug`.
pub fn init_observability(verbose: bool) {
    INIT.get_or_init(|| {
        let settings = LogSettings::resolve(|key| std::env::var(key).ok(), verbose);
        if !settings.enabled {
            return;
        }
        let env_filter = settings.env_filter();

        match &settings.json_path {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new("."));
                let _ = std::fs::create_dir_all(dir);
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_LOG_FILE);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            None => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}
