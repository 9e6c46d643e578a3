//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults (`AppConfig::default()`)
//! 2. Optional config file (TOML/JSON/YAML, picked by extension)
//! 3. `RETAIL_AGGREGATOR__*` environment variables, `__` between sections

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

pub use crate::infrastructure::http_client::HttpClientConfig;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub http: HttpClientConfig,
    pub pagination: PaginationConfig,
    pub snapshot: SnapshotConfig,
    pub retailers: RetailersConfig,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable daily rolling file output
    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Per-target level overrides applied unless the level is "trace"
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("h2".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

/// Walker limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Upper bound on pages fetched for one category
    pub max_pages_per_category: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages_per_category: defaults::MAX_PAGES_PER_CATEGORY,
        }
    }
}

/// Snapshot persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Snapshot file; `None` resolves to the platform data directory
    pub path: Option<PathBuf>,

    /// Restore the snapshot on startup when the file exists
    pub restore_on_start: bool,

    /// Pretty-print the JSON snapshot
    pub pretty: bool,

    /// Number of cheapest products logged after a run
    pub summary_limit: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: None,
            restore_on_start: true,
            pretty: false,
            summary_limit: defaults::SUMMARY_LIMIT,
        }
    }
}

impl SnapshotConfig {
    /// Configured path, or `<data dir>/retail-aggregator/products.json`
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join(defaults::APP_DIR_NAME))
                .unwrap_or_default()
                .join(defaults::SNAPSHOT_FILE_NAME)
        })
    }
}

/// Adapters to run, in walk order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetailersConfig {
    pub musik_produktiv: MusikProduktivConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusikProduktivConfig {
    pub enabled: bool,
    pub base_url: String,
    /// URL path segments of the listing categories
    pub categories: Vec<String>,
}

impl Default for MusikProduktivConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: musik_produktiv::BASE_URL.to_string(),
            categories: musik_produktiv::DEFAULT_CATEGORIES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Runs before logging is set up, so it reports only through its result.
    /// An explicit `path` must exist; otherwise `retail-aggregator.{toml,json,yaml}`
    /// in the working directory is picked up when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to serialize default configuration")?;

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(defaults::CONFIG_FILE_STEM).required(false),
        };

        let config: Self = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("retailers.musik_produktiv.categories")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(config)
    }
}

/// Default configuration values
pub mod defaults {
    /// Application directory name under the platform data dir
    pub const APP_DIR_NAME: &str = "retail-aggregator";

    pub const SNAPSHOT_FILE_NAME: &str = "products.json";

    /// Config file looked up in the working directory (extension optional)
    pub const CONFIG_FILE_STEM: &str = "retail-aggregator";

    /// Environment variable holding an explicit config file path
    pub const CONFIG_PATH_ENV: &str = "RETAIL_AGGREGATOR_CONFIG";

    pub const ENV_PREFIX: &str = "RETAIL_AGGREGATOR";

    pub const LOG_LEVEL: &str = "info";

    pub const LOG_FILE_PREFIX: &str = "retail-aggregator.log";

    pub const USER_AGENT: &str = "retail-aggregator/0.1 (+price comparison)";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const MAX_REDIRECTS: usize = 10;

    /// No real listing comes close; stops a runaway adapter
    pub const MAX_PAGES_PER_CATEGORY: u32 = 1000;

    pub const SUMMARY_LIMIT: usize = 10;
}

/// musik-produktiv.de endpoints
pub mod musik_produktiv {
    pub const BASE_URL: &str = "https://www.musik-produktiv.de";

    /// Left-handed instrument listings
    pub const DEFAULT_CATEGORIES: &[&str] = &[
        "e-gitarre-linkshaender",
        "westerngitarre-linkshaender",
        "e-bass-linkshaender",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.pagination.max_pages_per_category, 1000);
        assert!(config.retailers.musik_produktiv.enabled);
        assert_eq!(config.retailers.musik_produktiv.categories.len(), 3);
        assert!(
            config
                .snapshot
                .resolved_path()
                .ends_with("retail-aggregator/products.json")
        );
    }

    #[test]
    fn test_load_overrides_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[pagination]
max_pages_per_category = 5

[snapshot]
path = "/tmp/snapshot.json"
pretty = true

[retailers.musik_produktiv]
categories = ["e-gitarre-linkshaender"]
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.pagination.max_pages_per_category, 5);
        assert_eq!(config.snapshot.resolved_path(), PathBuf::from("/tmp/snapshot.json"));
        assert!(config.snapshot.pretty);
        assert_eq!(
            config.retailers.musik_produktiv.categories,
            vec!["e-gitarre-linkshaender".to_string()]
        );
        // untouched sections keep their defaults
        assert_eq!(config.http, HttpClientConfig::default());
        assert_eq!(config.retailers.musik_produktiv.base_url, musik_produktiv::BASE_URL);
    }

    #[derive(Clone, Default)]
    struct CapturedOutput(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_load_emits_no_log_events() {
        let output = CapturedOutput::default();
        let writer = output.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();

        let config = tracing::subscriber::with_default(subscriber, || AppConfig::load(None));

        assert!(config.is_ok());
        assert!(output.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/retail-aggregator.toml")));
        assert!(result.is_err());
    }
}
