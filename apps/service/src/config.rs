use std::{env, fmt, fs, path, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// Default pause between the end of one cycle and the start of the next
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("configuration path unavailable: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,

    #[error("configuration is missing the `{0}` section")]
    MissingSection(&'static str),

    #[error("unknown probe type `{0}`")]
    UnknownProbe(String),

    #[error("unknown notification channel `{0}`")]
    UnknownChannel(String),

    #[error("invalid `{kind}` options: {reason}")]
    InvalidOptions { kind: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ConfigError {
    pub(crate) fn invalid(kind: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::InvalidOptions { kind: kind.to_string(), reason: reason.to_string() }
    }
}

/// Heartbeat configuration.
///
/// `monitor` maps a probe type to its instances and `notify` maps a channel
/// name to its settings. Both keep the order they were declared in.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Milliseconds to wait between cycles
    #[serde(default)]
    pub interval: Option<u64>,

    /// libsql database receiving every result
    #[serde(default = "default_database")]
    pub database: String,

    /// Timeout applied to HTTP requests and TCP connects
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    pub monitor: Option<toml::Table>,
    pub notify: Option<toml::Table>,
}

fn default_database() -> String {
    "heartbeat.db".into()
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/heartbeat/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("heartbeat/config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: None,
            database: default_database(),
            timeout_seconds: default_timeout_seconds(),
            monitor: None,
            notify: None,
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(raw)?)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Heartbeat Configuration:")?;
        write_title_1(f, "Schedule")?;
        write_1(f, "Interval (ms)", &self.interval_ms())?;
        write_1(f, "Timeout (s)", &self.timeout_seconds)?;
        write_title_1(f, "Storage")?;
        write_1(f, "Database", &self.database)?;

        write_title_1(f, "Monitors")?;
        for (kind, instances) in self.monitor.iter().flatten() {
            let count = instances.as_array().map(Vec::len).unwrap_or(1);
            write_1(f, kind, &count)?;
        }

        // Channel settings carry credentials; only names are printed
        write_title_1(f, "Notify")?;
        for channel in self.notify.iter().flat_map(|table| table.keys()) {
            write_1(f, channel, &"enabled")?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Reads `~/.config/heartbeat/config.toml` unless a path is given.
    ///
    /// ```ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let raw_string = fs::read_to_string(&config_path)
            .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
        raw_string.parse()
    }

    /// Configured interval, falling back to [`DEFAULT_INTERVAL_MS`]
    pub fn interval_ms(&self) -> u64 {
        self.interval.unwrap_or(DEFAULT_INTERVAL_MS)
    }
}
