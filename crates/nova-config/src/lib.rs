use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Once;

use thiserror::Error;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Binary name of the debuggee-side helper that stringifies a batch of values.
pub const DEFAULT_BATCH_HELPER_CLASS: &str = "com.intellij.rt.debugger.BatchEvaluatorServer";
pub const DEFAULT_BATCH_HELPER_METHOD: &str = "evaluate";
pub const DEFAULT_BATCH_HELPER_SIGNATURE: &str = "([Ljava/lang/Object;)Ljava/lang/String;";
pub const DEFAULT_BATCH_ARRAY_TYPE: &str = "java.lang.Object[]";

/// Top-level configuration for Nova's debugger components.
///
/// Example:
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [debugger]
/// batch_evaluation = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NovaConfig {
    /// Global logging settings for Nova crates.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Debugger behaviour (value rendering, batching).
    #[serde(default)]
    pub debugger: DebuggerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Stringify all values shown for one stop with a single remote call.
    ///
    /// When disabled every value is rendered with its own `toString()` call.
    #[serde(default = "DebuggerConfig::default_batch_evaluation")]
    pub batch_evaluation: bool,

    /// Helper class looked up in the debuggee.
    #[serde(default = "DebuggerConfig::default_helper_class")]
    pub batch_helper_class: String,

    #[serde(default = "DebuggerConfig::default_helper_method")]
    pub batch_helper_method: String,

    /// JNI signature of the helper method.
    #[serde(default = "DebuggerConfig::default_helper_signature")]
    pub batch_helper_signature: String,

    /// Array type used to pass the values to the helper.
    #[serde(default = "DebuggerConfig::default_array_type")]
    pub batch_array_type: String,
}

impl DebuggerConfig {
    fn default_batch_evaluation() -> bool {
        true
    }

    fn default_helper_class() -> String {
        DEFAULT_BATCH_HELPER_CLASS.to_owned()
    }

    fn default_helper_method() -> String {
        DEFAULT_BATCH_HELPER_METHOD.to_owned()
    }

    fn default_helper_signature() -> String {
        DEFAULT_BATCH_HELPER_SIGNATURE.to_owned()
    }

    fn default_array_type() -> String {
        DEFAULT_BATCH_ARRAY_TYPE.to_owned()
    }
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            batch_evaluation: Self::default_batch_evaluation(),
            batch_helper_class: Self::default_helper_class(),
            batch_helper_method: Self::default_helper_method(),
            batch_helper_signature: Self::default_helper_signature(),
            batch_array_type: Self::default_array_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// A bare level (`debug`) or a full filter such as
    /// `info,nova.batch_eval=debug`.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,

    /// Write events to stderr. When off, events are filtered and discarded.
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
            stderr: true,
        }
    }
}

impl LoggingConfig {
    /// Filter directives for `level`. Bare level names are case-insensitive
    /// and accept `warning` for `warn`; blank means `info`.
    pub fn directives(&self) -> String {
        let level = self.level.trim();
        let lower = level.to_ascii_lowercase();
        match lower.as_str() {
            "" => "info".to_owned(),
            "warning" => "warn".to_owned(),
            "trace" | "debug" | "info" | "warn" | "error" => lower,
            _ => level.to_owned(),
        }
    }

    /// The effective filter: configured directives, then `RUST_LOG` on top.
    pub fn env_filter(&self) -> EnvFilter {
        let rust_log = std::env::var("RUST_LOG").ok();
        self.filter_with(rust_log.as_deref())
    }

    /// Tries `own,extra`, then `own`, then plain `info`.
    fn filter_with(&self, extra: Option<&str>) -> EnvFilter {
        let own = self.directives();
        let combined = extra
            .map(str::trim)
            .filter(|extra| !extra.is_empty())
            .map(|extra| format!("{own},{extra}"));
        combined
            .into_iter()
            .chain(std::iter::once(own))
            .find_map(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` includes a snippet of the raw input; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl NovaConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Only the first call in a process does anything. A subscriber installed
/// elsewhere is left in place.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let output = config.stderr.then(|| {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false);
            if config.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            }
        });

        let installed = tracing_subscriber::registry()
            .with(config.env_filter())
            .with(output)
            .try_init();
        if installed.is_err() {
            tracing::debug!(
                target: "nova.config",
                "a global tracing subscriber is already installed"
            );
        }
    });
}
