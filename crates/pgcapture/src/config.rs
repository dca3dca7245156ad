//! Capture configuration.
//!
//! A [`CaptureConfig`] is an explicit, immutable value handed to every
//! [`QueryCapture`](crate::QueryCapture). Hosts that reload settings build a new value and
//! pass it to the scopes they create afterwards.
//!
//! The serialized form keeps the upper-case key names:
//!
//! ```toml
//! PRESENTER = "pretty"
//! IGNORE_SQL_PATTERNS = ["^SAVEPOINT", "pg_catalog"]
//!
//! [PRINT_THRESHOLDS]
//! SLOW_MIN_SECOND = 0.5
//! DUPLICATE_MIN_COUNT = 5
//! SIMILAR_MIN_COUNT = false   # disabled
//!
//! [PRETTY]
//! TABLE_FORMAT = "ascii"
//! ```

use crate::classify::Thresholds;
use crate::error::{CaptureError, CaptureResult};
use colored::Color;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Environment variable naming a configuration file for [`CaptureConfig::from_env`].
pub const CONFIG_ENV_VAR: &str = "PGCAPTURE_CONFIG";

/// Top-level capture configuration. Absent keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct CaptureConfig {
    /// Thresholds above which statements are reported.
    pub print_thresholds: PrintThresholds,
    /// Registry name of the presenter used by scopes.
    pub presenter: String,
    /// Regular expressions; statements whose interpolated SQL matches any of them are
    /// left out of classification.
    pub ignore_sql_patterns: Vec<String>,
    /// Options for the table-based presenters.
    pub pretty: PrettyConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            print_thresholds: PrintThresholds::default(),
            presenter: "pretty".to_string(),
            ignore_sql_patterns: Vec::new(),
            pretty: PrettyConfig::default(),
        }
    }
}

/// Reporting thresholds. `None` disables the corresponding check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct PrintThresholds {
    /// Statements slower than this many seconds are slow.
    #[serde(deserialize_with = "deserialize_threshold")]
    pub slow_min_second: Option<f64>,
    /// Duplicate groups with more members than this are reported.
    #[serde(deserialize_with = "deserialize_threshold")]
    pub duplicate_min_count: Option<u64>,
    /// Similar groups with more members than this are reported.
    #[serde(deserialize_with = "deserialize_threshold")]
    pub similar_min_count: Option<u64>,
    /// Color used to emphasize output once a threshold is exceeded.
    pub color: String,
}

impl Default for PrintThresholds {
    fn default() -> Self {
        Self {
            slow_min_second: Some(1.0),
            duplicate_min_count: Some(10),
            similar_min_count: Some(10),
            color: "magenta".to_string(),
        }
    }
}

/// Options for the table-based presenters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct PrettyConfig {
    /// Table style: `pretty`, `ascii`, `markdown` or `plain`.
    pub table_format: String,
    /// Color for SQL keywords, or `none`.
    pub sql_color_format: String,
    /// Whether presenters emit ANSI colors at all.
    pub colorize: bool,
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self {
            table_format: "pretty".to_string(),
            sql_color_format: "blue".to_string(),
            colorize: true,
        }
    }
}

/// Accepts a number, `null` (JSON) or `false` (TOML has no null) for a disabled threshold.
fn deserialize_threshold<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Flag(bool),
        Value(T),
    }

    match Option::<Raw<T>>::deserialize(deserializer)? {
        None | Some(Raw::Flag(false)) => Ok(None),
        Some(Raw::Flag(true)) => Err(D::Error::custom(
            "threshold must be a number, null or false",
        )),
        Some(Raw::Value(value)) => Ok(Some(value)),
    }
}

impl CaptureConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> CaptureResult<Self> {
        toml::from_str(raw).map_err(|e| CaptureError::config(format!("invalid TOML: {e}")))
    }

    /// Parse a JSON document.
    pub fn from_json_str(raw: &str) -> CaptureResult<Self> {
        serde_json::from_str(raw).map_err(|e| CaptureError::config(format!("invalid JSON: {e}")))
    }

    /// Load a configuration file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CaptureError::config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_toml_str(&raw)
        }
        .map_err(|e| CaptureError::config(format!("{}: {e}", path.display())))?;

        tracing::debug!(
            target: "pgcapture.config",
            path = %path.display(),
            presenter = %config.presenter,
            "loaded capture configuration"
        );
        Ok(config)
    }

    /// Load the file named by `PGCAPTURE_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> CaptureResult<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Set (or disable) the slow statement threshold, in seconds.
    pub fn with_slow_min_second(mut self, seconds: Option<f64>) -> Self {
        self.print_thresholds.slow_min_second = seconds;
        self
    }

    /// Set (or disable) the duplicate count threshold.
    pub fn with_duplicate_min_count(mut self, count: Option<u64>) -> Self {
        self.print_thresholds.duplicate_min_count = count;
        self
    }

    /// Set (or disable) the similar count threshold.
    pub fn with_similar_min_count(mut self, count: Option<u64>) -> Self {
        self.print_thresholds.similar_min_count = count;
        self
    }

    /// Set the presenter name.
    pub fn with_presenter(mut self, name: impl Into<String>) -> Self {
        self.presenter = name.into();
        self
    }

    /// Replace the ignore patterns.
    pub fn with_ignore_sql_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_sql_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the table style.
    pub fn with_table_format(mut self, format: impl Into<String>) -> Self {
        self.pretty.table_format = format.into();
        self
    }

    /// Set the SQL keyword color (`none` disables it).
    pub fn with_sql_color_format(mut self, format: impl Into<String>) -> Self {
        self.pretty.sql_color_format = format.into();
        self
    }

    /// Enable or disable ANSI colors.
    pub fn with_colorize(mut self, colorize: bool) -> Self {
        self.pretty.colorize = colorize;
        self
    }

    /// Thresholds used by the classifier.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            slow_min_second: self.print_thresholds.slow_min_second,
            duplicate_min_count: self.print_thresholds.duplicate_min_count,
            similar_min_count: self.print_thresholds.similar_min_count,
        }
    }

    /// Warning color, or `None` when colors are disabled or the name is unknown.
    pub fn warning_color(&self) -> Option<Color> {
        self.color(&self.print_thresholds.color)
    }

    /// SQL keyword color, or `None` when disabled or unknown.
    pub fn sql_keyword_color(&self) -> Option<Color> {
        self.color(&self.pretty.sql_color_format)
    }

    fn color(&self, name: &str) -> Option<Color> {
        if !self.pretty.colorize || name.eq_ignore_ascii_case("none") {
            return None;
        }
        name.parse::<Color>().ok()
    }
}
