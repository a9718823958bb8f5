// LogSections - platform/config.rs
//
// Platform config directory resolution, config.toml loading with startup
// validation, and series definition files.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogSections configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logsections/ or %APPDATA%\LogSections\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[parsing]` section.
    pub parsing: ParsingSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
    /// `[[rewrite]]` entries, applied to every message in order.
    pub rewrite: Vec<RewriteDef>,
}

/// `[parsing]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ParsingSection {
    /// Maximum warnings kept per parse.
    pub max_warnings: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// One `[[rewrite]]` entry.
#[derive(Debug, serde::Deserialize)]
pub struct RewriteDef {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum warnings kept per parse.
    pub max_warnings: usize,
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Compiled `[[rewrite]]` rules, in file order.
    pub rewrites: Vec<(Regex, String)>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_warnings: constants::DEFAULT_MAX_WARNINGS,
            log_level: None,
            rewrites: Vec::new(),
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file yields defaults with no warnings; an unreadable or
/// unparseable file yields defaults with a warning.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => parse_config(&content, &config_path),
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Validate config.toml content. `config_path` is used in messages only.
pub fn parse_config(content: &str, config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            warnings.push(format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            ));
            return (AppConfig::default(), warnings);
        }
    };

    tracing::debug!(path = %config_path.display(), "Loaded config.toml");

    let mut config = AppConfig::default();

    // -- Parsing: max_warnings --
    if let Some(max) = raw.parsing.max_warnings {
        if (constants::MIN_MAX_WARNINGS..=constants::ABSOLUTE_MAX_WARNINGS).contains(&max) {
            config.max_warnings = max;
        } else {
            warnings.push(format!(
                "[parsing] max_warnings = {max} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MAX_WARNINGS,
                constants::ABSOLUTE_MAX_WARNINGS,
                constants::DEFAULT_MAX_WARNINGS,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Rewrites: each invalid entry is skipped on its own --
    for (idx, def) in raw.rewrite.into_iter().enumerate() {
        match compile_regex(&def.pattern, &format!("[[rewrite]] #{}", idx + 1)) {
            Ok(re) => config.rewrites.push((re, def.replacement)),
            Err(e) => warnings.push(format!("{e}. Rewrite skipped.")),
        }
    }

    (config, warnings)
}

/// Compile a user-supplied regex with the length limit applied.
/// `context` names the origin for error messages.
pub fn compile_regex(pattern: &str, context: &str) -> Result<Regex, ConfigError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(ConfigError::RegexTooLong {
            context: context.to_string(),
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        context: context.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

// =============================================================================
// Series definition files
// =============================================================================

/// Raw shape of a series file: one `[series.<name>]` table per series.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawSeriesFile {
    pub series: BTreeMap<String, RawSeriesDef>,
}

/// One `[series.<name>]` table as written.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawSeriesDef {
    pub log_file: Option<String>,
    pub regex: Option<String>,
    pub const_value: Option<f64>,
    pub frequency_hz: Option<f64>,
    pub color: Option<String>,
}

/// A series read from a log file.
#[derive(Debug, Clone)]
pub struct LogSeriesDef {
    pub name: String,
    pub log_file: PathBuf,
    pub regex: Option<Regex>,
    pub const_value: Option<f64>,
    pub color: Option<String>,
}

/// A synthetic constant signal sampled at a fixed frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySeriesDef {
    pub name: String,
    pub frequency_hz: f64,
    pub value: f64,
    pub color: Option<String>,
}

/// Validated series definitions.
#[derive(Debug, Clone, Default)]
pub struct SeriesConfig {
    pub log_series: Vec<LogSeriesDef>,
    pub frequency_series: Vec<FrequencySeriesDef>,
}

impl SeriesConfig {
    /// Configured colour per series name, for series that set one.
    pub fn colors(&self) -> BTreeMap<&str, &str> {
        let log = self
            .log_series
            .iter()
            .filter_map(|d| Some((d.name.as_str(), d.color.as_deref()?)));
        let frequency = self
            .frequency_series
            .iter()
            .filter_map(|d| Some((d.name.as_str(), d.color.as_deref()?)));
        log.chain(frequency).collect()
    }
}

/// Read and validate a series definition file.
///
/// Unlike config.toml, problems here are fatal: the file is the command's
/// explicit input.
pub fn load_series_config(path: &Path) -> Result<SeriesConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_series_config(&content, path, base_dir)
}

/// Validate series file content. Relative `log_file` paths resolve
/// against `base_dir`.
pub fn parse_series_config(
    content: &str,
    path: &Path,
    base_dir: &Path,
) -> Result<SeriesConfig, ConfigError> {
    let raw: RawSeriesFile = toml::from_str(content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config = SeriesConfig::default();
    for (name, def) in raw.series {
        if let Some(frequency_hz) = def.frequency_hz {
            if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
                return Err(ConfigError::ValueOutOfRange {
                    field: format!("series.{name}.frequency_hz"),
                    value: frequency_hz.to_string(),
                    expected: "a positive number".to_string(),
                });
            }
            let value = def.const_value.ok_or_else(|| ConfigError::MissingField {
                series: name.clone(),
                field: "const_value",
            })?;
            config.frequency_series.push(FrequencySeriesDef {
                name,
                frequency_hz,
                value,
                color: def.color,
            });
            continue;
        }

        let log_file = def.log_file.ok_or_else(|| ConfigError::MissingField {
            series: name.clone(),
            field: "log_file",
        })?;

        let regex = match def.regex {
            Some(ref pattern) => Some(compile_regex(pattern, &format!("[series.{name}]"))?),
            None => None,
        };
        match &regex {
            None if def.const_value.is_none() => {
                return Err(ConfigError::MissingField {
                    series: name,
                    field: "regex",
                })
            }
            // Without a capture group a match needs a constant to record.
            Some(re) if re.captures_len() < 2 && def.const_value.is_none() => {
                return Err(ConfigError::MissingField {
                    series: name,
                    field: "const_value",
                })
            }
            _ => {}
        }

        config.log_series.push(LogSeriesDef {
            name,
            log_file: base_dir.join(log_file),
            regex,
            const_value: def.const_value,
            color: def.color,
        });
    }

    tracing::debug!(
        path = %path.display(),
        log_series = config.log_series.len(),
        frequency_series = config.frequency_series.len(),
        "Series definitions loaded"
    );

    Ok(config)
}
