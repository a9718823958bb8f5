// LogSections - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// All errors preserve the causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogSections operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogSectionsError {
    /// Reading or classifying log lines failed.
    Parse(ParseError),

    /// The partial section tree could not be sealed.
    Seal(SealError),

    /// Numeric series extraction failed.
    Series(SeriesError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context (e.g. the input log cannot be opened).
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogSectionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Seal(e) => write!(f, "Section structure error: {e}"),
            Self::Series(e) => write!(f, "Series error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogSectionsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Seal(e) => Some(e),
            Self::Series(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Fatal errors raised while scanning log lines into sections.
#[derive(Debug)]
pub enum ParseError {
    /// A line has the `[time] [level] message` shape but its time token
    /// is not a valid `HH:MM:SS.ffffff` time of day.
    Timestamp {
        line_number: u64,
        raw_timestamp: String,
        source: chrono::ParseError,
    },

    /// I/O error while reading the line source.
    Io { line_number: u64, source: io::Error },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp {
                line_number,
                raw_timestamp,
                source,
            } => write!(
                f,
                "line {line_number}: cannot parse timestamp '{raw_timestamp}': {source}"
            ),
            Self::Io {
                line_number,
                source,
            } => write!(f, "I/O error after line {line_number}: {source}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timestamp { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ParseError> for LogSectionsError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Seal errors
// ---------------------------------------------------------------------------

/// A section that was still open when the input ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnclosedSection {
    pub name: String,
    pub start_line: u64,
}

/// Structural invariant violations found while sealing a partial tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    /// One or more sections never received their end marker.
    UnclosedSections { sections: Vec<UnclosedSection> },
}

impl fmt::Display for SealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnclosedSections { sections } => {
                write!(
                    f,
                    "{} section(s) left open at end of input:",
                    sections.len()
                )?;
                for (i, section) in sections.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(
                        f,
                        "{sep}'{}' (started line {})",
                        section.name, section.start_line
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SealError {}

impl From<SealError> for LogSectionsError {
    fn from(e: SealError) -> Self {
        Self::Seal(e)
    }
}

// ---------------------------------------------------------------------------
// Series errors
// ---------------------------------------------------------------------------

/// Errors related to numeric series extraction.
#[derive(Debug)]
pub enum SeriesError {
    /// The value captured by a rule's regex is not a number.
    InvalidValue {
        rule: String,
        line_number: u64,
        raw_value: String,
    },

    /// I/O error while reading the line source.
    Io { line_number: u64, source: io::Error },
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue {
                rule,
                line_number,
                raw_value,
            } => write!(
                f,
                "series '{rule}', line {line_number}: captured value '{raw_value}' is not a number"
            ),
            Self::Io {
                line_number,
                source,
            } => write!(f, "I/O error after line {line_number}: {source}"),
        }
    }
}

impl std::error::Error for SeriesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SeriesError> for LogSectionsError {
    fn from(e: SeriesError) -> Self {
        Self::Series(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the output.
    Io { source: io::Error },

    /// CSV serialisation error.
    Csv { source: csv::Error },

    /// JSON serialisation error.
    Json { source: serde_json::Error },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { source } => write!(f, "Export I/O error: {source}"),
            Self::Csv { source } => write!(f, "CSV export error: {source}"),
            Self::Json { source } => write!(f, "JSON export error: {source}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source } => Some(source),
            Self::Csv { source } => Some(source),
            Self::Json { source } => Some(source),
        }
    }
}

impl From<ExportError> for LogSectionsError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A series definition lacks a field it needs.
    MissingField {
        series: String,
        field: &'static str,
    },

    /// A configured regex is invalid. `context` names where it came from,
    /// e.g. `[series.cpu]` or `--replace`.
    InvalidRegex {
        context: String,
        pattern: String,
        source: regex::Error,
    },

    /// A configured regex exceeds the maximum allowed length.
    RegexTooLong {
        context: String,
        length: usize,
        max_length: usize,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::MissingField { series, field } => {
                write!(f, "[series.{series}] missing required field '{field}'")
            }
            Self::InvalidRegex {
                context,
                pattern,
                source,
            } => write!(f, "{context}: invalid regex '{pattern}': {source}"),
            Self::RegexTooLong {
                context,
                length,
                max_length,
            } => write!(
                f,
                "{context}: regex is {length} chars, exceeds maximum of {max_length}"
            ),
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogSectionsError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LogSections results.
pub type Result<T> = std::result::Result<T, LogSectionsError>;
