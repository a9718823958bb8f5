// LogSections - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogSections";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogSections";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Section parsing
// =============================================================================

/// Name given to the synthesized top-level section of every parse.
pub const ROOT_SECTION_NAME: &str = "root";

/// Default maximum number of non-fatal warnings kept per parse.
///
/// Every warning is still logged; only the collected list is capped so a
/// badly broken file cannot grow it without bound.
pub const DEFAULT_MAX_WARNINGS: usize = 1_000;

/// Minimum user-configurable warning cap.
pub const MIN_MAX_WARNINGS: usize = 1;

/// Maximum user-configurable warning cap.
pub const ABSOLUTE_MAX_WARNINGS: usize = 100_000;

/// chrono format for the `[HH:MM:SS.ffffff]` time token.
/// `%.f` consumes the dot and any number of fractional digits.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S%.f";

/// Output precision of parsed timestamps, in nanoseconds per tick.
pub const TIMESTAMP_RESOLUTION_NANOS: u32 = 1_000;

// =============================================================================
// Series extraction
// =============================================================================

/// Time span assumed for synthetic frequency series when no log produced
/// a usable time range.
pub const DEFAULT_SERIES_SPAN_SECS: f64 = 1.0;

/// Upper bound on points generated for a single frequency series.
/// A misconfigured `frequency_hz` must not allocate unbounded memory.
pub const MAX_FREQUENCY_POINTS: usize = 10_000_000;

/// Maximum regex pattern length accepted from configuration.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
