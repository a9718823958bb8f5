// LogSections - app/pipeline.rs
//
// File-level orchestration: opens inputs through the platform layer and
// feeds them to the core parser and series extractor.

use crate::core::classifier::{MessageTransform, RegexRewrite};
use crate::core::model::ParsedLog;
use crate::core::parser::{self, ParseConfig};
use crate::core::series::{self, Series, SeriesRule};
use crate::platform::config::{self, AppConfig, SeriesConfig};
use crate::platform::fs;
use crate::util::error::{ConfigError, LogSectionsError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Parse one log file into a sealed section tree.
pub fn parse_file(
    path: &Path,
    config: &ParseConfig,
    transform: Option<MessageTransform<'_>>,
) -> Result<ParsedLog, LogSectionsError> {
    let started = Instant::now();
    let reader = fs::open_log(path)?;
    let parsed = parser::parse_reader(reader, config, transform)?;

    for warning in &parsed.warnings {
        tracing::debug!(path = %path.display(), %warning, "Parse warning");
    }
    tracing::info!(
        path = %path.display(),
        lines = parsed.lines_read,
        warnings = parsed.warnings.len() + parsed.warnings_suppressed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Parsed log file"
    );
    Ok(parsed)
}

/// Combine config `[[rewrite]]` rules with `PATTERN=REPLACEMENT` pairs from
/// the command line. Config rules run first.
///
/// The pair is split on the first `=`, so the pattern itself cannot
/// contain one.
pub fn build_rewrite(
    app_config: &AppConfig,
    replacements: &[String],
) -> Result<RegexRewrite, ConfigError> {
    let mut rules = app_config.rewrites.clone();
    for pair in replacements {
        let (pattern, replacement) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
        let re = config::compile_regex(pattern, "--replace")?;
        rules.push((re, replacement.to_string()));
    }
    Ok(RegexRewrite::new(rules))
}

/// Log-based rules grouped by the file they read, so each file is scanned
/// once.
pub fn rules_by_file(config: &SeriesConfig) -> BTreeMap<PathBuf, Vec<SeriesRule>> {
    let mut grouped: BTreeMap<PathBuf, Vec<SeriesRule>> = BTreeMap::new();
    for def in &config.log_series {
        grouped
            .entry(def.log_file.clone())
            .or_default()
            .push(SeriesRule {
                name: def.name.clone(),
                regex: def.regex.clone(),
                const_value: def.const_value,
            });
    }
    grouped
}

/// Extract every series a definition file names.
///
/// Frequency series span the longest time range observed in any log-based
/// series. Returns the series plus a warning for each one left empty.
pub fn extract_from_config(
    config: &SeriesConfig,
) -> Result<(BTreeMap<String, Series>, Vec<String>), LogSectionsError> {
    let mut all: BTreeMap<String, Series> = BTreeMap::new();

    for (path, rules) in rules_by_file(config) {
        let reader = fs::open_log(&path)?;
        let extracted = series::extract_series(reader, &rules)?;
        tracing::debug!(
            path = %path.display(),
            rules = rules.len(),
            "Series extracted from log file"
        );
        all.extend(extracted);
    }

    let max_time = all
        .values()
        .filter_map(Series::last_time)
        .fold(0.0_f64, f64::max);

    for def in &config.frequency_series {
        all.insert(
            def.name.clone(),
            series::frequency_series(&def.name, def.frequency_hz, def.value, max_time),
        );
    }

    let warnings: Vec<String> = all
        .iter()
        .filter(|(_, s)| s.is_empty())
        .map(|(name, _)| format!("Series '{name}' has no data points"))
        .collect();

    Ok((all, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::config::parse_series_config;
    use crate::util::error::SealError;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_file_builds_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "run.log",
            "[00:00:00.000000] [INFO] === start A === {\n\
             [00:00:00.500000] [INFO] hello\n\
             [00:00:01.000000] [INFO] === end A === }\n",
        );
        let parsed = parse_file(&path, &ParseConfig::default(), None).unwrap();
        let root = parsed.root.unwrap();
        assert_eq!(root.find("A").unwrap().duration_microseconds(), 1_000_000);
    }

    #[test]
    fn test_parse_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_file(&dir.path().join("nope.log"), &ParseConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, LogSectionsError::Io { .. }));
    }

    #[test]
    fn test_parse_file_reports_open_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "open.log",
            "[00:00:00.0] [INFO] === start Outer === {\n",
        );
        let err = parse_file(&path, &ParseConfig::default(), None).unwrap_err();
        match err {
            LogSectionsError::Seal(SealError::UnclosedSections { sections }) => {
                assert_eq!(sections[0].name, "Outer");
            }
            other => panic!("expected seal error, got {other:?}"),
        }
    }

    #[test]
    fn test_build_rewrite_orders_config_before_cli() {
        let app_config = AppConfig {
            rewrites: vec![(regex::Regex::new("a").unwrap(), "b".to_string())],
            ..AppConfig::default()
        };
        let rewrite = build_rewrite(&app_config, &["b=c".to_string()]).unwrap();
        assert_eq!(rewrite.apply("aaa"), "ccc");

        let err = build_rewrite(&AppConfig::default(), &["(=x".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { .. }));
    }

    #[test]
    fn test_rules_grouped_by_file() {
        let config = parse_series_config(
            "[series.a]\nlog_file = 'one.log'\nregex = 'a=(\\d+)'\n\
             [series.b]\nlog_file = 'one.log'\nregex = 'b=(\\d+)'\n\
             [series.c]\nlog_file = '/abs/two.log'\nconst_value = 3.0\n",
            Path::new("plot.toml"),
            Path::new("/logs"),
        )
        .unwrap();
        let grouped = rules_by_file(&config);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[Path::new("/logs/one.log")].len(), 2);
        assert_eq!(grouped[Path::new("/abs/two.log")][0].name, "c");
    }

    #[test]
    fn test_extract_from_config_spans_frequency_series() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "app.log",
            "[00:00:10.0] [INFO] cpu=1\n\
             [00:00:11.0] [INFO] cpu=2\n\
             [00:00:12.0] [INFO] cpu=3\n",
        );
        let config_path = write_file(
            dir.path(),
            "plot.toml",
            "[series.cpu]\nlog_file = 'app.log'\nregex = 'cpu=(\\d+)'\n\
             [series.mem]\nlog_file = 'app.log'\nregex = 'mem=(\\d+)'\n\
             [series.tick]\nfrequency_hz = 1.0\nconst_value = 0.5\n",
        );
        let config = config::load_series_config(&config_path).unwrap();
        let (series, warnings) = extract_from_config(&config).unwrap();

        assert_eq!(series["cpu"].values, vec![1.0, 2.0, 3.0]);
        assert_eq!(series["tick"].times, vec![0.0, 1.0, 2.0]);
        assert!(series["mem"].is_empty());
        assert_eq!(warnings, vec!["Series 'mem' has no data points".to_string()]);
    }
}
