// LogSections - core/series.rs
//
// Regex-driven numeric series extraction for charting.
//
// Independent of the section tree: lines are re-scanned with each rule's
// regex and every hit becomes a `(seconds since first timestamp, value)`
// point. Rendering is left to whoever consumes the series.

use crate::core::lines::LossyLines;
use crate::util::constants;
use crate::util::error::SeriesError;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::OnceLock;

/// One named extraction rule.
///
/// - regex with a capture group: group 1 is parsed as the value.
/// - regex without capture groups: each match records `const_value`.
/// - `const_value` alone (or alongside a regex that has not matched yet):
///   seeds the series with a first point at the first timestamped line.
#[derive(Debug, Clone)]
pub struct SeriesRule {
    pub name: String,
    pub regex: Option<Regex>,
    pub const_value: Option<f64>,
}

/// Extracted points, in line order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl Series {
    fn push(&mut self, time: f64, value: f64) {
        self.times.push(time);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time of the last point, if any.
    pub fn last_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[(\d\d):(\d\d):(\d\d)(\.\d+)\]").expect("series: invalid regex")
    })
}

/// Seconds since midnight of the first `[HH:MM:SS.fff]` token in `line`.
///
/// Purely numeric: out-of-range fields such as `99` minutes are accepted.
pub fn line_seconds(line: &str) -> Option<f64> {
    let caps = timestamp_pattern().captures(line)?;
    let field = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or_default()
    };
    Some(field(1) * 3600.0 + field(2) * 60.0 + field(3) + field(4))
}

/// Run every rule over every timestamped line of `reader`.
///
/// The returned map has one entry per rule, empty when nothing matched.
pub fn extract_series<R: BufRead>(
    reader: R,
    rules: &[SeriesRule],
) -> Result<BTreeMap<String, Series>, SeriesError> {
    // Indexed by rule position; keyed by name once the scan is done.
    let mut results: Vec<Series> = vec![Series::default(); rules.len()];
    let mut first_ts: Option<f64> = None;
    let mut line_number: u64 = 0;

    for line in LossyLines::new(reader) {
        let line = line.map_err(|source| SeriesError::Io {
            line_number,
            source,
        })?;
        line_number += 1;

        let Some(ts) = line_seconds(&line) else {
            continue;
        };
        let origin = *first_ts.get_or_insert(ts);
        let rel_time = ts - origin;

        for (rule, series) in rules.iter().zip(results.iter_mut()) {
            let caps = rule.regex.as_ref().and_then(|re| re.captures(&line));
            match caps {
                Some(caps) => match caps.get(1) {
                    Some(raw) => {
                        let value = raw.as_str().trim().parse::<f64>().map_err(|_| {
                            SeriesError::InvalidValue {
                                rule: rule.name.clone(),
                                line_number,
                                raw_value: raw.as_str().to_string(),
                            }
                        })?;
                        series.push(rel_time, value);
                    }
                    None => match rule.const_value {
                        Some(value) => series.push(rel_time, value),
                        None => tracing::trace!(
                            rule = %rule.name,
                            line_number,
                            "Match without capture group or constant; ignored"
                        ),
                    },
                },
                None => {
                    if let (Some(value), true) = (rule.const_value, series.is_empty()) {
                        series.push(rel_time, value);
                    }
                }
            }
        }
    }

    tracing::debug!(
        lines = line_number,
        rules = rules.len(),
        points = results.iter().map(Series::len).sum::<usize>(),
        "Series extraction complete"
    );

    Ok(rules
        .iter()
        .map(|r| r.name.clone())
        .zip(results)
        .collect())
}

/// A constant signal sampled at `frequency_hz` over `[0, span_secs]`.
///
/// Produces `floor(span_secs * frequency_hz) + 1` evenly spaced points, the
/// last one exactly at `span_secs`. A non-positive span is replaced by the
/// default span. The point count is capped; `name` identifies the series in
/// the warning logged when that happens.
pub fn frequency_series(name: &str, frequency_hz: f64, value: f64, span_secs: f64) -> Series {
    let span = if span_secs > 0.0 {
        span_secs
    } else {
        constants::DEFAULT_SERIES_SPAN_SECS
    };
    let (count, capped) = frequency_point_count(frequency_hz, span);
    if capped {
        tracing::warn!(
            series = name,
            frequency_hz,
            span_secs = span,
            points = count,
            effective_hz = (count - 1) as f64 / span,
            "Frequency series capped; sampling is coarser than configured"
        );
    }

    let mut series = Series::default();
    for i in 0..count {
        let time = if count == 1 {
            0.0
        } else {
            span * i as f64 / (count - 1) as f64
        };
        series.push(time, value);
    }
    series
}

/// Number of points for `span` seconds at `frequency_hz`, and whether the
/// cap reduced it.
fn frequency_point_count(frequency_hz: f64, span: f64) -> (usize, bool) {
    let intervals = (span * frequency_hz).floor();
    if !(intervals.is_finite() && intervals >= 0.0) {
        return (1, false);
    }
    let wanted = (intervals as usize).saturating_add(1);
    if wanted > constants::MAX_FREQUENCY_POINTS {
        (constants::MAX_FREQUENCY_POINTS, true)
    } else {
        (wanted, false)
    }
}
