// LogSections - core/classifier.rs
//
// Stateless classification of one raw log line.
//
// Recognised shape: `[HH:MM:SS.ffffff] [LEVEL] message`. The message is
// stripped of leading `| ` continuation bars, optionally rewritten by a
// caller-supplied transform, then tested for section start/end markers.

use crate::util::constants;
use chrono::{NaiveTime, Timelike};
use regex::Regex;
use std::sync::OnceLock;

/// What a timestamped line's message turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `=== start <name> === {`
    SectionStart { name: String },
    /// `=== end <name> === }`
    SectionEnd { name: String },
    /// Anything else.
    Event { message: String },
}

/// A line that matched the timestamped record shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub timestamp: NaiveTime,
    pub level: String,
    pub kind: LineKind,
}

/// The time token of a record-shaped line could not be parsed.
#[derive(Debug)]
pub struct InvalidTimestamp {
    pub raw: String,
    pub source: chrono::ParseError,
}

/// Caller hook applied to each cleaned message before marker matching.
pub type MessageTransform<'a> = &'a dyn Fn(&str) -> String;

struct Patterns {
    record: Regex,
    continuation: Regex,
    section_start: Regex,
    section_end: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Literal patterns, covered by the unit tests below.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("classifier: invalid regex")
        }
        Patterns {
            record: re(r"^\[(.*?)\] \[(.*?)\]\s+(.*)"),
            continuation: re(r"^(?:\|\s*)+"),
            section_start: re(r"^===\s*start\s+(.+?)\s*===\s*\{"),
            section_end: re(r"^===\s+end\s+(.+?)\s*===\s*\}"),
        }
    })
}

/// Classify one raw line.
///
/// Returns `Ok(None)` for lines without the `[time] [level] message` shape;
/// those are noise and carry no state. A record-shaped line whose time token
/// does not parse is an error: the source cannot be trusted further.
pub fn classify(
    raw_line: &str,
    transform: Option<MessageTransform<'_>>,
) -> Result<Option<ClassifiedLine>, InvalidTimestamp> {
    let p = patterns();

    let caps = match p.record.captures(raw_line.trim()) {
        Some(caps) => caps,
        None => return Ok(None),
    };
    let (raw_ts, level, raw_message) = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(ts), Some(level), Some(msg)) => (ts.as_str(), level.as_str(), msg.as_str()),
        _ => return Ok(None),
    };

    let timestamp = parse_time_of_day(raw_ts)?;

    let cleaned = strip_continuation_bars(raw_message);
    let message = match transform {
        Some(f) => f(cleaned),
        None => cleaned.to_string(),
    };

    Ok(Some(ClassifiedLine {
        timestamp,
        level: level.to_string(),
        kind: classify_message(message),
    }))
}

/// Remove every leading `|` continuation bar (and the whitespace after it).
pub fn strip_continuation_bars(message: &str) -> &str {
    match patterns().continuation.find(message) {
        Some(m) => &message[m.end()..],
        None => message,
    }
}

/// Start markers win over end markers; everything else is an event.
fn classify_message(message: String) -> LineKind {
    let p = patterns();
    if let Some(name) = p.section_start.captures(&message).and_then(|c| c.get(1)) {
        return LineKind::SectionStart {
            name: name.as_str().to_string(),
        };
    }
    if let Some(name) = p.section_end.captures(&message).and_then(|c| c.get(1)) {
        return LineKind::SectionEnd {
            name: name.as_str().to_string(),
        };
    }
    LineKind::Event { message }
}

/// Parse `HH:MM:SS.ffffff` into a time of day truncated to microseconds.
///
/// Any number of fractional digits is accepted.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, InvalidTimestamp> {
    let time = NaiveTime::parse_from_str(raw, constants::TIME_OF_DAY_FORMAT).map_err(|source| {
        InvalidTimestamp {
            raw: raw.to_string(),
            source,
        }
    })?;
    let resolution = constants::TIMESTAMP_RESOLUTION_NANOS;
    let truncated = time.nanosecond() / resolution * resolution;
    Ok(time.with_nanosecond(truncated).unwrap_or(time))
}

// =============================================================================
// Regex rewrites
// =============================================================================

/// An ordered list of `regex -> replacement` rewrites, usable as a
/// [`MessageTransform`] through [`RegexRewrite::apply`].
#[derive(Debug, Clone, Default)]
pub struct RegexRewrite {
    rules: Vec<(Regex, String)>,
}

impl RegexRewrite {
    pub fn new(rules: Vec<(Regex, String)>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order, each to the previous rule's output.
    /// Replacements may reference capture groups (`$1`, `${name}`).
    pub fn apply(&self, message: &str) -> String {
        let mut out = message.to_string();
        for (re, replacement) in &self.rules {
            out = re.replace_all(&out, replacement.as_str()).into_owned();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(line: &str) -> LineKind {
        classify(line, None)
            .expect("timestamp should parse")
            .expect("line should match")
            .kind
    }

    #[test]
    fn test_noise_lines_do_not_match() {
        assert!(classify("", None).unwrap().is_none());
        assert!(classify("plain text without brackets", None).unwrap().is_none());
        assert!(classify("[00:00:01.000000] missing level", None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_plain_event_fields() {
        let line = classify("[00:00:00.500000] [INFO] hello", None)
            .unwrap()
            .unwrap();
        assert_eq!(line.level, "INFO");
        assert_eq!(
            line.timestamp,
            NaiveTime::from_hms_micro_opt(0, 0, 0, 500_000).unwrap()
        );
        assert_eq!(
            line.kind,
            LineKind::Event {
                message: "hello".into()
            }
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(
            kind("   [00:00:00.000001] [DEBUG]   spaced out   \n"),
            LineKind::Event {
                message: "spaced out".into()
            }
        );
    }

    #[test]
    fn test_section_markers() {
        assert_eq!(
            kind("[00:00:00.000000] [INFO] === start A === {"),
            LineKind::SectionStart { name: "A".into() }
        );
        assert_eq!(
            kind("[00:00:01.000000] [INFO] === end A === }"),
            LineKind::SectionEnd { name: "A".into() }
        );
    }

    #[test]
    fn test_marker_whitespace_tolerance() {
        assert_eq!(
            kind("[00:00:00.0] [I] ===start   load config   ===   {"),
            LineKind::SectionStart {
                name: "load config".into()
            }
        );
        assert_eq!(
            kind("[00:00:00.0] [I] ===   end load config===}"),
            LineKind::SectionEnd {
                name: "load config".into()
            }
        );
    }

    #[test]
    fn test_end_marker_requires_space_after_equals() {
        // The end pattern needs at least one space before `end`.
        assert_eq!(
            kind("[00:00:00.0] [I] ===end A === }"),
            LineKind::Event {
                message: "===end A === }".into()
            }
        );
    }

    #[test]
    fn test_marker_without_brace_is_an_event() {
        assert_eq!(
            kind("[00:00:00.0] [I] === start A ==="),
            LineKind::Event {
                message: "=== start A ===".into()
            }
        );
    }

    #[test]
    fn test_continuation_bars_are_stripped() {
        assert_eq!(strip_continuation_bars("| | actual text"), "actual text");
        assert_eq!(strip_continuation_bars("||actual"), "actual");
        assert_eq!(strip_continuation_bars("no bars | here"), "no bars | here");
        assert_eq!(
            kind("[00:00:00.0] [INFO] | | actual text"),
            LineKind::Event {
                message: "actual text".into()
            }
        );
        assert_eq!(
            kind("[00:00:00.0] [INFO] | | === start Nested === {"),
            LineKind::SectionStart {
                name: "Nested".into()
            }
        );
    }

    #[test]
    fn test_transform_runs_before_marker_matching() {
        let to_marker: MessageTransform<'_> =
            &|msg: &str| msg.replace("BEGIN", "=== start").replace(" {{", " === {");
        let line = classify("[00:00:00.0] [INFO] | BEGIN Job {{", Some(to_marker))
            .unwrap()
            .unwrap();
        assert_eq!(line.kind, LineKind::SectionStart { name: "Job".into() });
    }

    #[test]
    fn test_long_fraction_truncates_to_microseconds() {
        let ts = parse_time_of_day("01:02:03.123456789").unwrap();
        assert_eq!(ts, NaiveTime::from_hms_micro_opt(1, 2, 3, 123_456).unwrap());
        let short = parse_time_of_day("01:02:03.5").unwrap();
        assert_eq!(short, NaiveTime::from_hms_micro_opt(1, 2, 3, 500_000).unwrap());
    }

    #[test]
    fn test_fractionless_time_token_is_accepted() {
        let ts = parse_time_of_day("12:00:00").unwrap();
        assert_eq!(ts, NaiveTime::from_hms_opt(12, 0, 0).unwrap());

        let line = classify("[12:00:00] [INFO] no fraction", None)
            .unwrap()
            .unwrap();
        assert_eq!(line.timestamp, ts);
        assert_eq!(
            line.kind,
            LineKind::Event {
                message: "no fraction".into()
            }
        );
    }

    #[test]
    fn test_malformed_timestamp_is_an_error() {
        let err = classify("[not a time] [INFO] hello", None).unwrap_err();
        assert_eq!(err.raw, "not a time");
        assert!(classify("[25:00:00.000000] [INFO] hello", None).is_err());
    }

    #[test]
    fn test_regex_rewrite_applies_rules_in_order() {
        let rewrite = RegexRewrite::new(vec![
            (Regex::new(r"\d+").unwrap(), "N".to_string()),
            (Regex::new(r"id=N").unwrap(), "id=<redacted>".to_string()),
        ]);
        assert_eq!(rewrite.apply("id=42 took 7ms"), "id=<redacted> took Nms");
        assert!(RegexRewrite::default().is_empty());
    }
}
