// LogSections - core/parser.rs
//
// Single-pass conversion of a log line stream into a sealed section tree.
// Core layer: accepts BufRead trait objects, never touches the filesystem.

use crate::core::builder::SectionBuilder;
use crate::core::classifier::{self, MessageTransform};
use crate::core::lines::LossyLines;
use crate::core::model::ParsedLog;
use crate::util::constants;
use crate::util::error::{LogSectionsError, ParseError};
use std::io::BufRead;

/// Configuration for parsing operations.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Cap on collected warnings. Further warnings are logged and counted.
    pub max_warnings: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_warnings: constants::DEFAULT_MAX_WARNINGS,
        }
    }
}

/// Parse every line of `reader` into a sealed section tree.
///
/// Fatal: a malformed timestamp on a record-shaped line, a read error, or
/// sections still open at end of input. Unmatched end markers are warnings.
pub fn parse_reader<R: BufRead>(
    reader: R,
    config: &ParseConfig,
    transform: Option<MessageTransform<'_>>,
) -> Result<ParsedLog, LogSectionsError> {
    let mut builder = SectionBuilder::new(config.max_warnings);
    let mut line_number: u64 = 0;

    for line in LossyLines::new(reader) {
        let line = line.map_err(|source| ParseError::Io {
            line_number,
            source,
        })?;
        line_number += 1;

        let classified =
            classifier::classify(&line, transform).map_err(|e| ParseError::Timestamp {
                line_number,
                raw_timestamp: e.raw,
                source: e.source,
            })?;

        match classified {
            Some(classified) => builder.push(line_number, classified),
            None => {
                tracing::trace!(
                    line_number,
                    preview = %preview(&line),
                    "Skipping line without timestamp"
                );
            }
        }
    }

    let output = builder.finish(line_number);
    let sections = output.tree.len() - 1;
    let root = output.tree.seal()?;

    tracing::debug!(
        lines = line_number,
        sections,
        warnings = output.warnings.len() + output.warnings_suppressed,
        "Parsing complete"
    );

    Ok(ParsedLog {
        root,
        warnings: output.warnings,
        warnings_suppressed: output.warnings_suppressed,
        lines_read: line_number,
    })
}

/// Parse an in-memory string. Convenience wrapper over [`parse_reader`].
pub fn parse_str(
    content: &str,
    config: &ParseConfig,
    transform: Option<MessageTransform<'_>>,
) -> Result<ParsedLog, LogSectionsError> {
    parse_reader(content.as_bytes(), config, transform)
}

/// Bounded prefix of a line for debug output.
fn preview(line: &str) -> &str {
    match line.char_indices().nth(constants::DEBUG_MAX_LINE_PREVIEW) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
