// LogSections - core/model.rs
//
// Core data model types: events, sealed sections, parse warnings.
// Pure data definitions with no I/O.
//
// The in-progress (partial) section form lives in `core::builder`; only the
// sealed, immutable form defined here leaves a parse.

use chrono::{NaiveTime, TimeDelta};
use serde::Serialize;
use std::fmt;

// =============================================================================
// Event
// =============================================================================

/// A single leaf log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    timestamp: NaiveTime,
    level: String,
    message: String,
    line_number: u64,
}

impl Event {
    pub fn new(timestamp: NaiveTime, level: String, message: String, line_number: u64) -> Self {
        Self {
            timestamp,
            level,
            message,
            line_number,
        }
    }

    /// Time of day the record was logged, microsecond resolution.
    pub fn timestamp(&self) -> NaiveTime {
        self.timestamp
    }

    /// Free-form severity/category label (e.g. `INFO`).
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Cleaned message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-based line number in the source.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

// =============================================================================
// Sealed section
// =============================================================================

/// A child of a sealed section, in document order.
///
/// Sections are not `Serialize`: a derived impl would recurse once per
/// nesting level. `core::export::export_tree_json` writes them iteratively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Section(Section),
    Event(Event),
}

/// A closed, validated section.
///
/// Every timing and line field is present. Built only by sealing a partial
/// tree (`core::builder::PartialTree::seal`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    start_line: u64,
    end_line: u64,
    children: Vec<Child>,
}

impl Section {
    pub(crate) fn new(
        name: String,
        start_time: NaiveTime,
        end_time: NaiveTime,
        start_line: u64,
        end_line: u64,
        children: Vec<Child>,
    ) -> Self {
        Self {
            name,
            start_time,
            end_time,
            start_line,
            end_line,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn start_line(&self) -> u64 {
        self.start_line
    }

    pub fn end_line(&self) -> u64 {
        self.end_line
    }

    /// Direct children in document order.
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Wall-clock time between the start and end markers.
    ///
    /// Timestamps carry no date, so a section spanning midnight yields a
    /// negative delta.
    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    pub fn duration_microseconds(&self) -> i64 {
        // Time-of-day deltas stay under one day and cannot overflow.
        self.duration().num_microseconds().unwrap_or_default()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_microseconds() as f64 / 1e6
    }

    /// Direct sub-sections, in document order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.children.iter().filter_map(|c| match c {
            Child::Section(s) => Some(s),
            Child::Event(_) => None,
        })
    }

    /// Direct events, in document order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.children.iter().filter_map(|c| match c {
            Child::Event(e) => Some(e),
            Child::Section(_) => None,
        })
    }

    /// Depth-first, pre-order walk over every descendant.
    ///
    /// Yields `(depth, child)` where direct children have depth 1. Uses an
    /// explicit stack, so nesting depth is bounded only by memory.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(1, self.children.iter())],
        }
    }

    /// First descendant section with the given name, in pre-order.
    pub fn find(&self, name: &str) -> Option<&Section> {
        self.walk().find_map(|(_, child)| match child {
            Child::Section(s) if s.name == name => Some(s),
            _ => None,
        })
    }
}

impl Drop for Section {
    // Flatten the subtree before it drops so deep nesting does not recurse.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(child) = pending.pop() {
            if let Child::Section(mut section) = child {
                pending.append(&mut section.children);
            }
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Section({}, {} -> {} ({}µs))",
            self.name,
            self.start_time.format("%H:%M:%S%.6f"),
            self.end_time.format("%H:%M:%S%.6f"),
            self.duration_microseconds()
        )
    }
}

/// Iterator returned by [`Section::walk`].
pub struct Walk<'a> {
    stack: Vec<(usize, std::slice::Iter<'a, Child>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Child);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, next) = {
                let (depth, iter) = self.stack.last_mut()?;
                (*depth, iter.next())
            };
            match next {
                Some(child) => {
                    if let Child::Section(section) = child {
                        self.stack.push((depth + 1, section.children.iter()));
                    }
                    return Some((depth, child));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

// =============================================================================
// Parse warnings and results
// =============================================================================

/// Recoverable problems found while building the section tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// An end marker whose name does not match the innermost open section.
    /// The line contributes no node to the tree.
    UnmatchedSectionEnd {
        line_number: u64,
        name: String,
        expected: String,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedSectionEnd {
                line_number,
                name,
                expected,
            } => write!(
                f,
                "line {line_number}: unmatched end of section '{name}' (innermost open section is '{expected}')"
            ),
        }
    }
}

/// Result of parsing one log source.
#[derive(Debug)]
pub struct ParsedLog {
    /// Sealed root section. `None` when the source held no timestamped line.
    pub root: Option<Section>,
    /// Non-fatal warnings, capped at the configured maximum.
    pub warnings: Vec<ParseWarning>,
    /// Warnings logged but not kept because the cap was reached.
    pub warnings_suppressed: usize,
    /// Total lines read from the source, matching or not.
    pub lines_read: u64,
}
