// LogSections - core/builder.rs
//
// Open-section stack machine and the partial -> sealed tree transform.
//
// Partial sections live in an arena indexed by `SectionId`. A section is
// always allocated after its parent, so every child id is greater than its
// parent's id; sealing relies on that to run post-order without recursion.

use crate::core::classifier::{ClassifiedLine, LineKind};
use crate::core::model::{Child, Event, ParseWarning, Section};
use crate::util::constants;
use crate::util::error::{SealError, UnclosedSection};
use chrono::NaiveTime;

/// Index of a partial section in the builder arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId(usize);

const ROOT: SectionId = SectionId(0);

/// Child slot of a partial section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialChild {
    Section(SectionId),
    Event(Event),
}

/// A section still being built. Closed once `end_time` and `end_line` are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSection {
    pub name: String,
    pub start_time: Option<NaiveTime>,
    pub start_line: Option<u64>,
    pub end_time: Option<NaiveTime>,
    pub end_line: Option<u64>,
    pub children: Vec<PartialChild>,
}

impl PartialSection {
    fn open(name: String, start_time: Option<NaiveTime>, start_line: Option<u64>) -> Self {
        Self {
            name,
            start_time,
            start_line,
            end_time: None,
            end_line: None,
            children: Vec::new(),
        }
    }

    fn close(&mut self, end_time: NaiveTime, end_line: u64) {
        self.end_time = Some(end_time);
        self.end_line = Some(end_line);
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some() && self.end_line.is_some()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Consumes classified lines in document order and tracks the open-section
/// stack. The stack is never empty: its bottom is the synthesized root.
#[derive(Debug)]
pub struct SectionBuilder {
    arena: Vec<PartialSection>,
    stack: Vec<SectionId>,
    first_timestamp: Option<NaiveTime>,
    last_timestamp: Option<NaiveTime>,
    warnings: Vec<ParseWarning>,
    warnings_suppressed: usize,
    max_warnings: usize,
}

/// Everything a finished build produced.
#[derive(Debug)]
pub struct BuildOutput {
    pub tree: PartialTree,
    pub warnings: Vec<ParseWarning>,
    pub warnings_suppressed: usize,
}

impl SectionBuilder {
    pub fn new(max_warnings: usize) -> Self {
        Self {
            arena: vec![PartialSection::open(
                constants::ROOT_SECTION_NAME.to_string(),
                None,
                None,
            )],
            stack: vec![ROOT],
            first_timestamp: None,
            last_timestamp: None,
            warnings: Vec::new(),
            warnings_suppressed: 0,
            max_warnings,
        }
    }

    /// Innermost open section.
    fn current(&self) -> SectionId {
        self.stack.last().copied().unwrap_or(ROOT)
    }

    /// Number of sections currently open, not counting the root.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Feed one timestamped line. `line_number` is 1-based and counts every
    /// source line, matching or not.
    pub fn push(&mut self, line_number: u64, line: ClassifiedLine) {
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(line.timestamp);
        }
        self.last_timestamp = Some(line.timestamp);

        let current = self.current();
        match line.kind {
            LineKind::SectionStart { name } => {
                let id = SectionId(self.arena.len());
                self.arena.push(PartialSection::open(
                    name,
                    Some(line.timestamp),
                    Some(line_number),
                ));
                self.arena[current.0].children.push(PartialChild::Section(id));
                self.stack.push(id);
            }
            LineKind::SectionEnd { name } => {
                let open = &mut self.arena[current.0];
                if current != ROOT && open.name == name {
                    open.close(line.timestamp, line_number);
                    self.stack.pop();
                } else {
                    let expected = open.name.clone();
                    self.warn(ParseWarning::UnmatchedSectionEnd {
                        line_number,
                        name,
                        expected,
                    });
                }
            }
            LineKind::Event { message } => {
                self.arena[current.0]
                    .children
                    .push(PartialChild::Event(Event::new(
                        line.timestamp,
                        line.level,
                        message,
                        line_number,
                    )));
            }
        }
    }

    fn warn(&mut self, warning: ParseWarning) {
        tracing::warn!(%warning, "Malformed section nesting");
        if self.warnings.len() < self.max_warnings {
            self.warnings.push(warning);
        } else {
            self.warnings_suppressed += 1;
        }
    }

    /// End of input. `total_lines` is the number of lines in the source.
    ///
    /// When at least one timestamped line was seen the root is closed over
    /// lines `1..=total_lines` and the first..last timestamps. Sections still
    /// open stay open; sealing reports them.
    pub fn finish(mut self, total_lines: u64) -> BuildOutput {
        if let (Some(first), Some(last)) = (self.first_timestamp, self.last_timestamp) {
            let root = &mut self.arena[ROOT.0];
            root.start_time = Some(first);
            root.start_line = Some(1);
            root.close(last, total_lines);
        }
        if self.depth() > 0 {
            tracing::debug!(open = self.depth(), "Input ended with sections still open");
        }
        BuildOutput {
            tree: PartialTree { arena: self.arena },
            warnings: self.warnings,
            warnings_suppressed: self.warnings_suppressed,
        }
    }
}

// =============================================================================
// Partial tree and sealing
// =============================================================================

/// The in-progress tree left by a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialTree {
    arena: Vec<PartialSection>,
}

impl PartialTree {
    pub fn root(&self) -> &PartialSection {
        &self.arena[ROOT.0]
    }

    pub fn get(&self, id: SectionId) -> Option<&PartialSection> {
        self.arena.get(id.0)
    }

    /// Number of sections, the root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().start_time.is_none()
    }

    /// Convert to the immutable sealed form.
    ///
    /// Returns `Ok(None)` when no timestamped line was ever seen. Fails with
    /// every section that lacks a start or end, in document order; no part
    /// of the tree is returned then. Leaves `self` untouched, so repeated
    /// calls produce equal trees.
    pub fn seal(&self) -> Result<Option<Section>, SealError> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut sealed: Vec<Option<Section>> = Vec::with_capacity(self.arena.len());
        sealed.resize_with(self.arena.len(), || None);
        let mut unclosed = Vec::new();

        // Children have larger ids than parents: reverse id order is post-order.
        for (idx, partial) in self.arena.iter().enumerate().rev() {
            let (start_time, start_line, end_time, end_line) = match (
                partial.start_time,
                partial.start_line,
                partial.end_time,
                partial.end_line,
            ) {
                (Some(st), Some(sl), Some(et), Some(el)) => (st, sl, et, el),
                _ => {
                    unclosed.push(UnclosedSection {
                        name: partial.name.clone(),
                        start_line: partial.start_line.unwrap_or_default(),
                    });
                    continue;
                }
            };
            if !unclosed.is_empty() {
                // The seal already failed; keep scanning only to name the rest.
                continue;
            }

            let mut children = Vec::with_capacity(partial.children.len());
            for child in &partial.children {
                match child {
                    PartialChild::Event(event) => children.push(Child::Event(event.clone())),
                    PartialChild::Section(id) => {
                        if let Some(section) = sealed[id.0].take() {
                            children.push(Child::Section(section));
                        }
                    }
                }
            }
            sealed[idx] = Some(Section::new(
                partial.name.clone(),
                start_time,
                end_time,
                start_line,
                end_line,
                children,
            ));
        }

        if !unclosed.is_empty() {
            unclosed.reverse();
            return Err(SealError::UnclosedSections { sections: unclosed });
        }
        Ok(sealed[ROOT.0].take())
    }
}
