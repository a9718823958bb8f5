// LogSections - core/export.rs
//
// Text, CSV and JSON output of sealed section trees and extracted series.
// Core layer: writes to any Write trait object.

use crate::core::model::{Child, Event, Section};
use crate::core::series::Series;
use crate::util::error::ExportError;
use chrono::NaiveTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};

const TIME_FORMAT: &str = "%H:%M:%S%.6f";

/// Object header of a section: every field except `children`.
#[derive(Serialize)]
struct SectionHead<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    start_time: NaiveTime,
    end_time: NaiveTime,
    start_line: u64,
    end_line: u64,
    duration_us: i64,
}

#[derive(Serialize)]
struct TaggedEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    event: &'a Event,
}

/// Export the whole tree as compact JSON.
///
/// Written with an explicit stack so nesting depth is bounded by memory,
/// not by the call stack. Every node carries a `"type"` of `"section"` or
/// `"event"`; sections list their nodes under `"children"`.
pub fn export_tree_json<W: Write>(root: &Section, writer: W) -> Result<(), ExportError> {
    let mut out = BufWriter::new(writer);
    let mut head = Vec::new();

    write_section_open(&mut out, &mut head, root)?;
    let mut stack = vec![root.children().iter().enumerate()];
    while let Some(children) = stack.last_mut() {
        match children.next() {
            Some((idx, child)) => {
                if idx > 0 {
                    out.write_all(b",").map_err(io_err)?;
                }
                match child {
                    Child::Section(s) => {
                        write_section_open(&mut out, &mut head, s)?;
                        stack.push(s.children().iter().enumerate());
                    }
                    Child::Event(e) => {
                        let tagged = TaggedEvent {
                            kind: "event",
                            event: e,
                        };
                        serde_json::to_writer(&mut out, &tagged).map_err(json_err)?;
                    }
                }
            }
            None => {
                stack.pop();
                out.write_all(b"]}").map_err(io_err)?;
            }
        }
    }

    out.flush().map_err(io_err)
}

/// Write `{...,"children":[` for one section. `head` is scratch space.
fn write_section_open<W: Write>(
    out: &mut W,
    head: &mut Vec<u8>,
    section: &Section,
) -> Result<(), ExportError> {
    head.clear();
    let fields = SectionHead {
        kind: "section",
        name: section.name(),
        start_time: section.start_time(),
        end_time: section.end_time(),
        start_line: section.start_line(),
        end_line: section.end_line(),
        duration_us: section.duration_microseconds(),
    };
    serde_json::to_writer(&mut *head, &fields).map_err(json_err)?;
    // Reopen the object to append the children array.
    head.pop();
    head.extend_from_slice(b",\"children\":[");
    out.write_all(head).map_err(io_err)
}

fn io_err(e: std::io::Error) -> ExportError {
    ExportError::Io { source: e }
}

fn json_err(e: serde_json::Error) -> ExportError {
    ExportError::Json { source: e }
}

/// Export one CSV row per section, root first, in pre-order.
///
/// Writes: depth, name, start_time, end_time, start_line, end_line, duration_us
pub fn export_sections_csv<W: Write>(root: &Section, writer: W) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record([
            "depth",
            "name",
            "start_time",
            "end_time",
            "start_line",
            "end_line",
            "duration_us",
        ])
        .map_err(|e| ExportError::Csv { source: e })?;

    let sections = std::iter::once((0, root)).chain(root.walk().filter_map(|(depth, child)| {
        match child {
            Child::Section(s) => Some((depth, s)),
            Child::Event(_) => None,
        }
    }));

    let mut count = 0;
    for (depth, section) in sections {
        let depth = depth.to_string();
        let start = section.start_time().format(TIME_FORMAT).to_string();
        let end = section.end_time().format(TIME_FORMAT).to_string();
        let start_line = section.start_line().to_string();
        let end_line = section.end_line().to_string();
        let duration = section.duration_microseconds().to_string();
        csv_writer
            .write_record([
                depth.as_str(),
                section.name(),
                start.as_str(),
                end.as_str(),
                start_line.as_str(),
                end_line.as_str(),
                duration.as_str(),
            ])
            .map_err(|e| ExportError::Csv { source: e })?;
        count += 1;
    }

    csv_writer
        .flush()
        .map_err(|e| ExportError::Io { source: e })?;

    Ok(count)
}

/// Export series in long format: one `series,time_s,value` row per point.
pub fn export_series_csv<W: Write>(
    series: &BTreeMap<String, Series>,
    writer: W,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(["series", "time_s", "value"])
        .map_err(|e| ExportError::Csv { source: e })?;

    let mut count = 0;
    for (name, points) in series {
        for (time, value) in points.points() {
            let time = time.to_string();
            let value = value.to_string();
            csv_writer
                .write_record([name.as_str(), time.as_str(), value.as_str()])
                .map_err(|e| ExportError::Csv { source: e })?;
            count += 1;
        }
    }

    csv_writer
        .flush()
        .map_err(|e| ExportError::Io { source: e })?;
    Ok(count)
}

/// Write an indented outline of the tree, one line per node.
///
/// Sections show their time span and duration; events are included only
/// when `include_events` is set. Returns the number of lines written.
pub fn render_tree<W: Write>(
    root: &Section,
    include_events: bool,
    writer: W,
) -> Result<usize, ExportError> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "{}", section_line(root)).map_err(io_err)?;
    let mut count = 1;
    for (depth, child) in root.walk() {
        match child {
            Child::Section(s) => {
                write_indent(&mut out, depth)?;
                writeln!(out, "{}", section_line(s)).map_err(io_err)?;
            }
            Child::Event(e) if include_events => {
                write_indent(&mut out, depth)?;
                writeln!(
                    out,
                    "{} [{}] {}",
                    e.timestamp().format(TIME_FORMAT),
                    e.level(),
                    e.message()
                )
                .map_err(io_err)?;
            }
            Child::Event(_) => continue,
        }
        count += 1;
    }
    out.flush().map_err(io_err)?;
    Ok(count)
}

fn write_indent<W: Write>(out: &mut W, depth: usize) -> Result<(), ExportError> {
    const SPACES: &[u8] = b"                                ";
    let mut remaining = depth * 2;
    while remaining > 0 {
        let n = remaining.min(SPACES.len());
        out.write_all(&SPACES[..n]).map_err(io_err)?;
        remaining -= n;
    }
    Ok(())
}

/// Write one summary line per series: point count, last time and colour.
pub fn write_series_summary<W: Write>(
    series: &BTreeMap<String, Series>,
    colors: &BTreeMap<&str, &str>,
    writer: W,
) -> Result<usize, ExportError> {
    let mut out = BufWriter::new(writer);
    for (name, s) in series {
        write!(
            out,
            "{name}: {} points, last at {:.3}s",
            s.len(),
            s.last_time().unwrap_or_default()
        )
        .map_err(io_err)?;
        let end = match colors.get(name.as_str()) {
            Some(color) => writeln!(out, ", color {color}"),
            None => writeln!(out),
        };
        end.map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    Ok(series.len())
}

fn section_line(s: &Section) -> String {
    format!(
        "{} {} -> {} ({:.6}s, lines {}-{})",
        s.name(),
        s.start_time().format(TIME_FORMAT),
        s.end_time().format(TIME_FORMAT),
        s.duration_seconds(),
        s.start_line(),
        s.end_line()
    )
}
