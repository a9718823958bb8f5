// LogSections - tests/e2e_sections.rs
//
// End-to-end tests for section parsing and series extraction.
//
// These tests read real fixture files from disk through the platform layer
// and run the compiled binary for exit-code behaviour. No mocks.

use logsections::app::pipeline;
use logsections::core::export;
use logsections::core::model::{Child, ParseWarning};
use logsections::core::parser::ParseConfig;
use logsections::platform::config;
use logsections::util::error::{LogSectionsError, SealError};
use std::path::PathBuf;
use std::process::Command;

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn parse_fixture(name: &str) -> Result<logsections::core::model::ParsedLog, LogSectionsError> {
    pipeline::parse_file(&fixture(name), &ParseConfig::default(), None)
}

/// Run the binary with an empty config dir so user config cannot leak in.
fn run_cli(args: &[&str]) -> std::process::Output {
    let config_dir = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_logsections"))
        .arg("--config")
        .arg(config_dir.path())
        .args(args)
        .output()
        .expect("failed to run logsections binary")
}

// =============================================================================
// Section tree E2E
// =============================================================================

#[test]
fn e2e_nested_fixture_builds_expected_tree() {
    let parsed = parse_fixture("nested.log").unwrap();
    assert_eq!(parsed.lines_read, 11);
    assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);

    let root = parsed.root.unwrap();
    assert_eq!(root.name(), "root");
    assert_eq!((root.start_line(), root.end_line()), (1, 11));
    assert_eq!(root.duration_microseconds(), 5_000_000);

    let build = root.find("Build").unwrap();
    assert_eq!((build.start_line(), build.end_line()), (2, 9));
    assert_eq!(build.duration_microseconds(), 4_500_000);

    let names: Vec<_> = build.sections().map(|s| s.name().to_string()).collect();
    assert_eq!(names, vec!["Compile", "Test"]);

    let compile = build.find("Compile").unwrap();
    assert_eq!(compile.duration_microseconds(), 1_900_000);
    let event = compile.events().next().unwrap();
    assert_eq!(event.message(), "compiled 42 units");
    assert_eq!(event.level(), "DEBUG");
    assert_eq!(event.line_number(), 4);

    let test = build.find("Test").unwrap();
    assert_eq!(test.duration_microseconds(), 2_250_000);

    // The trailing event sits at the root, after the Build section.
    match root.children().last().unwrap() {
        Child::Event(e) => assert_eq!(e.message(), "done"),
        Child::Section(s) => panic!("expected trailing event, got section {s}"),
    }
}

#[test]
fn e2e_unmatched_end_markers_are_warnings() {
    let parsed = parse_fixture("unmatched.log").unwrap();
    assert_eq!(parsed.warnings.len(), 2);

    let lines: Vec<_> = parsed
        .warnings
        .iter()
        .map(|w| match w {
            ParseWarning::UnmatchedSectionEnd {
                line_number, name, ..
            } => (*line_number, name.clone()),
        })
        .collect();
    assert_eq!(lines, vec![(3, "Upload".to_string()), (5, "Deploy".to_string())]);

    let root = parsed.root.unwrap();
    let deploy = root.find("Deploy").unwrap();
    assert_eq!((deploy.start_line(), deploy.end_line()), (1, 4));
    assert_eq!(deploy.children().len(), 1);
}

#[test]
fn e2e_open_sections_at_eof_are_fatal() {
    let err = parse_fixture("open_at_eof.log").unwrap_err();
    match &err {
        LogSectionsError::Seal(SealError::UnclosedSections { sections }) => {
            let open: Vec<_> = sections
                .iter()
                .map(|s| (s.name.as_str(), s.start_line))
                .collect();
            assert_eq!(open, vec![("Outer", 1), ("Bar", 4)]);
        }
        other => panic!("expected unclosed sections, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("Outer") && message.contains("Bar"), "{message}");
}

#[test]
fn e2e_sections_csv_from_fixture() {
    let root = parse_fixture("nested.log").unwrap().root.unwrap();
    let mut buf = Vec::new();
    let rows = export::export_sections_csv(&root, &mut buf).unwrap();
    assert_eq!(rows, 4);

    let output = String::from_utf8(buf).unwrap();
    assert!(output.contains("2,Compile,08:00:00.100000,08:00:02.000000,3,5,1900000"));
}

// =============================================================================
// Series E2E
// =============================================================================

#[test]
fn e2e_series_fixture_extracts_all_kinds() {
    let series_config = config::load_series_config(&fixture("series.toml")).unwrap();
    assert_eq!(series_config.log_series.len(), 2);
    assert_eq!(series_config.log_series[0].log_file, fixture("metrics.log"));

    let (series, warnings) = pipeline::extract_from_config(&series_config).unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");

    assert_eq!(series["depth"].times, vec![0.5, 2.0]);
    assert_eq!(series["depth"].values, vec![3.0, 7.0]);

    assert_eq!(series["heartbeat"].times, vec![0.0, 1.0, 4.0]);
    assert!(series["heartbeat"].values.iter().all(|v| *v == 1.0));

    // 2 Hz over the 4 s observed in metrics.log.
    let sampler = &series["sampler"];
    assert_eq!(sampler.len(), 9);
    assert_eq!(sampler.last_time(), Some(4.0));
}

// =============================================================================
// CLI E2E
// =============================================================================

#[test]
fn e2e_cli_prints_tree() {
    let output = run_cli(&["sections", fixture("nested.log").to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("root 08:00:00.000000 -> 08:00:05.000000"));
    assert!(lines[1].starts_with("  Build "));
    assert!(lines[2].starts_with("    Compile "));
    assert!(lines[3].starts_with("    Test "));
}

#[test]
fn e2e_cli_replace_rewrites_markers() {
    let output = run_cli(&[
        "sections",
        fixture("nested.log").to_str().unwrap(),
        "--format",
        "json",
        "--replace",
        "Compile=Build step",
    ]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let build = &value["children"][0];
    assert_eq!(build["name"], "Build");
    assert_eq!(build["children"][0]["name"], "Build step");
}

#[test]
fn e2e_cli_exits_nonzero_on_open_sections() {
    let output = run_cli(&["sections", fixture("open_at_eof.log").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Outer"), "{stderr}");
}

#[test]
fn e2e_cli_missing_file_exits_nonzero() {
    let output = run_cli(&["sections", "/definitely/not/here.log"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn e2e_cli_series_summary_shows_colour() {
    let output = run_cli(&[
        "series",
        fixture("series.toml").to_str().unwrap(),
        "--format",
        "summary",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "depth: 2 points, last at 2.000s, color blue",
            "heartbeat: 3 points, last at 4.000s",
            "sampler: 9 points, last at 4.000s",
        ]
    );
}

#[test]
fn e2e_cr_only_log_numbers_lines_like_lf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cr.log");
    std::fs::write(
        &path,
        "[00:00:00.0] [INFO] === start A === {\r\
         noise\r\
         [00:00:01.0] [INFO] === end A === }\r",
    )
    .unwrap();

    let parsed = pipeline::parse_file(&path, &ParseConfig::default(), None).unwrap();
    assert_eq!(parsed.lines_read, 3);
    let root = parsed.root.unwrap();
    let a = root.find("A").unwrap();
    assert_eq!((a.start_line(), a.end_line()), (1, 3));
}
