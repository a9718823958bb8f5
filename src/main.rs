// LogSections - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading and logging initialisation (debug mode support)
// 3. Dispatch to the `sections` and `series` commands

use clap::{Parser, Subcommand, ValueEnum};
use logsections::app::pipeline;
use logsections::core::export;
use logsections::core::parser::ParseConfig;
use logsections::platform::config::{self, PlatformPaths};
use logsections::util::{self, error::LogSectionsError};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "logsections", version, about)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Directory holding config.toml (defaults to the platform config dir).
    #[arg(short = 'c', long = "config", global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a log into its nested section tree.
    Sections {
        log: PathBuf,

        #[arg(short = 'f', long = "format", value_enum, default_value_t = SectionsFormat::Tree)]
        format: SectionsFormat,

        /// Regex rewrite applied to each message, as PATTERN=REPLACEMENT.
        #[arg(short = 'r', long = "replace")]
        replace: Vec<String>,

        /// Include events in the tree outline.
        #[arg(short = 'e', long = "events")]
        events: bool,
    },
    /// Extract numeric series described by a series definition file.
    Series {
        definitions: PathBuf,

        #[arg(short = 'f', long = "format", value_enum, default_value_t = SeriesFormat::Csv)]
        format: SeriesFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SectionsFormat {
    Tree,
    Json,
    Csv,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SeriesFormat {
    Csv,
    Summary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_dir);
    let (app_config, config_warnings) = config::load_config(&config_dir);

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::debug!(
        version = util::constants::APP_VERSION,
        config_dir = %config_dir.display(),
        "LogSections starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    match run(cli.command, &app_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, app_config: &config::AppConfig) -> Result<(), LogSectionsError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Sections {
            log,
            format,
            replace,
            events,
        } => {
            let rewrite = pipeline::build_rewrite(app_config, &replace)?;
            let apply = |message: &str| rewrite.apply(message);
            let transform = (!rewrite.is_empty()).then_some(&apply as &dyn Fn(&str) -> String);

            let parse_config = ParseConfig {
                max_warnings: app_config.max_warnings,
            };
            let parsed = pipeline::parse_file(&log, &parse_config, transform)?;

            if parsed.warnings_suppressed > 0 {
                tracing::warn!(
                    suppressed = parsed.warnings_suppressed,
                    "Further warnings suppressed"
                );
            }

            let Some(root) = parsed.root else {
                tracing::info!(path = %log.display(), "No timestamped lines; nothing to show");
                return Ok(());
            };

            match format {
                SectionsFormat::Tree => {
                    export::render_tree(&root, events, &mut out)?;
                }
                SectionsFormat::Json => {
                    export::export_tree_json(&root, &mut out)?;
                    write_stdout(&mut out, "\n")?;
                }
                SectionsFormat::Csv => {
                    export::export_sections_csv(&root, &mut out)?;
                }
            }
        }
        Command::Series {
            definitions,
            format,
        } => {
            let series_config = config::load_series_config(&definitions)?;
            let (series, warnings) = pipeline::extract_from_config(&series_config)?;
            for warning in &warnings {
                tracing::warn!(warning = %warning, "Series warning");
            }

            match format {
                SeriesFormat::Csv => {
                    export::export_series_csv(&series, &mut out)?;
                }
                SeriesFormat::Summary => {
                    export::write_series_summary(&series, &series_config.colors(), &mut out)?;
                }
            }
        }
    }
    Ok(())
}

fn write_stdout(out: &mut impl Write, text: &str) -> Result<(), LogSectionsError> {
    out.write_all(text.as_bytes())
        .map_err(|source| LogSectionsError::Io {
            path: PathBuf::from("<stdout>"),
            operation: "write",
            source,
        })
}
