//! Caption Overlay CLI
//!
//! Loads a JSON config and stamps each job's text onto its image.
//! Exit codes: 0 all jobs succeeded, 1 config failed to load, 2 a job failed,
//! 3 the JSON report could not be written.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use caption_overlay::{logging, OverlayConfig, OverlayPipeline, DEFAULT_CONFIG_PATH};

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_JOB_FAILED: u8 = 2;
const EXIT_REPORT_FAILED: u8 = 3;

#[derive(Parser)]
#[command(name = "caption-overlay")]
#[command(version, about = "Caption Overlay - stamp configured text onto images")]
struct Cli {
    /// Path to the JSON config file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print a JSON run report to stdout instead of progress lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = match OverlayConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let pipeline = OverlayPipeline::new(config);
    let quiet = cli.json;

    let report = pipeline.run_with(
        |job| {
            if !quiet {
                println!("Processing {}...", job.name);
            }
        },
        |outcome| match &outcome.result {
            Ok(out) if !quiet => println!("✓ Created: {}", out.output.display()),
            Ok(_) => {}
            Err(e) => eprintln!("✗ {}: {}", outcome.name, e),
        },
    );

    let report_written = if cli.json {
        match report.to_json() {
            Ok(json) => {
                println!("{}", json);
                true
            }
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                false
            }
        }
    } else {
        println!();
        println!("{}", report.summary_line());
        true
    };

    ExitCode::from(exit_status(report.all_succeeded(), report_written))
}

/// Job failures take precedence over a lost report.
fn exit_status(all_succeeded: bool, report_written: bool) -> u8 {
    match (all_succeeded, report_written) {
        (false, _) => EXIT_JOB_FAILED,
        (true, false) => EXIT_REPORT_FAILED,
        (true, true) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(true, true), 0);
        assert_eq!(exit_status(false, true), EXIT_JOB_FAILED);
        assert_eq!(exit_status(true, false), EXIT_REPORT_FAILED);
        assert_eq!(exit_status(false, false), EXIT_JOB_FAILED);
    }
}
