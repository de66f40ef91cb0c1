//! Posekit CLI - Command-line interface for the posing engine
//!
//! This binary inspects frame captures and pose files: it validates them,
//! resolves the rendered pose, and lists bilateral bone pairs.

use clap::{ArgAction, Parser, Subcommand};
use std::process::ExitCode;

use posekit_cli::{commands, logger};

/// Posekit - Character posing engine tools
#[derive(Parser)]
#[command(name = "posekit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a capture (and optional pose file) for topology, mirror and pose problems
    Validate {
        /// Path to the frame capture (JSON)
        #[arg(short, long)]
        capture: String,

        /// Pose file to import on top of the capture
        #[arg(short, long)]
        pose: Option<String>,

        /// Engine config file (JSON)
        #[arg(long)]
        config: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the transforms the engine hands to the renderer
    Resolve {
        /// Path to the frame capture (JSON)
        #[arg(short, long)]
        capture: String,

        /// Pose file to import on top of the capture
        #[arg(short, long)]
        pose: Option<String>,

        /// Engine config file (JSON)
        #[arg(long)]
        config: Option<String>,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },

    /// List bilateral bone pairs resolved by the mirror rules
    Mirror {
        /// Path to the frame capture (JSON)
        #[arg(short, long)]
        capture: String,

        /// Engine config file carrying the mirror rules (JSON)
        #[arg(long)]
        config: Option<String>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logger::init(logger::level_for(cli.verbose)) {
        eprintln!("{}: {}", colored::Colorize::yellow("warning"), e);
    }

    let result = match cli.command {
        Commands::Validate {
            capture,
            pose,
            config,
            json,
        } => commands::validate::run(&capture, pose.as_deref(), config.as_deref(), json),
        Commands::Resolve {
            capture,
            pose,
            config,
            pretty,
        } => commands::resolve::run(&capture, pose.as_deref(), config.as_deref(), pretty),
        Commands::Mirror {
            capture,
            config,
            json,
        } => commands::mirror::run(&capture, config.as_deref(), json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_validate() {
        let cli = Cli::try_parse_from([
            "posekit",
            "validate",
            "--capture",
            "capture.json",
            "--pose",
            "pose.json",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Validate {
                capture,
                pose,
                config,
                json,
            } => {
                assert_eq!(capture, "capture.json");
                assert_eq!(pose.as_deref(), Some("pose.json"));
                assert!(config.is_none());
                assert!(json);
            }
            _ => panic!("expected validate command"),
        }
    }

    #[test]
    fn test_cli_counts_verbosity() {
        let cli = Cli::try_parse_from(["posekit", "-vv", "mirror", "-c", "capture.json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Mirror { .. }));
    }

    #[test]
    fn test_cli_requires_capture() {
        assert!(Cli::try_parse_from(["posekit", "resolve"]).is_err());
    }
}
