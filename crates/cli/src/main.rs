// streetscape CLI - batch street-survey feature pipeline

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "streetscape")]
#[command(about = "Fuse street-survey, parcel and image data into labelled feature tables")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline from a TOML config file
    #[command(after_help = "\
Examples:
  streetscape run pipeline.toml
  streetscape run pipeline.toml --json
  streetscape run pipeline.toml --output summary.json
  streetscape run pipeline.toml --skip-segmentation
  RUST_LOG=streetscape_recon=debug streetscape run pipeline.toml")]
    Run {
        /// Path to the pipeline .toml config file
        config: PathBuf,

        /// Print the JSON run summary to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON run summary to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Do not call the segmentation endpoint even if enabled in config
        #[arg(long)]
        skip_segmentation: bool,
    },

    /// Validate a pipeline config and check its input paths without running
    #[command(after_help = "\
Examples:
  streetscape validate pipeline.toml")]
    Validate {
        /// Path to the pipeline .toml config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  streetscape-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  streetscape-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            skip_segmentation,
        } => run::cmd_run(config, json, output, skip_segmentation),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
