//! Lookalike CLI - Perceptual image matching tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (including comparisons with no match)
  1   General error
  64  Invalid arguments (threshold, concurrency, patch geometry)
  65  File is not a decodable image
  66  Cannot read input file or reference directory
  74  I/O error";

#[derive(Parser)]
#[command(name = "lookalike")]
#[command(author, version, about = "Perceptual-hash image matching", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the perceptual hash of an image
    Hash {
        /// Path to the image
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Also list the hashes of the overlapping crops used for partial matching
        #[arg(long)]
        patches: bool,
    },

    /// Compare an image against a directory of reference images
    Compare {
        /// Path to the query image
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory of reference images (.jpg, .jpeg, .png)
        #[arg(short, long, value_name = "DIR")]
        reference: PathBuf,

        /// Minimum similarity percentage for a similar or partial match
        #[arg(short, long, default_value_t = lookalike_core::DEFAULT_SIMILAR_THRESHOLD)]
        threshold: f64,

        /// Maximum number of catalog comparisons in flight
        #[arg(short, long, default_value_t = lookalike_core::DEFAULT_CONCURRENCY_LIMIT)]
        concurrency: usize,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "lookalike={level},lookalike_core={level}"
        )))
        .with_writer(std::io::stderr)
        .with_ansi(colored::control::SHOULD_COLORIZE.should_colorize())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(&cli);

    if let Err(err) = run(cli).await {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = exit.message {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
        std::process::exit(exit.code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Hash { file, patches } => commands::hash::execute(file, patches, cli.quiet).await,
        Commands::Compare {
            file,
            reference,
            threshold,
            concurrency,
            json,
        } => {
            commands::compare::execute(
                commands::compare::CompareArgs {
                    file,
                    reference,
                    threshold,
                    concurrency,
                    json,
                },
                cli.quiet,
            )
            .await
        }
    }
}
