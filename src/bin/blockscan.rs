mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{cmd_scan, cmd_validate};

/// Environment variable holding the log filter (tracing EnvFilter syntax)
const LOG_ENV: &str = "BLOCKSCAN_LOG";

#[derive(Parser)]
#[command(name = "blockscan")]
#[command(
    about = "Block-mode multi-pattern scanner for numbered regular expressions",
    long_about = "blockscan - Block-mode multi-pattern scanner for numbered regular expressions\n\n\
    Compiles a pattern file (one `ID:/EXPRESSION/FLAGS` per line) and scans\n\
    input blocks against it, reporting the id of the matching pattern or -1.\n\n\
    Examples:\n\
      blockscan validate rules.txt\n\
      blockscan scan rules.txt access.log\n\
      blockscan scan rules.txt --data 'GET /admin'\n\
      zcat access.log.gz | blockscan scan rules.txt - --matches-only\n\n\
    Logging is controlled with the BLOCKSCAN_LOG environment variable."
)]
#[command(version)]
struct Cli {
    /// Enable debug logging (BLOCKSCAN_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan inputs against a pattern file, one block per line
    Scan {
        /// Pattern file to compile
        #[arg(value_name = "PATTERNS")]
        patterns: PathBuf,

        /// Input files (one block per line, gzip decompressed), or "-" for stdin
        #[arg(value_name = "INPUT", required_unless_present = "data")]
        inputs: Vec<PathBuf>,

        /// Scan this string as a single block instead of reading inputs
        #[arg(short, long, conflicts_with = "inputs")]
        data: Option<String>,

        /// Quiet mode - no output, only exit code (0 = matched, 1 = no match)
        #[arg(short, long)]
        quiet: bool,

        /// Only print blocks that matched a pattern
        #[arg(long)]
        matches_only: bool,
    },

    /// Validate a pattern file by compiling it
    Validate {
        /// Pattern file to check
        #[arg(value_name = "PATTERNS")]
        patterns: PathBuf,

        /// Include every parsed pattern in the output
        #[arg(long)]
        list: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "blockscan=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            patterns,
            inputs,
            data,
            quiet,
            matches_only,
        } => cmd_scan(patterns, inputs, data, quiet, matches_only),
        Commands::Validate { patterns, list } => cmd_validate(patterns, list),
    }
}
