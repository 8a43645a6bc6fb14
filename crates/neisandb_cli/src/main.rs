//! NeisanDB CLI
//!
//! Command-line tools for inspecting NeisanDB page files.
//!
//! # Commands
//!
//! - `inspect` - Display file statistics and record counts
//! - `verify` - Decode every page and report corruption
//! - `dump-pages` - Print page entries for debugging

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// NeisanDB command-line tools.
#[derive(Parser)]
#[command(name = "neisandb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Page size of the file in bytes
    #[arg(global = true, long, default_value_t = neisandb_core::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display file statistics and record counts
    Inspect {
        /// Path to a .nsdb page file
        file: PathBuf,
    },

    /// Decode every page and report corruption
    Verify {
        /// Path to a .nsdb page file
        file: PathBuf,
    },

    /// Print page entries for debugging
    DumpPages {
        /// Path to a .nsdb page file
        file: PathBuf,

        /// Dump only this page index
        #[arg(short, long)]
        page: Option<u64>,

        /// Maximum number of entries to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { file } => {
            commands::inspect::run(&file, cli.page_size).await?;
        }
        Commands::Verify { file } => {
            commands::verify::run(&file, cli.page_size).await?;
        }
        Commands::DumpPages { file, page, limit } => {
            commands::dump_pages::run(&file, cli.page_size, page, limit).await?;
        }
        Commands::Version => {
            println!("NeisanDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("NeisanDB Core v{}", neisandb_core::VERSION);
        }
    }

    Ok(())
}
