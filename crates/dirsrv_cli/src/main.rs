//! dirsrv CLI
//!
//! Command-line tools for dirsrv.
//!
//! # Commands
//!
//! - `decode` - Decode hex-encoded LDAP message frames
//! - `dump-replog` - Dump the records of a replication log
//! - `demo` - Run a scripted session against an in-memory directory

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// dirsrv command-line tools.
#[derive(Parser)]
#[command(name = "dirsrv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode hex-encoded LDAP message frames
    Decode {
        /// Hex bytes of one or more concatenated frames
        hex: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump the records of a replication log
    DumpReplog {
        /// Path to the replog file
        path: PathBuf,

        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a scripted session against an in-memory directory
    Demo {
        /// Write replicated changes to this replog file
        #[arg(short, long)]
        replog: Option<PathBuf>,

        /// Replica host written on every replog record
        #[arg(long)]
        replica: Vec<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Decode { hex, format } => {
            commands::decode::run(&hex, &format)?;
        }
        Commands::DumpReplog {
            path,
            limit,
            format,
        } => {
            commands::dump_replog::run(&path, limit, &format)?;
        }
        Commands::Demo { replog, replica } => {
            commands::demo::run(replog.as_deref(), &replica)?;
        }
        Commands::Version => {
            println!("dirsrv CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
