//! docdb-cli - Command-line tools for docdb document files
//!
//! Reads files of concatenated encoded documents and iterates them through
//! a result cursor.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use docdb_driver::DEFAULT_BATCH_SIZE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docdb-cli")]
#[command(about = "Inspect docdb document files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every document in a file as extended JSON, one per line
    Dump {
        /// File of concatenated encoded documents
        file: PathBuf,

        /// Documents fetched per batch
        #[arg(short, long, env = "DOCDB_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: u32,

        /// Stop after this many documents
        #[arg(short, long)]
        limit: Option<u64>,

        /// Indent each document
        #[arg(long)]
        pretty: bool,

        /// Namespace reported in logs
        #[arg(long, default_value = "dump.documents")]
        namespace: String,
    },

    /// Count the documents in a file
    Count {
        /// File of concatenated encoded documents
        file: PathBuf,
    },

    /// Compare two server version strings
    VersionCompare {
        /// First version (e.g. 3.6.1)
        a: String,

        /// Second version
        b: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            file,
            batch_size,
            limit,
            pretty,
            namespace,
        } => {
            let options = commands::DumpOptions {
                batch_size,
                limit,
                pretty,
                namespace,
            };
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            match commands::dump(&file, &options, &mut out).await {
                Ok(summary) => {
                    if summary.skipped > 0 {
                        eprintln!(
                            "{}: skipped {} undecodable document(s)",
                            "Warning".yellow(),
                            summary.skipped
                        );
                    }
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
        cmd => match commands::execute(cmd).await {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
