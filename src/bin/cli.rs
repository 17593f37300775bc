//! StrataKV CLI
//!
//! Opens a data directory and runs one command against it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stratakv::protocol::{Command, Response};
use stratakv::storage::SSTableReader;
use stratakv::wal::WalRecovery;
use stratakv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// StrataKV CLI
#[derive(Parser, Debug)]
#[command(name = "stratakv")]
#[command(about = "Log-structured key-value store")]
#[command(version)]
struct Args {
    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Delete a key and print its previous value
    Del {
        /// The key to delete
        key: String,
    },

    /// Print every live key-value pair
    GetAll,

    /// Flush the memtable to a new segment
    Flush,

    /// Merge all segments into one
    Compact,

    /// Verify a segment file's checksum and print its summary
    VerifySegment {
        /// Path to the segment file
        path: PathBuf,
    },

    /// Scan a WAL file without modifying it
    VerifyWal {
        /// Path to the WAL file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stratakv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> stratakv::Result<ExitCode> {
    let command = match args.command {
        Commands::VerifySegment { path } => {
            let table = SSTableReader::open(&path)?;
            println!(
                "ok: {} entries, checksum {:#010x}, keys {:?}..{:?}",
                table.entry_count(),
                table.checksum(),
                table.smallest_key().map(String::from_utf8_lossy),
                table.largest_key().map(String::from_utf8_lossy),
            );
            return Ok(ExitCode::SUCCESS);
        }
        Commands::VerifyWal { path } => {
            let result = WalRecovery::verify(&path)?;
            println!(
                "{} records, {} invalid, {} torn bytes",
                result.entries_recovered, result.entries_invalid, result.bytes_truncated
            );
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Flush => {
            let engine = open_engine(args.config.as_deref(), args.data_dir)?;
            match engine.flush()? {
                Some(report) => println!(
                    "flushed {} entries to segment {}",
                    report.entries, report.segment
                ),
                None => println!("memtable empty, nothing to flush"),
            }
            engine.close()?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Compact => {
            let engine = open_engine(args.config.as_deref(), args.data_dir)?;
            match engine.compact()? {
                Some(report) => println!(
                    "merged {} segments into {} ({} -> {} entries)",
                    report.inputs.len(),
                    report.merged,
                    report.entries_in,
                    report.entries_out
                ),
                None => println!("nothing to compact"),
            }
            engine.close()?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Set { key, value } => Command::Set {
            key: key.into_bytes(),
            value: value.into_bytes(),
        },
        Commands::Get { key } => Command::Get {
            key: key.into_bytes(),
        },
        Commands::Del { key } => Command::Del {
            key: key.into_bytes(),
        },
        Commands::GetAll => Command::GetAll,
    };

    let engine = open_engine(args.config.as_deref(), args.data_dir)?;
    let response = engine.execute(command);
    let code = print_response(&response);

    // Writes stay in the WAL; closing flushes them into a segment.
    engine.close()?;
    Ok(code)
}

/// Load the config file (if any), apply the data directory override, open
fn open_engine(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> stratakv::Result<Engine> {
    let mut config = match config_path {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }

    tracing::debug!("StrataKV v{}", stratakv::VERSION);
    Engine::open(config)
}

fn print_response(response: &Response) -> ExitCode {
    match response {
        Response::Ok => println!("OK"),
        Response::Value(value) | Response::Deleted(value) => {
            println!("{}", String::from_utf8_lossy(value))
        }
        Response::Entries(entries) => {
            for entry in entries {
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&entry.key),
                    String::from_utf8_lossy(&entry.value)
                );
            }
        }
        Response::NotFound => {
            eprintln!("(not found)");
            return ExitCode::from(1);
        }
        Response::BadRequest(msg) => {
            eprintln!("bad request: {}", msg);
            return ExitCode::from(2);
        }
        Response::Error(msg) => {
            eprintln!("error: {}", msg);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
