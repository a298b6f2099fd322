//! Operator CLI for the account store.
//!
//! # Responsibility
//! - Replay a legacy JSON store into the SQLite store.
//! - Print (creating on first use) the installation id.
//! - Provide a linkage check for the core crate.

use clap::{Parser, Subcommand};
use log::info;
use meshstore_core::{
    init_logging, AccountService, AccountStore, FileStore, SqliteStore, StoreConfig,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "meshstore", about = "Mesh control plane account store tooling")]
struct Cli {
    /// JSON store config; flags below override its fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the store database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import every account and the installation id from a legacy store.json
    Import {
        /// Path to the legacy store file
        #[arg(long)]
        legacy: PathBuf,
    },
    /// Print the installation id, generating one if none is stored
    InstallationId,
    /// Check core crate linkage
    Ping,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("meshstore: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_dir) = &cli.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    match cli.command {
        Command::Import { legacy } => {
            let file_store = FileStore::load(&legacy)?;
            info!(
                "event=cli_import module=cli status=start legacy={} data_dir={}",
                legacy.display(),
                config.data_dir.display()
            );
            let store = SqliteStore::from_file_store(&file_store, &config, None)?;
            println!(
                "imported {} accounts into {}",
                file_store.accounts.len(),
                config.store_path().display()
            );
            store.close()?;
        }
        Command::InstallationId => {
            let service = AccountService::new(SqliteStore::open(&config, None)?);
            println!("{}", service.ensure_installation_id()?);
            service.store().close()?;
        }
        Command::Ping => {
            println!("meshstore_core ping={}", meshstore_core::ping());
            println!("meshstore_core version={}", meshstore_core::core_version());
        }
    }
    Ok(())
}
