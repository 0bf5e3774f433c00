use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "kodi",
    version,
    about = "Reconcile rent payments from M-PESA and bank statements",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "KODI_DB", default_value = "kodi.db", global = true)]
    pub db: PathBuf,
    /// TOML file overriding matcher confidence levels
    #[arg(long, env = "KODI_MATCHER_CONFIG", global = true)]
    pub matcher_config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report which statement format a file is in
    Detect {
        /// Statement file
        path: PathBuf,
    },
    /// Parse a statement and print its credit transactions
    Parse {
        /// Statement file
        path: PathBuf,
        /// Skip detection and read the file as this format (mpesa, kcb, equity, coop, ncba, generic)
        #[arg(long)]
        dialect: Option<String>,
    },
    /// Store a statement's payments and match them to tenants
    Ingest {
        /// Statement file
        path: PathBuf,
        /// Landlord the statement belongs to
        #[arg(long, env = "KODI_LANDLORD")]
        landlord: String,
        /// Skip detection and read the file as this format
        #[arg(long)]
        dialect: Option<String>,
    },
    /// Load leases, payment channels and invoices from a TOML file
    LoadLedger {
        /// Ledger TOML file with [[leases]], [[channels]] and [[invoices]] tables
        path: PathBuf,
    },
    /// List recent uploads with their counts
    Runs {
        /// Maximum number of uploads to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
