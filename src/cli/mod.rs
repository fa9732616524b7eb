// CLI - Command Line Interface for the Agora executor
// Principle: Simple, clear, composable commands

pub mod config;
pub mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agora executor - deterministic transaction execution over a local state
#[derive(Parser, Debug)]
#[command(name = "agora-exec")]
#[command(author = "Agora Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agora execution core - swaps, limit orders and multisig accounts")]
#[command(long_about = r#"
Runs Agora transactions against a state snapshot stored on disk.

Create a development state:
  agora-exec genesis --dev --owner alice.json

Simulate a transaction (mempool check):
  agora-exec check --tx <hex>

Execute a block of transactions and persist the result:
  agora-exec deliver --tx <hex> --tx <hex>
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "AGORA_LOG")]
    pub log_level: String,

    /// Base path for the state database
    #[arg(short = 'd', long, global = true, env = "AGORA_BASE_PATH")]
    pub base_path: Option<PathBuf>,

    /// Executor configuration file (JSON)
    #[arg(long, global = true, env = "AGORA_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the genesis state and store it at height 0
    Genesis(GenesisCmd),

    /// Simulate transactions without writing anything
    Check(CheckCmd),

    /// Execute transactions as the next block and persist the state
    Deliver(DeliverCmd),

    /// Show the stored state
    Inspect(InspectCmd),

    /// Key management
    Key(KeyCmd),
}

#[derive(Parser, Debug)]
pub struct GenesisCmd {
    /// Genesis specification file
    #[arg(long, conflicts_with = "dev")]
    pub spec: Option<PathBuf>,

    /// Use the development preset
    #[arg(long)]
    pub dev: bool,

    /// Key file (or hex address) that owns the development funds
    #[arg(long, requires = "dev")]
    pub owner: Option<String>,

    /// Write the specification that was used to this file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Replace an existing state
    #[arg(long)]
    pub force: bool,
}

/// Raw transactions, hex encoded, from arguments or a file (one per line)
#[derive(Parser, Debug)]
pub struct TxInput {
    /// Hex encoded transaction (repeatable)
    #[arg(long = "tx", value_name = "HEX")]
    pub txs: Vec<String>,

    /// File with one hex transaction per line
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CheckCmd {
    #[command(flatten)]
    pub input: TxInput,

    /// Minimum gas price (defaults to the configured one)
    #[arg(long)]
    pub min_gas_price: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct DeliverCmd {
    #[command(flatten)]
    pub input: TxInput,

    /// Keep the receipts' tags out of the output
    #[arg(long)]
    pub suppress_tags: bool,
}

#[derive(Parser, Debug)]
pub struct InspectCmd {
    /// Snapshot height (latest if not specified)
    #[arg(long)]
    pub height: Option<u64>,

    /// Show the balances, nonce and liquidity of this account
    #[arg(long)]
    pub account: Option<String>,
}

/// Key management commands
#[derive(Parser, Debug)]
pub struct KeyCmd {
    #[command(subcommand)]
    pub subcommand: KeySubcommand,
}

#[derive(Subcommand, Debug)]
pub enum KeySubcommand {
    /// Generate a new ed25519 keypair
    Generate {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (hex, json)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Inspect a secret key (hex)
    Inspect {
        /// Secret key
        key: String,
    },

    /// Sign a transfer and print the raw transaction
    Send {
        /// Key file of the sender
        #[arg(long)]
        key: PathBuf,

        /// Recipient address
        #[arg(long)]
        to: String,

        /// Coin id
        #[arg(long, default_value = "0")]
        coin: u32,

        /// Amount in coins (decimal, up to 18 digits after the point)
        #[arg(long)]
        value: String,

        /// Nonce (stored nonce + 1)
        #[arg(long)]
        nonce: u64,

        /// Coin paying the commission
        #[arg(long, default_value = "0")]
        gas_coin: u32,

        /// Gas price multiplier
        #[arg(long, default_value = "1")]
        gas_price: u64,
    },
}

impl Cli {
    /// Get the base path, defaulting to ./agora-data
    pub fn get_base_path(&self) -> PathBuf {
        self.base_path.clone().unwrap_or_else(|| PathBuf::from("agora-data"))
    }
}
