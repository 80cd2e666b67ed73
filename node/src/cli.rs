//! # CLI Interface
//!
//! Defines the command-line argument structure for `timelock-node` using
//! `clap` derive. Subcommands: `run`, `init`, `derive`, `list` and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use timelock_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT, DEVNET_GENESIS_LAMPORTS};

/// Time-locked vault node.
///
/// Hosts a local ledger with the vault program, serves the HTTP API for
/// submitting signed vault transactions and querying vaults, and exposes
/// Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "timelock-node",
    about = "Time-locked vault node",
    version,
    propagate_version = true
)]
pub struct TimelockNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Initialize a data directory and generate the operator keypair.
    Init(InitArgs),
    /// Print the vault address for an owner and id. Works offline.
    Derive(DeriveArgs),
    /// List live vaults from a local ledger. The node must not be running.
    List(ListArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Data directory holding the ledger and the operator key.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "TIMELOCK_DATA_DIR", default_value = ".timelock")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "TIMELOCK_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TIMELOCK_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "TIMELOCK_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Lamports credited to the operator key when the ledger is empty.
    #[arg(long, default_value_t = DEVNET_GENESIS_LAMPORTS)]
    pub genesis_lamports: u64,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "TIMELOCK_DATA_DIR", default_value = ".timelock")]
    pub data_dir: PathBuf,

    /// Overwrite an existing operator key.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `derive` subcommand.
#[derive(Parser, Debug)]
pub struct DeriveArgs {
    /// Owner public key, base58.
    #[arg(long)]
    pub owner: String,

    /// Vault id, 1 to 32 bytes.
    #[arg(long)]
    pub id: String,
}

/// Arguments for the `list` subcommand.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Data directory holding the ledger.
    #[arg(long, short = 'd', env = "TIMELOCK_DATA_DIR", default_value = ".timelock")]
    pub data_dir: PathBuf,

    /// Only show vaults owned by this base58 public key.
    #[arg(long)]
    pub owner: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        TimelockNodeCli::command().debug_assert();
    }

    #[test]
    fn derive_takes_owner_and_id() {
        let cli = TimelockNodeCli::try_parse_from([
            "timelock-node",
            "derive",
            "--owner",
            "11111111111111111111111111111111",
            "--id",
            "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Derive(args) => assert_eq!(args.id, "7"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_defaults() {
        let cli = TimelockNodeCli::try_parse_from(["timelock-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
                assert_eq!(args.genesis_lamports, DEVNET_GENESIS_LAMPORTS);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
