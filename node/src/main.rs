// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Time-Locked Vault Node
//!
//! Entry point for the `timelock-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the ledger, and serves the HTTP
//! API.
//!
//! Subcommands:
//!
//! - `run`     start the node
//! - `init`    create the data directory and the operator key
//! - `derive`  print a vault address for `(owner, id)`
//! - `list`    print live vaults from a stopped node's ledger
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use timelock_contracts::address::vault_address;
use timelock_contracts::VaultProgram;
use timelock_protocol::config::{program_name, PROTOCOL_VERSION, VAULT_PROGRAM_ID};
use timelock_protocol::{Keypair, Ledger, Pubkey};

use cli::{Commands, TimelockNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

const OPERATOR_KEY_FILE: &str = "operator.key";
const LEDGER_DIR: &str = "ledger";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TimelockNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Derive(args) => derive(args),
        Commands::List(args) => list_vaults(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: ledger, API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "timelock_node=info,timelock_contracts=info,timelock_protocol=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting timelock-node"
    );

    // --- Ledger ---
    let ledger = open_ledger(&args.data_dir)?;
    initialize_genesis(&ledger, &args.data_dir, args.genesis_lamports)?;
    let program = VaultProgram::with_system_clock(ledger);

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    let live = program.all_vaults().context("failed to scan vaults")?.len();
    node_metrics.live_vaults.set(live as i64);
    tracing::info!(live_vaults = live, "vault program ready");

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        program: program.clone(),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!(addr = %api_addr, "API server listening");

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!(addr = %metrics_addr, "metrics server listening");

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "API server error");
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "metrics server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    program.ledger().flush().context("failed to flush ledger")?;
    tracing::info!("timelock-node stopped");
    Ok(())
}

fn open_ledger(data_dir: &Path) -> Result<Ledger> {
    let path = data_dir.join(LEDGER_DIR);
    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create ledger directory: {}", path.display()))?;
    Ledger::open(&path).with_context(|| format!("failed to open ledger at {}", path.display()))
}

fn operator_key_path(data_dir: &Path) -> PathBuf {
    data_dir.join(OPERATOR_KEY_FILE)
}

/// Credits the operator key on an empty ledger. A ledger that already has
/// accounts is left alone.
fn initialize_genesis(ledger: &Ledger, data_dir: &Path, lamports: u64) -> Result<()> {
    if ledger.account_count() > 0 {
        tracing::info!(accounts = ledger.account_count(), "ledger loaded");
        return Ok(());
    }

    let key_path = operator_key_path(data_dir);
    if !key_path.exists() {
        tracing::warn!(
            key_path = %key_path.display(),
            "empty ledger and no operator key; run `timelock-node init` to seed a devnet balance"
        );
        return Ok(());
    }

    let operator = read_keypair(&key_path)?;
    ledger
        .fund_account(&operator.pubkey(), lamports)
        .context("failed to write genesis balance")?;
    ledger.flush().context("failed to flush ledger")?;
    tracing::info!(operator = %operator.pubkey(), lamports, "genesis balance credited");
    Ok(())
}

fn read_keypair(path: &Path) -> Result<Keypair> {
    let hex_key = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    Keypair::from_hex(&hex_key).with_context(|| format!("invalid key in {}", path.display()))
}

/// Creates the data directory and writes a fresh operator keypair.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("timelock_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let key_path = operator_key_path(data_dir);
    if key_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to replace it",
            key_path.display()
        );
    }

    let keypair = Keypair::generate();
    std::fs::write(&key_path, hex::encode(keypair.to_bytes()))
        .with_context(|| format!("failed to write operator key to {}", key_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", key_path.display()))?;
    }

    tracing::info!(
        public_key = %keypair.pubkey(),
        key_path = %key_path.display(),
        "operator keypair generated"
    );

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Operator key   : {}", key_path.display());
    println!("  Public key     : {}", keypair.pubkey());

    Ok(())
}

/// Prints the vault address for `(owner, id)`.
fn derive(args: cli::DeriveArgs) -> Result<()> {
    let owner: Pubkey = args
        .owner
        .parse()
        .with_context(|| format!("invalid owner {:?}", args.owner))?;
    let (address, bump) = vault_address(&owner, &args.id)?;
    println!("address: {address}");
    println!("bump:    {bump}");
    Ok(())
}

/// Prints live vaults from a local ledger.
fn list_vaults(args: cli::ListArgs) -> Result<()> {
    let program = VaultProgram::with_system_clock(open_ledger(&args.data_dir)?);
    let vaults = match args.owner.as_deref() {
        Some(owner) => {
            let owner: Pubkey = owner
                .parse()
                .with_context(|| format!("invalid owner {owner:?}"))?;
            program.vaults_by_owner(&owner)?
        }
        None => program.all_vaults()?,
    };

    let now = program.now();
    for (address, record) in &vaults {
        let asset = match record.asset_kind.mint() {
            Some(mint) => mint.to_base58(),
            None => "native".to_string(),
        };
        let state = if record.is_unlocked(now) { "unlocked" } else { "locked" };
        println!(
            "{address}  id={}  owner={}  asset={asset}  amount={}  unlock_time={}  {state}",
            record.id, record.owner, record.amount, record.unlock_time
        );
    }
    println!("{} vault(s)", vaults.len());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("timelock-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", PROTOCOL_VERSION);
    println!(
        "program       {} ({})",
        VAULT_PROGRAM_ID,
        program_name(&VAULT_PROGRAM_ID).unwrap_or("unknown")
    );
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
