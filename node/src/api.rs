//! # REST API
//!
//! Builds the axum router for the node's HTTP interface. Every handler
//! shares the vault program and metrics through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                            |
//! |--------|--------------------------|----------------------------------------|
//! | GET    | `/health`                | Liveness probe                         |
//! | GET    | `/status`                | Version, program id, clock, vault count|
//! | POST   | `/transactions`          | Submit a signed vault transaction      |
//! | GET    | `/vaults`                | Live vaults, `?owner=<base58>` filter  |
//! | GET    | `/vaults/:address`       | One vault record                       |
//! | GET    | `/derive/:owner/:id`     | Vault address and bump                 |
//! | GET    | `/accounts/:address`     | Native balance of any address          |
//! | GET    | `/next-id`               | Next free numeric vault id             |
//!
//! ## Errors
//!
//! Failures come back as `{ "error": "...", "code": 6001 }`. `code` is the
//! vault program's stable error code, or `null` for failures outside it.
//!
//! | Status | When                                           |
//! |--------|------------------------------------------------|
//! | 400    | malformed address in the path or query         |
//! | 403    | signer is not the owner, or bad signature      |
//! | 404    | no live vault at the address                   |
//! | 409    | vault already exists                           |
//! | 422    | any other rejected operation                   |
//! | 500    | storage or record corruption                   |

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use timelock_contracts::{Receipt, Transaction, VaultError, VaultProgram, VaultRecord};
use timelock_protocol::config::{program_name, VAULT_PROGRAM_ID};
use timelock_protocol::{LedgerError, Pubkey};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub program: VaultProgram,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/transactions", post(submit_handler))
        .route("/vaults", get(list_vaults_handler))
        .route("/vaults/:address", get(vault_handler))
        .route("/derive/:owner/:id", get(derive_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/next-id", get(next_id_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    /// Base58 vault program id.
    pub program_id: String,
    /// Ledger clock, Unix seconds.
    pub clock: i64,
    pub vault_count: usize,
    /// RFC 3339 wall-clock time of the response.
    pub timestamp: String,
}

/// One vault as returned by `/vaults` and `/vaults/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultView {
    pub address: Pubkey,
    pub vault: VaultRecord,
    /// RFC 3339 rendering of `unlock_time`, if representable.
    pub unlocks_at: Option<String>,
    pub unlocked: bool,
}

impl VaultView {
    fn new(address: Pubkey, vault: VaultRecord, now: i64) -> Self {
        Self {
            address,
            unlocks_at: vault.unlock_at().map(|t| t.to_rfc3339()),
            unlocked: vault.is_unlocked(now),
            vault,
        }
    }
}

/// Response payload for `GET /derive/:owner/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeriveResponse {
    pub address: Pubkey,
    pub bump: u8,
    /// Whether a vault currently lives there.
    pub live: bool,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Pubkey,
    pub lamports: u64,
    /// Owning program; `None` for addresses with no account.
    pub owner: Option<Pubkey>,
    /// Friendly name of the owning program, if well known.
    pub owner_name: Option<String>,
    pub data_len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NextIdResponse {
    pub next_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct VaultsQuery {
    pub owner: Option<String>,
}

/// Error body returned on every failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: Option<u32>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler error, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    Vault(VaultError),
    BadRequest(String),
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        Self::Vault(e)
    }
}

/// HTTP status for a vault program failure.
pub fn status_for(err: &VaultError) -> StatusCode {
    match err {
        VaultError::VaultDoesNotExist => StatusCode::NOT_FOUND,
        VaultError::Unauthorized => StatusCode::FORBIDDEN,
        VaultError::VaultAlreadyExists => StatusCode::CONFLICT,
        VaultError::CorruptRecord(_)
        | VaultError::Ledger(LedgerError::Storage(_))
        | VaultError::Ledger(LedgerError::Serialization(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Vault(e) => {
                let status = status_for(&e);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %e, "request failed");
                }
                (
                    status,
                    ErrorResponse {
                        error: e.to_string(),
                        code: e.code(),
                    },
                )
            }
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    code: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn parse_pubkey(s: &str) -> Result<Pubkey, ApiError> {
    s.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid address {s:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Liveness only; subsystem state belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(StatusResponse {
        version: state.version.clone(),
        program_id: VAULT_PROGRAM_ID.to_base58(),
        clock: state.program.now(),
        vault_count: state.program.all_vaults()?.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /transactions`. Verifies and executes one signed transaction.
async fn submit_handler(
    State(state): State<AppState>,
    Json(tx): Json<Transaction>,
) -> Result<Json<Receipt>, ApiError> {
    let started = Instant::now();
    let result = state.program.execute(&tx);
    state
        .metrics
        .operation_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(receipt) => {
            if tx.instruction.is_deposit() {
                state.metrics.vaults_created_total.inc();
                state.metrics.live_vaults.inc();
            } else {
                state.metrics.vaults_withdrawn_total.inc();
                state.metrics.live_vaults.dec();
            }
            Ok(Json(receipt))
        }
        Err(e) => {
            state
                .metrics
                .operations_failed_total
                .with_label_values(&[e.name()])
                .inc();
            tracing::info!(
                instruction = tx.instruction.name(),
                payer = %tx.payer,
                error = %e,
                "transaction rejected"
            );
            Err(e.into())
        }
    }
}

/// `GET /vaults`, optionally filtered by `?owner=`.
async fn list_vaults_handler(
    State(state): State<AppState>,
    Query(query): Query<VaultsQuery>,
) -> Result<Json<Vec<VaultView>>, ApiError> {
    let vaults = match query.owner.as_deref() {
        Some(owner) => state.program.vaults_by_owner(&parse_pubkey(owner)?)?,
        None => state.program.all_vaults()?,
    };
    let now = state.program.now();
    Ok(Json(
        vaults
            .into_iter()
            .map(|(address, record)| VaultView::new(address, record, now))
            .collect(),
    ))
}

/// `GET /vaults/:address`
async fn vault_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<VaultView>, ApiError> {
    let address = parse_pubkey(&address)?;
    match state.program.vault(&address)? {
        Some(record) => Ok(Json(VaultView::new(address, record, state.program.now()))),
        None => Err(VaultError::VaultDoesNotExist.into()),
    }
}

/// `GET /derive/:owner/:id`
async fn derive_handler(
    State(state): State<AppState>,
    Path((owner, id)): Path<(String, String)>,
) -> Result<Json<DeriveResponse>, ApiError> {
    let owner = parse_pubkey(&owner)?;
    let (address, bump) = state.program.derive_vault_address(&owner, &id)?;
    let live = state.program.vault(&address)?.is_some();
    Ok(Json(DeriveResponse {
        address,
        bump,
        live,
    }))
}

/// `GET /accounts/:address`. Unknown addresses report zero lamports.
async fn account_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let address = parse_pubkey(&address)?;
    let account = state
        .program
        .ledger()
        .get_account(&address)
        .map_err(VaultError::from)?;

    Ok(Json(match account {
        Some(account) => AccountResponse {
            address,
            lamports: account.lamports,
            owner: Some(account.owner),
            owner_name: program_name(&account.owner).map(str::to_string),
            data_len: account.data.len(),
        },
        None => AccountResponse {
            address,
            lamports: 0,
            owner: None,
            owner_name: None,
            data_len: 0,
        },
    }))
}

/// `GET /next-id`
async fn next_id_handler(State(state): State<AppState>) -> Result<Json<NextIdResponse>, ApiError> {
    Ok(Json(NextIdResponse {
        next_id: state.program.next_vault_id()?,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
