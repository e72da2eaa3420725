// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # REST API
//!
//! Builds the axum router that exposes the vault over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                          |
//! |--------|--------------------------|--------------------------------------|
//! | GET    | `/health`                | Liveness check                       |
//! | GET    | `/vault`                 | Capacity, totals, counters, pools    |
//! | GET    | `/accounts/:id`          | Vault balance and token holdings     |
//! | GET    | `/quote?asset=&amount=`  | Preview a deposit                    |
//! | POST   | `/deposit`               | Deposit any routable asset           |
//! | POST   | `/withdraw`              | Withdraw the settlement asset        |
//! | POST   | `/faucet`                | Mint devnet tokens                   |
//!
//! Vault calls are synchronous and may block on the reentrancy gate, so
//! they run on the blocking pool.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use capvault_contracts::Pool;
use capvault_protocol::vault::VaultStats;
use capvault_protocol::{AccountId, Amount, AssetId, VaultError};

use crate::devnet::Devnet;
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network identifier (e.g., "devnet").
    pub network: String,
    /// The vault and its collaborators.
    pub devnet: Arc<Devnet>,
    /// Reference to Prometheus metrics for in-handler recording.
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
        .route("/vault", get(vault_handler))
        .route("/accounts/:id", get(account_handler))
        .route("/quote", get(quote_handler))
        .route("/deposit", post(deposit_handler))
        .route("/withdraw", post(withdraw_handler))
        .route("/faucet", post(faucet_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response body for `/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub network: String,
}

/// Response body for `/vault`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultResponse {
    pub settlement_asset: AssetId,
    pub conversion_service: String,
    pub capacity_limit: Amount,
    pub total_balance: Amount,
    pub remaining_capacity: Amount,
    pub locked: bool,
    pub stats: VaultStats,
    pub pools: Vec<Pool>,
    /// Largest single faucet mint.
    pub faucet_limit: Amount,
    pub timestamp: String,
}

/// Response body for `/accounts/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: AccountId,
    pub settlement_balance: Amount,
    pub deposits: u64,
    pub withdrawals: u64,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    /// Token ledger balances, keyed by asset.
    pub holdings: BTreeMap<AssetId, Amount>,
}

/// Query string for `/quote`.
#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub asset: AssetId,
    /// Query strings don't carry 128-bit integers.
    pub amount: u64,
}

/// Request body for `/deposit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    pub account: AccountId,
    pub asset: AssetId,
    pub amount: Amount,
    /// Optional caller floor on the credited output.
    #[serde(default)]
    pub min_output: Amount,
}

/// Request body for `/withdraw`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub account: AccountId,
    pub amount: Amount,
}

/// Request body for `/faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetRequest {
    pub account: AccountId,
    pub asset: AssetId,
    pub amount: Amount,
}

/// Response body for `/faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetResponse {
    pub account: AccountId,
    pub asset: AssetId,
    pub balance: Amount,
}

/// Generic error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// The vault refused the operation.
    Vault(VaultError),
    /// The request itself was unacceptable.
    BadRequest(String),
    /// Something broke on our side.
    Internal(String),
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        ApiError::Vault(err)
    }
}

/// HTTP status for a vault refusal.
fn vault_error_status(err: &VaultError) -> StatusCode {
    match err {
        VaultError::ZeroAmount
        | VaultError::ZeroAddress { .. }
        | VaultError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        VaultError::NoRouteFound { .. } => StatusCode::NOT_FOUND,
        VaultError::Unauthorized(_) => StatusCode::FORBIDDEN,
        VaultError::Reentrancy => StatusCode::CONFLICT,
        VaultError::Overflow { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        VaultError::CapacityExceeded { .. }
        | VaultError::InsufficientBalance { .. }
        | VaultError::TransferFailed { .. }
        | VaultError::SlippageViolated { .. }
        | VaultError::DeadlineExpired { .. }
        | VaultError::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Vault(err) => (
                vault_error_status(&err),
                ErrorResponse {
                    error: err.to_string(),
                    kind: err.kind().into(),
                },
            ),
            ApiError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error,
                    kind: "bad_request".into(),
                },
            ),
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error,
                    kind: "internal".into(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Runs `op` on the blocking pool.
async fn blocking<T: Send + 'static>(
    op: impl FnOnce() -> Result<T, ApiError> + Send + 'static,
) -> Result<T, ApiError> {
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::Internal(format!("worker failed: {}", e)))?
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: state.version.clone(),
        network: state.network.clone(),
    })
}

/// `GET /vault`: vault-wide figures and the exchange's pools.
async fn vault_handler(State(state): State<AppState>) -> impl IntoResponse {
    let vault = &state.devnet.vault;
    let mut pools = state.devnet.amm.pools();
    pools.sort_by(|a, b| (&a.asset_a, &a.asset_b).cmp(&(&b.asset_a, &b.asset_b)));

    Json(VaultResponse {
        settlement_asset: vault.settlement_asset().clone(),
        conversion_service: vault.conversion_service().to_string(),
        capacity_limit: vault.capacity_limit(),
        total_balance: vault.total_vault_balance(),
        remaining_capacity: vault.remaining_capacity(),
        locked: vault.is_locked(),
        stats: vault.vault_stats(),
        pools,
        faucet_limit: state.devnet.faucet_limit(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /accounts/:id`: vault balance, counters, and token holdings.
///
/// Unknown accounts get a zeroed response, not a 404.
async fn account_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let account = AccountId::new(id);
    let stats = state.devnet.vault.account_stats(&account).unwrap_or_default();
    let holdings = state
        .devnet
        .ledger
        .assets()
        .into_iter()
        .map(|asset| {
            let balance = state.devnet.ledger.balance_of(&asset, &account);
            (asset, balance)
        })
        .filter(|(_, balance)| *balance > 0)
        .collect();

    Json(AccountResponse {
        account,
        settlement_balance: stats.settlement_balance,
        deposits: stats.deposits,
        withdrawals: stats.withdrawals,
        total_deposited: stats.total_deposited,
        total_withdrawn: stats.total_withdrawn,
        holdings,
    })
}

/// `GET /quote?asset=&amount=`: what a deposit would credit right now.
async fn quote_handler(
    Query(params): Query<QuoteParams>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let devnet = Arc::clone(&state.devnet);

    // Quoting calls into the exchange, which takes its own locks.
    let preview = blocking(move || {
        devnet
            .vault
            .preview_deposit(&params.asset, Amount::from(params.amount))
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(preview))
}

/// `POST /deposit`: deposits on behalf of `account`.
async fn deposit_handler(
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let devnet = Arc::clone(&state.devnet);
    let metrics = Arc::clone(&state.metrics);

    let receipt = blocking(move || {
        let timer = metrics.deposit_latency_seconds.start_timer();
        let outcome = devnet.write(|vault| {
            vault.deposit_with_min_output(&req.account, &req.asset, req.amount, req.min_output)
        });
        timer.observe_duration();
        metrics.observe_vault(&devnet.vault);

        match outcome {
            Ok(receipt) => {
                metrics.deposits_total.inc();
                if receipt.converted {
                    metrics.conversions_total.inc();
                }
                Ok(receipt)
            }
            Err(err) => {
                metrics.record_rejection("deposit", err.kind());
                Err(ApiError::Vault(err))
            }
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// `POST /withdraw`: pays the settlement asset out to `account`.
async fn withdraw_handler(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let devnet = Arc::clone(&state.devnet);
    let metrics = Arc::clone(&state.metrics);

    let receipt = blocking(move || {
        let outcome = devnet.write(|vault| vault.withdraw(&req.account, req.amount));
        metrics.observe_vault(&devnet.vault);

        match outcome {
            Ok(receipt) => {
                metrics.withdrawals_total.inc();
                Ok(receipt)
            }
            Err(err) => {
                metrics.record_rejection("withdraw", err.kind());
                Err(ApiError::Vault(err))
            }
        }
    })
    .await?;

    Ok(Json(receipt))
}

/// `POST /faucet`: mints devnet tokens to `account`.
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let devnet = Arc::clone(&state.devnet);

    let balance = blocking(move || {
        devnet
            .faucet(&req.account, &req.asset, req.amount)
            .map(|balance| FaucetResponse {
                account: req.account.clone(),
                asset: req.asset.clone(),
                balance,
            })
            .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))
    })
    .await?;

    Ok(Json(balance))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
