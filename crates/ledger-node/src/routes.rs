use std::{sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, CancelFlag, Ledger, LedgerConfig, SearchControl, Transaction};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;

#[derive(Clone)]
pub(crate) struct AppState {
    ledger: Arc<Ledger>,
    mine_timeout: Option<Duration>,
}

impl AppState {
    pub(crate) fn new(ledger: Arc<Ledger>, mine_timeout: Option<Duration>) -> Self {
        Self {
            ledger,
            mine_timeout,
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Serialize)]
struct Head {
    height: u64,
    hash: String,
}

#[derive(Serialize)]
struct Validity {
    valid: bool,
    fault: Option<String>,
}

#[derive(Deserialize)]
struct TxIn {
    transaction: String,
}

#[derive(Serialize)]
struct TxAccepted {
    message: String,
    pending: usize,
}

#[derive(Serialize)]
struct Mined {
    message: String,
    block: Block,
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/chain", get(get_chain))
        .route("/chain/head", get(chain_head))
        .route("/chain/validate", get(validate_chain))
        .route("/mempool", get(mempool))
        .route("/transactions", post(submit_transaction))
        .route("/mine", get(mine).post(mine))
        .route("/config", get(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn get_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    let chain = state.ledger.chain();
    Json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

async fn chain_head(State(state): State<AppState>) -> Json<Head> {
    let tip = state.ledger.last_block();
    Json(Head {
        height: tip.index,
        hash: tip.hash,
    })
}

async fn validate_chain(State(state): State<AppState>) -> Json<Validity> {
    let fault = state.ledger.verify().err();
    Json(Validity {
        valid: fault.is_none(),
        fault: fault.map(|f| f.to_string()),
    })
}

async fn mempool(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.ledger.pending())
}

async fn config(State(state): State<AppState>) -> Json<LedgerConfig> {
    Json(state.ledger.config().clone())
}

async fn submit_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TxIn>, JsonRejection>,
) -> Result<Json<TxAccepted>, ApiError> {
    let Json(tx) =
        payload.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    let pending = state.ledger.add_transaction(tx.transaction);
    Ok(Json(TxAccepted {
        message: "Transaction added".to_string(),
        pending,
    }))
}

/// Cancels the proof search if the request future is dropped mid-mine.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// The configured timeout covers the search only; waiting for an in-flight
/// `/mine` to finish does not count against it.
async fn mine(State(state): State<AppState>) -> Result<Json<Mined>, ApiError> {
    let mut control = SearchControl::default();
    if let Some(timeout) = state.mine_timeout {
        control = control.with_timeout(timeout);
    }
    let _guard = CancelOnDrop(control.cancel_flag().clone());

    let ledger = Arc::clone(&state.ledger);
    let block = tokio::task::spawn_blocking(move || ledger.mine_until(&control))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))??;

    info!(index = block.index, txs = block.transactions.len(), "served /mine");
    Ok(Json(Mined {
        message: "Block Mined!".to_string(),
        block,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::IntoResponse,
    };
    use ledger_core::LedgerError;
    use serde_json::{json, Value};
    use tower::ServiceExt; // for oneshot

    fn app(difficulty: u32, mine_timeout: Option<Duration>) -> (Router, Arc<Ledger>) {
        let ledger =
            Arc::new(Ledger::new(LedgerConfig::with_difficulty(difficulty)).expect("config"));
        let router = build_router(AppState::new(Arc::clone(&ledger), mine_timeout));
        (router, ledger)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_endpoints() {
        let (app, _) = app(1, None);
        for uri in ["/health", "/healthz"] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "status": "ok" }));
        }
    }

    #[tokio::test]
    async fn submit_mine_and_read_chain() {
        let (app, ledger) = app(1, None);

        let (status, body) = send(
            &app,
            "POST",
            "/transactions",
            Some(json!({ "transaction": "A pays B 5" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Transaction added");
        assert_eq!(body["pending"], 1);

        let (_, pool) = send(&app, "GET", "/mempool", None).await;
        assert_eq!(pool, json!(["A pays B 5"]));

        let (status, body) = send(&app, "GET", "/mine", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Block Mined!");
        let block: Block = serde_json::from_value(body["block"].clone()).unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.transactions, vec![Transaction::from("A pays B 5")]);

        let (status, body) = send(&app, "GET", "/chain", None).await;
        assert_eq!(status, StatusCode::OK);
        let chain: ChainResponse = serde_json::from_value(body).unwrap();
        assert_eq!(chain.length, 2);
        assert_eq!(chain.chain, ledger.chain());
        assert_eq!(chain.chain[1].prev_hash, chain.chain[0].hash);
        // The wire form re-hashes to the stored digest.
        assert!(ledger_core::verify_chain(&chain.chain, ledger.config()).is_ok());

        let (_, head) = send(&app, "GET", "/chain/head", None).await;
        assert_eq!(head["height"], 1);
        assert_eq!(head["hash"], json!(block.hash));

        let (_, validity) = send(&app, "GET", "/chain/validate", None).await;
        assert_eq!(validity, json!({ "valid": true, "fault": null }));
    }

    #[tokio::test]
    async fn mine_accepts_post_and_empty_pool() {
        let (app, ledger) = app(1, None);
        let (status, body) = send(&app, "POST", "/mine", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["block"]["transactions"], json!([]));
        assert_eq!(ledger.height(), 1);
    }

    #[tokio::test]
    async fn malformed_transaction_is_rejected() {
        let (app, ledger) = app(1, None);

        let (status, body) = send(
            &app,
            "POST",
            "/transactions",
            Some(json!({ "tx": "wrong field" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));

        let req = Request::builder()
            .method("POST")
            .uri("/transactions")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert!(ledger.pending().is_empty());
    }

    #[tokio::test]
    async fn mine_timeout_maps_to_gateway_timeout() {
        // Difficulty 16 cannot be met before a zero-length deadline.
        let (app, ledger) = app(16, Some(Duration::ZERO));
        ledger.add_transaction("waiting");

        let (status, body) = send(&app, "GET", "/mine", None).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["error"].as_str().unwrap().contains("deadline"));
        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.pending(), vec![Transaction::from("waiting")]);
    }

    #[tokio::test]
    async fn config_endpoint_reports_difficulty() {
        let (app, _) = app(2, None);
        let (status, body) = send(&app, "GET", "/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["difficulty"], 2);
        assert_eq!(body["hash_algorithm"], "sha256");
    }

    #[tokio::test]
    async fn cancelled_search_maps_to_service_unavailable() {
        let response = ApiError::from(LedgerError::Cancelled { attempts: 0 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("cancelled"));
    }

    #[tokio::test]
    async fn dropped_mine_request_cancels_search() {
        // Difficulty 16 with no timeout: only the drop guard can stop it.
        let (app, ledger) = app(16, None);
        ledger.add_transaction("waiting");

        let req = Request::builder()
            .method("POST")
            .uri("/mine")
            .body(Body::empty())
            .unwrap();
        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), app.clone().oneshot(req)).await;
        assert!(abandoned.is_err(), "search at difficulty 16 finished early");

        // A follow-up search can only start once the abandoned one has let go
        // of the miner lock.
        let follow_up = Arc::clone(&ledger);
        let next = tokio::time::timeout(
            Duration::from_secs(5),
            tokio::task::spawn_blocking(move || {
                follow_up
                    .mine_until(&SearchControl::default().with_timeout(Duration::from_millis(20)))
            }),
        )
        .await
        .expect("miner lock was never released")
        .unwrap();
        assert!(matches!(next, Err(LedgerError::DeadlineExceeded { .. })));

        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.pending(), vec![Transaction::from("waiting")]);
    }
}
