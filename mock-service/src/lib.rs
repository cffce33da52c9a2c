//! In-process account creation service for exercising the load generator.
use axum::{
    body::Bytes,
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::{num::NonZeroU32, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Default)]
pub struct Accounts {
    next_id: AtomicU64,
    usernames: Mutex<Vec<String>>,
    limiters: RwLock<HashMap<u32, Arc<DefaultDirectRateLimiter>>>,
}

impl Accounts {
    /// Every username accepted so far, in arrival order.
    pub fn usernames(&self) -> Vec<String> {
        self.usernames.lock().unwrap().clone()
    }

    pub fn created(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    fn limiter(&self, max_tps: u32) -> Arc<DefaultDirectRateLimiter> {
        if let Some(limiter) = self.limiters.read().unwrap().get(&max_tps) {
            return limiter.clone();
        }

        self.limiters
            .write()
            .unwrap()
            .entry(max_tps)
            .or_insert_with(|| Arc::new(rate_limiter(max_tps)))
            .clone()
    }
}

#[derive(Deserialize)]
struct CreateAccount {
    username: Option<String>,
}

type Response = (StatusCode, Json<serde_json::Value>);

pub fn router(accounts: Arc<Accounts>) -> Router {
    Router::new()
        .route("/api/accounts", post(create))
        .route("/throttled/:max_tps/api/accounts", post(throttled))
        .route("/delay/ms/:delay_ms/api/accounts", post(delayed))
        .layer(TraceLayer::new_for_http())
        .with_state(accounts)
}

/// A running service on an ephemeral local port.
pub struct MockService {
    pub addr: SocketAddr,
    pub accounts: Arc<Accounts>,
}

impl MockService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

pub async fn spawn() -> anyhow::Result<MockService> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let accounts = Arc::new(Accounts::default());

    let app = router(accounts.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });

    Ok(MockService { addr, accounts })
}

#[debug_handler]
async fn create(State(accounts): State<Arc<Accounts>>, body: Bytes) -> Response {
    create_account(&accounts, &body)
}

#[debug_handler]
async fn throttled(
    State(accounts): State<Arc<Accounts>>,
    Path(max_tps): Path<u32>,
    body: Bytes,
) -> Response {
    match accounts.limiter(max_tps).check() {
        Ok(_) => create_account(&accounts, &body),
        Err(_) => {
            debug!("Throttling request");
            counter!("mock-service.throttled").increment(1);
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Rate exceeded" })),
            )
        }
    }
}

#[debug_handler]
async fn delayed(
    State(accounts): State<Arc<Accounts>>,
    Path(delay_ms): Path<u64>,
    body: Bytes,
) -> Response {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    create_account(&accounts, &body)
}

fn create_account(accounts: &Accounts, body: &[u8]) -> Response {
    let username = serde_json::from_slice::<CreateAccount>(body)
        .ok()
        .and_then(|req| req.username)
        .filter(|name| !name.is_empty());

    let Some(username) = username else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Username is required" })),
        );
    };

    counter!("mock-service.accounts").increment(1);
    let id = accounts.next_id.fetch_add(1, Ordering::Relaxed);
    accounts.usernames.lock().unwrap().push(username.clone());

    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "username": username })),
    )
}

/** Utils **/

pub fn rate_limiter(tps: u32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(
        NonZeroU32::new(tps).unwrap_or(NonZeroU32::MIN),
    ))
}

/** TPS Printer **/

pub async fn tps_measure_task(accounts: Arc<Accounts>) {
    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let created = accounts.created();
        println!("{} accounts/sec", created - last);
        last = created;
    }
}
