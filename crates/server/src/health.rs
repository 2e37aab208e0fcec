use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use coindash_core::config::DeliveryMode;
use coindash_store::ScoreStore;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// How long a store check result is reused before the store is asked again.
pub const STORE_CHECK_TTL: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct HealthState {
    store: Arc<dyn ScoreStore>,
    delivery: DeliveryMode,
    ttl: Duration,
    last_store_check: Arc<Mutex<Option<(Instant, HealthCheck)>>>,
}

impl HealthState {
    pub fn new(store: Arc<dyn ScoreStore>, delivery: DeliveryMode) -> Self {
        Self::with_ttl(store, delivery, STORE_CHECK_TTL)
    }

    pub fn with_ttl(store: Arc<dyn ScoreStore>, delivery: DeliveryMode, ttl: Duration) -> Self {
        Self { store, delivery, ttl, last_store_check: Arc::new(Mutex::new(None)) }
    }

    /// The lock is held across the store read so concurrent requests share one query.
    async fn store_check(&self) -> HealthCheck {
        let mut last = self.last_store_check.lock().await;
        if let Some((checked_at, check)) = last.as_ref() {
            if checked_at.elapsed() < self.ttl {
                return check.clone();
            }
        }

        let check = store_check(self.store.as_ref()).await;
        *last = Some((Instant::now(), check.clone()));
        check
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub delivery_mode: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = state.store_check().await;
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        delivery_mode: state.delivery.as_str(),
        service: HealthCheck {
            status: "ready",
            detail: "coindash-server runtime initialized".to_string(),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(store: &dyn ScoreStore) -> HealthCheck {
    match store.fetch_top_scores(1).await {
        Ok(_) => HealthCheck {
            status: "ready",
            detail: format!("{} store query succeeded", store.backend()),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("{} store query failed: {error}", store.backend()),
        },
    }
}
