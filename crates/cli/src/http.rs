//! The five routes from spec §6's "Counter — HTTP (minimal surface)".

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use counter_core::Counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub counter: Arc<Counter>,
    pub reset_token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/counters", get(get_multiple))
        .route("/counters/:name", get(get_one))
        .route("/counters/:name/increment", post(increment))
        .route("/counters/:name/decrement", post(decrement))
        .route("/counters/:name/reset", post(reset))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IncrementBody {
    pub delta: i64,
    #[serde(rename = "actorId")]
    pub actor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecrementBody {
    pub delta: i64,
}

#[derive(Debug, Serialize)]
pub struct ValueBody {
    pub value: i64,
}

async fn increment(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<IncrementBody>,
) -> Response {
    match state.counter.increment(&name, body.delta, body.actor_id.as_deref()).await {
        Ok(outcome) if outcome.deduped => {
            (StatusCode::CONFLICT, Json(ValueBody { value: outcome.value })).into_response()
        }
        Ok(outcome) => (StatusCode::OK, Json(ValueBody { value: outcome.value })).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn decrement(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<DecrementBody>,
) -> Response {
    match state.counter.decrement(&name, body.delta).await {
        Ok(outcome) => (StatusCode::OK, Json(ValueBody { value: outcome.value })).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// Privileged: requires the `X-Reset-Token` header to match the
/// credential configured from the environment (spec §6). With no
/// credential configured the endpoint is disabled outright rather than
/// silently accepting any request.
async fn reset(State(state): State<AppState>, Path(name): Path<String>, headers: HeaderMap) -> Response {
    let Some(expected) = state.reset_token.as_deref() else {
        warn!("reset endpoint called with no credential configured, refusing");
        return (StatusCode::FORBIDDEN, Json(ValueBody { value: 0 })).into_response();
    };
    let provided = headers.get("x-reset-token").and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        return (StatusCode::FORBIDDEN, Json(ValueBody { value: 0 })).into_response();
    }
    match state.counter.reset(&name).await {
        Ok(()) => (StatusCode::OK, Json(ValueBody { value: 0 })).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn get_one(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.counter.get_value(&name).await {
        Ok(value) => (StatusCode::OK, Json(ValueBody { value })).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct NamesQuery {
    pub names: String,
}

async fn get_multiple(State(state): State<AppState>, Query(query): Query<NamesQuery>) -> Response {
    let names: Vec<String> = query
        .names
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    match state.counter.get_multiple(&names).await {
        Ok(values) => {
            let body: HashMap<String, i64> = values.into_iter().collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use counter_core::testing::{FakeAtomicStore, FakeDurableStore};
    use counter_core::{Counter, CounterConfig};

    fn state_with_token(reset_token: Option<&str>) -> AppState {
        let counter = Counter::new(FakeAtomicStore::new(), FakeDurableStore::new(), CounterConfig::default());
        AppState { counter, reset_token: reset_token.map(str::to_string) }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn increment_then_get_round_trips_value() {
        let state = state_with_token(None);
        let response = increment(
            State(state.clone()),
            Path("hits".to_string()),
            Json(IncrementBody { delta: 3, actor_id: None }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"value": 3}));

        let response = get_one(State(state.clone()), Path("hits".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"value": 3}));
    }

    #[tokio::test]
    async fn repeated_actor_increment_returns_409_without_changing_value() {
        let state = state_with_token(None);
        let body = || Json(IncrementBody { delta: 1, actor_id: Some("u1".to_string()) });

        let first = increment(State(state.clone()), Path("dau".to_string()), body()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let repeat = increment(State(state.clone()), Path("dau".to_string()), body()).await;
        assert_eq!(repeat.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(repeat).await, serde_json::json!({"value": 1}));
    }

    #[tokio::test]
    async fn reset_without_configured_token_is_forbidden() {
        let state = state_with_token(None);
        let response = reset(State(state), Path("hits".to_string()), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reset_with_wrong_token_is_forbidden() {
        let state = state_with_token(Some("secret"));
        let mut headers = HeaderMap::new();
        headers.insert("x-reset-token", "wrong".parse().unwrap());
        let response = reset(State(state), Path("hits".to_string()), headers).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reset_with_correct_token_zeroes_the_counter() {
        let state = state_with_token(Some("secret"));
        let _ = increment(
            State(state.clone()),
            Path("hits".to_string()),
            Json(IncrementBody { delta: 5, actor_id: None }),
        )
        .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-reset-token", "secret".parse().unwrap());
        let response = reset(State(state.clone()), Path("hits".to_string()), headers).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_one(State(state), Path("hits".to_string())).await;
        assert_eq!(body_json(response).await, serde_json::json!({"value": 0}));
    }

    #[tokio::test]
    async fn get_multiple_parses_comma_separated_names() {
        let state = state_with_token(None);
        let _ = increment(
            State(state.clone()),
            Path("a".to_string()),
            Json(IncrementBody { delta: 1, actor_id: None }),
        )
        .await;
        let _ = increment(
            State(state.clone()),
            Path("b".to_string()),
            Json(IncrementBody { delta: 2, actor_id: None }),
        )
        .await;

        let response = get_multiple(State(state), Query(NamesQuery { names: "a, b, c".to_string() })).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"a": 1, "b": 2, "c": 0}));
    }
}
