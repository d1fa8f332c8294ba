use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::application::catalog::WarmScope;
use crate::cache::{Lookup, WriteError};
use crate::domain::products::ProductRecord;

use super::ApiState;
use super::error::ApiError;
use super::models::{FailureBody, LookupBody, RebuildBody, WarmBody};

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `GET /api/v1/products/{slug}`
///
/// Misses (empty cache, unknown slug, stale collection) are expected
/// outcomes and answer 200 with `success: false`; callers fall back to
/// the authoritative source for all of them.
pub async fn lookup_product(State(state): State<ApiState>, Path(slug): Path<String>) -> Response {
    let slug = slug.trim();
    if slug.is_empty() {
        return ApiError::bad_request("slug must be a non-empty string").into_response();
    }

    match state.lookup.find(slug).await {
        Ok(Lookup::Hit(product)) => Json(LookupBody {
            success: true,
            product,
        })
        .into_response(),
        Ok(miss) => {
            let reason = miss.miss_reason().unwrap_or("cache miss");
            Json(FailureBody::new(reason)).into_response()
        }
        Err(err) => {
            warn!(
                target = "shopfront::api",
                error = %err,
                "lookup failed against backing store"
            );
            ApiError::storage("backing store unavailable").into_response()
        }
    }
}

/// `POST /api/v1/cache/products`
///
/// Synchronous full replacement with a caller-supplied product list.
pub async fn rebuild_products(State(state): State<ApiState>, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorize(&state, &body) {
        return response;
    }

    let Some(raw_products) = body.get("products") else {
        return ApiError::bad_request("request must carry a `products` array").into_response();
    };
    let products: Vec<ProductRecord> = match serde_json::from_value(raw_products.clone()) {
        Ok(products) => products,
        Err(err) => {
            return ApiError::bad_request(format!("malformed product list: {err}"))
                .into_response();
        }
    };

    match state.writer.replace(&products).await {
        Ok(receipt) => Json(RebuildBody {
            success: true,
            timestamp: receipt.written_at_ms,
            products_count: receipt.products_count,
        })
        .into_response(),
        Err(WriteError::EmptyCatalog) => {
            ApiError::bad_request("product list must not be empty").into_response()
        }
        Err(err @ WriteError::Serialize(_)) => {
            warn!(target = "shopfront::api", error = %err, "rebuild failed to serialize");
            ApiError::storage("failed to serialize product collection").into_response()
        }
        Err(err @ WriteError::Store(_)) => {
            warn!(target = "shopfront::api", error = %err, "rebuild failed against backing store");
            ApiError::storage("backing store unavailable").into_response()
        }
    }
}

/// `POST /api/v1/cache/warm`
///
/// Fire-and-forget: the rebuild is spawned, not awaited, so the response
/// latency is independent of catalog size. Its outcome is observable only
/// through stored state and logs.
pub async fn trigger_warm(State(state): State<ApiState>, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorize(&state, &body) {
        return response;
    }

    let scope = match body.get("scope").and_then(Value::as_str) {
        None => WarmScope::default(),
        Some(raw) => match WarmScope::parse(raw) {
            Some(scope) => scope,
            None => {
                return ApiError::bad_request("scope must be `full` or `category:<slug>`")
                    .into_response();
            }
        },
    };

    let ticket = state.warmer.spawn(scope.clone());

    (
        StatusCode::ACCEPTED,
        Json(WarmBody {
            success: true,
            message: format!("catalog warm accepted for scope `{scope}`"),
            process_id: ticket.process_id,
        }),
    )
        .into_response()
}

/// Compare the presented secret against the configured one in constant
/// time. A missing secret compares as the empty string and fails.
fn authorize(state: &ApiState, body: &Value) -> Result<(), Response> {
    let presented = body.get("secret").and_then(Value::as_str).unwrap_or("");
    let authorized: bool = presented
        .as_bytes()
        .ct_eq(state.rebuild_secret.as_bytes())
        .into();

    if authorized {
        Ok(())
    } else {
        Err(ApiError::unauthorized().into_response())
    }
}
