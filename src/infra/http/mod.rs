pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::application::warm::CatalogWarmer;
use crate::cache::{CollectionLookup, CollectionWriter};
use crate::domain::products::ProductRecord;

/// Shared state for the storefront API surface.
#[derive(Clone)]
pub struct ApiState {
    pub lookup: Arc<CollectionLookup<ProductRecord>>,
    pub writer: Arc<CollectionWriter<ProductRecord>>,
    pub warmer: Arc<CatalogWarmer>,
    pub rebuild_secret: Arc<str>,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/api/v1/products/{slug}", get(handlers::lookup_product))
        .route("/api/v1/cache/products", post(handlers::rebuild_products))
        .route("/api/v1/cache/warm", post(handlers::trigger_warm))
        .with_state(state)
}
