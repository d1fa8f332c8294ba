//! Catalog warming: fetch the full product list and commit it.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::cache::{CollectionWriter, WriteError, WriteReceipt};
use crate::domain::products::ProductRecord;

use super::catalog::{ProductSource, SourceError, WarmScope};

const METRIC_WARM_MS: &str = "shopfront_cache_warm_ms";

#[derive(Debug, Error)]
pub enum WarmError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Acknowledgment for a detached rebuild.
#[derive(Debug, Clone, Copy)]
pub struct WarmTicket {
    pub process_id: Uuid,
}

/// Rebuilds the cached collection from the authoritative source.
pub struct CatalogWarmer {
    source: Arc<dyn ProductSource>,
    writer: Arc<CollectionWriter<ProductRecord>>,
}

impl CatalogWarmer {
    pub fn new(source: Arc<dyn ProductSource>, writer: Arc<CollectionWriter<ProductRecord>>) -> Self {
        Self { source, writer }
    }

    /// Fetch the catalog for `scope` and commit it as the new collection.
    pub async fn warm(&self, scope: &WarmScope) -> Result<WriteReceipt, WarmError> {
        let started = Instant::now();

        let products = self.source.fetch_catalog(scope).await?;
        let receipt = self.writer.replace(&products).await?;

        histogram!(METRIC_WARM_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        info!(
            target = "shopfront::warm",
            scope = %scope,
            products = receipt.products_count,
            "catalog warm completed"
        );

        Ok(receipt)
    }

    /// Kick off a rebuild without waiting for it.
    ///
    /// The spawned task outlives the caller and is never cancelled by it;
    /// a failure is visible only in logs and in the stored collection
    /// staying as it was. No timeout bounds the upstream fetch here, so a
    /// hung source holds the task open.
    pub fn spawn(self: &Arc<Self>, scope: WarmScope) -> WarmTicket {
        let process_id = Uuid::new_v4();
        let warmer = Arc::clone(self);
        let task_scope = scope.clone();

        tokio::spawn(async move {
            if let Err(err) = warmer.warm(&task_scope).await {
                error!(
                    target = "shopfront::warm",
                    process_id = %process_id,
                    scope = %task_scope,
                    error = %err,
                    "detached catalog warm failed"
                );
            }
        });

        info!(
            target = "shopfront::warm",
            process_id = %process_id,
            scope = %scope,
            "catalog warm accepted"
        );

        WarmTicket { process_id }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use time::macros::datetime;

    use crate::cache::{
        CacheConfig, Clock, CollectionLookup, KeyValueStore, Lookup, ManualClock, MemoryStore,
    };

    use super::*;

    struct CannedSource {
        products: Vec<ProductRecord>,
        delay: Duration,
    }

    #[async_trait]
    impl ProductSource for CannedSource {
        async fn fetch_catalog(
            &self,
            _scope: &WarmScope,
        ) -> Result<Vec<ProductRecord>, SourceError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.products.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ProductSource for FailingSource {
        async fn fetch_catalog(
            &self,
            _scope: &WarmScope,
        ) -> Result<Vec<ProductRecord>, SourceError> {
            Err(SourceError::Transport("connection refused".to_string()))
        }
    }

    fn harness(
        source: Arc<dyn ProductSource>,
    ) -> (Arc<CatalogWarmer>, CollectionLookup<ProductRecord>) {
        let store = Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>;
        let clock = Arc::new(ManualClock::new(datetime!(2025-06-01 00:00 UTC))) as Arc<dyn Clock>;
        let writer = Arc::new(CollectionWriter::new(
            Arc::clone(&store),
            Arc::clone(&clock),
        ));
        let lookup = CollectionLookup::new(store, clock, CacheConfig::default());
        (Arc::new(CatalogWarmer::new(source, writer)), lookup)
    }

    #[tokio::test]
    async fn warm_commits_the_fetched_catalog() {
        let source = Arc::new(CannedSource {
            products: vec![ProductRecord::new("ball")],
            delay: Duration::ZERO,
        });
        let (warmer, lookup) = harness(source);

        let receipt = warmer.warm(&WarmScope::Full).await.expect("warm succeeds");
        assert_eq!(receipt.products_count, 1);

        assert!(matches!(lookup.find("ball").await.unwrap(), Lookup::Hit(_)));
    }

    #[tokio::test]
    async fn warm_surfaces_an_empty_upstream_catalog_as_an_error() {
        let source = Arc::new(CannedSource {
            products: Vec::new(),
            delay: Duration::ZERO,
        });
        let (warmer, lookup) = harness(source);

        let outcome = warmer.warm(&WarmScope::Full).await;
        assert!(matches!(
            outcome,
            Err(WarmError::Write(WriteError::EmptyCatalog))
        ));
        assert_eq!(lookup.find("ball").await.unwrap(), Lookup::Empty);
    }

    #[tokio::test]
    async fn spawn_returns_before_a_slow_fetch_finishes() {
        let source = Arc::new(CannedSource {
            products: vec![ProductRecord::new("ball")],
            delay: Duration::from_millis(200),
        });
        let (warmer, lookup) = harness(source);

        let ticket = warmer.spawn(WarmScope::Full);
        assert!(!ticket.process_id.is_nil());

        // The fetch is still sleeping; nothing committed yet.
        assert_eq!(lookup.find("ball").await.unwrap(), Lookup::Empty);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(matches!(lookup.find("ball").await.unwrap(), Lookup::Hit(_)));
    }

    #[tokio::test]
    async fn failed_detached_warm_leaves_stored_state_untouched() {
        let (warmer, lookup) = harness(Arc::new(FailingSource));

        warmer.spawn(WarmScope::Full);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(lookup.find("ball").await.unwrap(), Lookup::Empty);
    }
}
