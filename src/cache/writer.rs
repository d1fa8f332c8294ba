//! Full-replace commits of the product collection.

use std::marker::PhantomData;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::domain::products::SlugKeyed;

use super::clock::Clock;
use super::keys::CacheSlot;
use super::store::{KeyValueStore, StoreError};

const METRIC_REBUILD_TOTAL: &str = "shopfront_cache_rebuild_total";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("refusing to cache an empty product list")]
    EmptyCatalog,
    #[error("failed to serialize product collection: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Receipt for a completed full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Epoch milliseconds stamped into the timestamp slot.
    pub written_at_ms: i64,
    pub products_count: usize,
}

/// Commits a freshly fetched product list to the backing store.
///
/// A commit fully replaces the prior collection; there is no merge with
/// previous state. The timestamp slot is written immediately after the
/// collection slot without a transaction around the pair, so a crash in
/// between leaves a torn state the lookup path treats as no cache at all.
/// Concurrent writers are not excluded; the last full write wins per slot.
pub struct CollectionWriter<T> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> CollectionWriter<T>
where
    T: SlugKeyed + Serialize,
{
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            _payload: PhantomData,
        }
    }

    /// Replace the cached collection with `products` and stamp the write
    /// time.
    ///
    /// Storage failures surface to the caller; there is no retry at this
    /// layer. Re-invoking the rebuild is the retry.
    pub async fn replace(&self, products: &[T]) -> Result<WriteReceipt, WriteError> {
        if products.is_empty() {
            return Err(WriteError::EmptyCatalog);
        }

        let payload = serde_json::to_string(products)?;
        self.store.set(CacheSlot::Collection.key(), payload).await?;

        let written_at_ms = epoch_ms(self.clock.now_utc());
        self.store
            .set(CacheSlot::WrittenAt.key(), written_at_ms.to_string())
            .await?;

        counter!(METRIC_REBUILD_TOTAL).increment(1);
        info!(
            target = "shopfront::cache",
            products = products.len(),
            "product collection replaced"
        );

        Ok(WriteReceipt {
            written_at_ms,
            products_count: products.len(),
        })
    }
}

pub(crate) fn epoch_ms(moment: OffsetDateTime) -> i64 {
    (moment.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::cache::clock::ManualClock;
    use crate::cache::store::MemoryStore;
    use crate::domain::products::ProductRecord;

    use super::*;

    fn writer_at(
        moment: OffsetDateTime,
    ) -> (Arc<MemoryStore>, CollectionWriter<ProductRecord>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(moment));
        let writer = CollectionWriter::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            clock as Arc<dyn Clock>,
        );
        (store, writer)
    }

    #[tokio::test]
    async fn replace_writes_collection_then_timestamp() {
        let stamp = datetime!(2025-06-01 12:00 UTC);
        let (store, writer) = writer_at(stamp);

        let receipt = writer
            .replace(&[ProductRecord::new("ball"), ProductRecord::new("mug")])
            .await
            .expect("write succeeds");

        assert_eq!(receipt.products_count, 2);
        assert_eq!(receipt.written_at_ms, epoch_ms(stamp));

        let raw = store
            .get(CacheSlot::Collection.key())
            .await
            .unwrap()
            .expect("collection stored");
        let parsed: Vec<ProductRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);

        let stamp_raw = store
            .get(CacheSlot::WrittenAt.key())
            .await
            .unwrap()
            .expect("timestamp stored");
        assert_eq!(stamp_raw, epoch_ms(stamp).to_string());
    }

    #[tokio::test]
    async fn empty_list_is_rejected_without_touching_stored_state() {
        let (store, writer) = writer_at(datetime!(2025-06-01 12:00 UTC));

        writer
            .replace(&[ProductRecord::new("ball")])
            .await
            .expect("seed write succeeds");
        let before = store.get(CacheSlot::Collection.key()).await.unwrap();

        let outcome = writer.replace(&[]).await;
        assert!(matches!(outcome, Err(WriteError::EmptyCatalog)));

        let after = store.get(CacheSlot::Collection.key()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn later_write_fully_replaces_earlier_collection() {
        let (store, writer) = writer_at(datetime!(2025-06-01 12:00 UTC));

        writer
            .replace(&[ProductRecord::new("x")])
            .await
            .expect("write a");
        writer
            .replace(&[ProductRecord::new("y")])
            .await
            .expect("write b");

        let raw = store
            .get(CacheSlot::Collection.key())
            .await
            .unwrap()
            .expect("collection stored");
        let parsed: Vec<ProductRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].slug, "y");
    }
}
