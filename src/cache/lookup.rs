//! Lookup-by-slug over the cached collection.

use std::marker::PhantomData;
use std::sync::Arc;

use metrics::counter;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::products::SlugKeyed;

use super::clock::Clock;
use super::config::CacheConfig;
use super::keys::CacheSlot;
use super::store::{KeyValueStore, StoreError};
use super::writer::epoch_ms;

const METRIC_LOOKUP_HIT_TOTAL: &str = "shopfront_cache_lookup_hit_total";
const METRIC_LOOKUP_MISS_TOTAL: &str = "shopfront_cache_lookup_miss_total";
const METRIC_LOOKUP_STALE_TOTAL: &str = "shopfront_cache_lookup_stale_total";
const METRIC_LOOKUP_EMPTY_TOTAL: &str = "shopfront_cache_lookup_empty_total";

/// Outcome of a slug lookup.
///
/// The three miss variants are expected outcomes, not failures; callers
/// fall back to the authoritative source for all of them. Only a storage
/// failure is an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Record found and the collection is within the staleness threshold.
    Hit(T),
    /// No valid cached collection exists.
    Empty,
    /// The collection is valid but holds no record with this slug.
    NotFound,
    /// The record exists but the collection aged out; it is withheld.
    Stale,
}

impl<T> Lookup<T> {
    /// Human-readable reason for a miss, `None` on a hit.
    pub fn miss_reason(&self) -> Option<&'static str> {
        match self {
            Lookup::Hit(_) => None,
            Lookup::Empty => Some("no cached catalog"),
            Lookup::NotFound => Some("product not found in cache"),
            Lookup::Stale => Some("cached catalog is stale"),
        }
    }
}

/// Serves individual product lookups from the cached collection.
///
/// A record is only ever returned after both the existence check and the
/// whole-collection age check pass; there is no per-record freshness.
pub struct CollectionLookup<T> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    _payload: PhantomData<fn() -> T>,
}

impl<T> CollectionLookup<T>
where
    T: SlugKeyed + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            store,
            clock,
            config,
            _payload: PhantomData,
        }
    }

    /// Find the first record whose slug equals `slug` exactly
    /// (case-sensitive), refusing to serve a collection older than the
    /// staleness threshold or one whose timestamp is missing or torn.
    pub async fn find(&self, slug: &str) -> Result<Lookup<T>, StoreError> {
        let Some(raw) = self.store.get(CacheSlot::Collection.key()).await? else {
            counter!(METRIC_LOOKUP_EMPTY_TOTAL).increment(1);
            return Ok(Lookup::Empty);
        };

        // An undecodable collection is indistinguishable from no cache.
        let Ok(products) = serde_json::from_str::<Vec<T>>(&raw) else {
            counter!(METRIC_LOOKUP_EMPTY_TOTAL).increment(1);
            debug!(target = "shopfront::cache", "stored collection is not a product array");
            return Ok(Lookup::Empty);
        };

        let Some(record) = products.into_iter().find(|p| p.slug() == slug) else {
            counter!(METRIC_LOOKUP_MISS_TOTAL).increment(1);
            return Ok(Lookup::NotFound);
        };

        let written_at_ms = match self.store.get(CacheSlot::WrittenAt.key()).await? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ms) => ms,
                Err(_) => {
                    counter!(METRIC_LOOKUP_EMPTY_TOTAL).increment(1);
                    debug!(target = "shopfront::cache", "stored write timestamp is unparseable");
                    return Ok(Lookup::Empty);
                }
            },
            // A collection without a timestamp is a torn write; fail safe.
            None => {
                counter!(METRIC_LOOKUP_EMPTY_TOTAL).increment(1);
                return Ok(Lookup::Empty);
            }
        };

        let age_ms = epoch_ms(self.clock.now_utc()).saturating_sub(written_at_ms);
        let threshold_ms = self.config.staleness_threshold().as_millis() as i64;
        if age_ms >= threshold_ms {
            counter!(METRIC_LOOKUP_STALE_TOTAL).increment(1);
            debug!(
                target = "shopfront::cache",
                slug = %slug,
                age_ms,
                threshold_ms,
                "withholding stale collection"
            );
            return Ok(Lookup::Stale);
        }

        counter!(METRIC_LOOKUP_HIT_TOTAL).increment(1);
        Ok(Lookup::Hit(record))
    }
}
