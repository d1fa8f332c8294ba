//! The product cache subsystem.
//!
//! A full-replace writer commits the product collection plus a write
//! timestamp to a pluggable key/value store; the lookup path scans the
//! collection by slug and refuses to serve it once it ages past the
//! staleness threshold.

pub mod clock;
pub mod config;
pub mod keys;
pub mod lookup;
pub mod store;
pub mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use keys::CacheSlot;
pub use lookup::{CollectionLookup, Lookup};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use writer::{CollectionWriter, WriteError, WriteReceipt};
