//! Storage slot definitions.
//!
//! The persisted state is exactly two logical keys: the full product
//! collection and the timestamp of its last completed rebuild. There is no
//! schema versioning.

/// A well-known slot in the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSlot {
    /// The full product collection, serialized as a JSON array.
    Collection,
    /// Epoch milliseconds of the last completed rebuild.
    WrittenAt,
}

impl CacheSlot {
    pub fn key(self) -> &'static str {
        match self {
            CacheSlot::Collection => "products:collection",
            CacheSlot::WrittenAt => "products:written_at",
        }
    }
}
