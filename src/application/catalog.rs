//! The upstream catalog source the cache is rebuilt from.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::products::ProductRecord;

/// Which upstream walk a rebuild performs.
///
/// A scoped rebuild still fully replaces the cached collection; scope only
/// narrows what the collection then holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WarmScope {
    /// Walk the entire product catalog.
    #[default]
    Full,
    /// Walk only the products of one category.
    Category(String),
}

impl WarmScope {
    /// Parse the wire form: `full` or `category:<slug>`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "full" {
            return Some(Self::Full);
        }
        let slug = raw.strip_prefix("category:")?;
        (!slug.is_empty()).then(|| Self::Category(slug.to_string()))
    }
}

impl fmt::Display for WarmScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarmScope::Full => f.write_str("full"),
            WarmScope::Category(slug) => write!(f, "category:{slug}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("catalog request failed: {0}")]
    Transport(String),
    #[error("catalog response malformed: {0}")]
    Malformed(String),
}

/// The authoritative product source.
///
/// Implemented against the commerce backend's GraphQL API in production;
/// tests substitute canned catalogs.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_catalog(&self, scope: &WarmScope) -> Result<Vec<ProductRecord>, SourceError>;
}
