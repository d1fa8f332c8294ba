//! Product records as cached and served by the storefront.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accessor for the identifier the cache indexes by.
///
/// The cache never interprets any other part of the payload, so a
/// differently-shaped record only has to expose its slug to be cacheable.
pub trait SlugKeyed {
    fn slug(&self) -> &str;
}

/// A product as it travels between the upstream source, the cache, and the
/// storefront.
///
/// Only `slug` is typed; every other field (price, title, images, ...)
/// rides along in `fields` untouched, so the upstream schema can evolve
/// without touching the cache subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub slug: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ProductRecord {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

impl SlugKeyed for ProductRecord {
    fn slug(&self) -> &str {
        &self.slug
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extra_fields_survive_a_serde_round_trip() {
        let record = ProductRecord::new("red-ball")
            .with_field("title", json!("Red Ball"))
            .with_field("price", json!("9.95"));

        let raw = serde_json::to_string(&record).expect("record serializes");
        let parsed: ProductRecord = serde_json::from_str(&raw).expect("record parses");

        assert_eq!(parsed, record);
        assert_eq!(parsed.fields["price"], json!("9.95"));
    }

    #[test]
    fn unknown_upstream_fields_are_preserved() {
        let raw = r#"{"slug":"mug","stockStatus":"IN_STOCK","galleryImages":[]}"#;
        let parsed: ProductRecord = serde_json::from_str(raw).expect("record parses");

        assert_eq!(parsed.slug, "mug");
        assert_eq!(parsed.fields["stockStatus"], json!("IN_STOCK"));
    }

    #[test]
    fn slug_accessor_matches_field() {
        let record = ProductRecord::new("blue-cap");
        assert_eq!(record.slug(), "blue-cap");
    }
}
