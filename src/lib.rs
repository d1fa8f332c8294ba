//! Storefront product cache service.
//!
//! Holds a full product collection keyed by slug in a pluggable key/value
//! store, gates reads behind a whole-collection staleness threshold, and
//! rebuilds the collection from an upstream GraphQL commerce backend.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
