//! Wire models for the storefront API.
//!
//! Every response carries an explicit `success` tag; cache-miss outcomes
//! reuse the failure body shape but are not HTTP errors.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::products::ProductRecord;

#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub success: bool,
    pub error: String,
}

impl FailureBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LookupBody {
    pub success: bool,
    pub product: ProductRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildBody {
    pub success: bool,
    /// Epoch milliseconds of the committed write.
    pub timestamp: i64,
    pub products_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmBody {
    pub success: bool,
    pub message: String,
    pub process_id: Uuid,
}
