//! GraphQL-backed product source (wp-graphql / WooCommerce).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::application::catalog::{ProductSource, SourceError, WarmScope};
use crate::domain::products::ProductRecord;

const PRODUCTS_QUERY: &str = r#"
query StorefrontProducts($first: Int!, $after: String, $category: String) {
  products(first: $first, after: $after, where: { category: $category }) {
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      slug
      name
      onSale
      image {
        sourceUrl
        altText
      }
      ... on SimpleProduct {
        price
        regularPrice
      }
      ... on VariableProduct {
        price
        regularPrice
      }
    }
  }
}
"#;

/// Walks the backend's paginated product connection and flattens it into
/// the opaque records the cache stores.
pub struct GraphQlProductSource {
    client: reqwest::Client,
    endpoint: Url,
    page_size: u32,
}

impl GraphQlProductSource {
    pub fn new(endpoint: Url, page_size: u32, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SourceError::Transport(format!("failed to build client: {err}")))?;

        Ok(Self {
            client,
            endpoint,
            page_size,
        })
    }

    async fn fetch_page(
        &self,
        after: Option<&str>,
        category: Option<&str>,
    ) -> Result<Value, SourceError> {
        let body = json!({
            "query": PRODUCTS_QUERY,
            "variables": {
                "first": self.page_size,
                "after": after,
                "category": category,
            },
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Transport(format!(
                "endpoint returned {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| SourceError::Malformed(format!("response is not JSON: {err}")))?;

        if let Some(errors) = payload
            .get("errors")
            .and_then(Value::as_array)
            .filter(|errors| !errors.is_empty())
        {
            return Err(SourceError::Malformed(format!(
                "graphql errors: {}",
                Value::Array(errors.clone())
            )));
        }

        Ok(payload)
    }
}

#[async_trait]
impl ProductSource for GraphQlProductSource {
    async fn fetch_catalog(&self, scope: &WarmScope) -> Result<Vec<ProductRecord>, SourceError> {
        let category = match scope {
            WarmScope::Full => None,
            WarmScope::Category(slug) => Some(slug.as_str()),
        };

        let mut products = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let payload = self.fetch_page(after.as_deref(), category).await?;
            let connection = payload
                .pointer("/data/products")
                .ok_or_else(|| SourceError::Malformed("missing data.products".to_string()))?;

            let nodes = connection
                .get("nodes")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    SourceError::Malformed("products.nodes is not an array".to_string())
                })?;
            for node in nodes {
                products.push(product_from_node(node)?);
            }

            let page_info = connection.get("pageInfo");
            let has_next = page_info
                .and_then(|info| info.get("hasNextPage"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !has_next {
                break;
            }

            // hasNextPage without a cursor would loop on the same page.
            match page_info
                .and_then(|info| info.get("endCursor"))
                .and_then(Value::as_str)
            {
                Some(cursor) => after = Some(cursor.to_string()),
                None => {
                    return Err(SourceError::Malformed(
                        "hasNextPage set without an endCursor".to_string(),
                    ));
                }
            }

            debug!(
                target = "shopfront::graphql",
                fetched = products.len(),
                "continuing product page walk"
            );
        }

        Ok(products)
    }
}

fn product_from_node(node: &Value) -> Result<ProductRecord, SourceError> {
    let object = node
        .as_object()
        .ok_or_else(|| SourceError::Malformed("product node is not an object".to_string()))?;

    let slug = object
        .get("slug")
        .and_then(Value::as_str)
        .filter(|slug| !slug.is_empty())
        .ok_or_else(|| SourceError::Malformed("product node missing slug".to_string()))?
        .to_string();

    let mut fields = object.clone();
    fields.remove("slug");

    Ok(ProductRecord { slug, fields })
}
