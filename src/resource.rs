//! Thin generic resource layer over the request pipeline.
//!
//! Every Stateset resource is a conventional REST collection; this module
//! provides the shared list/get/create/update/delete operations and the
//! pagination envelope. Resource-specific business calls go through
//! [`Stateset::request`](crate::Stateset::request) directly.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::http::{Execute, RequestOptions};

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort_by: Option<String>,
    /// Only sent when `sort_by` is also set.
    pub sort_order: Option<String>,
}

/// One page of a list response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaginatedList<T = Value> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "one")]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default = "one")]
    pub total_pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

fn one() -> u32 {
    1
}

/// Handle to one REST collection, e.g. `orders`.
#[derive(Clone)]
pub struct Resource {
    transport: Arc<dyn Execute>,
    base_path: String,
}

impl Resource {
    pub fn new(transport: Arc<dyn Execute>, base_path: impl Into<String>) -> Self {
        Self {
            transport,
            base_path: base_path.into().trim_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Lists the collection with pagination.
    pub async fn list(&self, params: &PaginationParams) -> Result<PaginatedList> {
        let mut query: Vec<(String, String)> = Vec::new();
        if let Some(page) = params.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(per_page) = params.per_page {
            query.push(("per_page".to_string(), per_page.to_string()));
        }
        if let Some(sort_by) = &params.sort_by {
            query.push(("sort_by".to_string(), sort_by.clone()));
            if let Some(sort_order) = &params.sort_order {
                query.push(("sort_order".to_string(), sort_order.clone()));
            }
        }

        let body = self
            .transport
            .execute(Method::GET, &self.base_path, RequestOptions::new().params(query))
            .await?;
        body.json()
    }

    /// Retrieves a single item by id.
    pub async fn get(&self, id: &str) -> Result<Value> {
        let body = self
            .transport
            .execute(Method::GET, &self.item_path(id), RequestOptions::new())
            .await?;
        body.json()
    }

    /// Creates a new item from a JSON body.
    pub async fn create(&self, data: Value) -> Result<Value> {
        let body = self
            .transport
            .execute(Method::POST, &self.base_path, RequestOptions::new().json(data))
            .await?;
        body.json()
    }

    /// Replaces an existing item.
    pub async fn update(&self, id: &str, data: Value) -> Result<Value> {
        let body = self
            .transport
            .execute(Method::PUT, &self.item_path(id), RequestOptions::new().json(data))
            .await?;
        body.json()
    }

    /// Deletes an item. 200, 202, and 204 responses all count as success.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.transport
            .execute(
                Method::DELETE,
                &self.item_path(id),
                RequestOptions::new().expected(&[200, 202, 204]),
            )
            .await?;
        Ok(())
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, id)
    }
}
