//! High-level asynchronous client for the Stateset API.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{Body, RequestOptions, Requestor, ResponseBody};
use crate::resource::Resource;

/// Entry point for the SDK. Owns one pooled transport shared by every
/// resource handle; cloning is cheap and clones share the pool.
///
/// ```no_run
/// use stateset::{ClientConfig, Stateset};
///
/// # async fn run() -> stateset::Result<()> {
/// let client = Stateset::new(ClientConfig::new("sk_test_123"))?;
/// let order = client.orders().get("ord_1").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Stateset {
    requestor: Arc<Requestor>,
}

impl Stateset {
    /// Builds a client. Fails synchronously, before any network activity,
    /// when the configured API key is empty.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            requestor: Arc::new(Requestor::new(&config)?),
        })
    }

    /// Shorthand for [`Stateset::new`] with an otherwise-default config.
    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(api_key))
    }

    /// Executes a raw API request. Resource handles cover the conventional
    /// CRUD paths; this is the escape hatch for everything else, e.g.
    /// `POST orders/{id}/cancel`.
    #[tracing::instrument(skip(self, options), fields(method = %method, path = path))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        self.requestor.request(method, path, options).await
    }

    /// Raw request taking an ambiguous body value, inferring whether to
    /// send it as JSON or form-encoded pairs.
    pub async fn request_with_data(
        &self,
        method: Method,
        path: &str,
        data: Value,
    ) -> Result<ResponseBody> {
        self.request(method, path, RequestOptions::new().body(Body::infer(data)))
            .await
    }

    /// Handle for an arbitrary REST collection under `base_path`.
    pub fn resource(&self, base_path: &str) -> Resource {
        Resource::new(self.requestor.clone(), base_path)
    }

    pub fn orders(&self) -> Resource {
        self.resource("orders")
    }

    pub fn returns(&self) -> Resource {
        self.resource("returns")
    }

    pub fn inventory(&self) -> Resource {
        self.resource("inventory")
    }

    pub fn workflows(&self) -> Resource {
        self.resource("workflows")
    }

    pub fn warranties(&self) -> Resource {
        self.resource("warranties")
    }

    pub fn shipments(&self) -> Resource {
        self.resource("shipments")
    }

    pub fn purchase_orders(&self) -> Resource {
        self.resource("purchase-orders")
    }
}
