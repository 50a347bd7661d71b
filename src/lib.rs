//! Asynchronous Rust client for the Stateset API.
//!
//! The crate is organized around one request pipeline
//! ([`http::Requestor`]) that owns header defaults, bounded retries with
//! exponential backoff, and the mapping from HTTP statuses to the
//! [`Error`] taxonomy. The [`Stateset`] client wraps the pipeline and
//! hands out [`resource::Resource`] handles for the conventional REST
//! collections.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resource;

pub use client::Stateset;
pub use config::ClientConfig;
pub use error::{Error, ErrorDetails, Result};
pub use http::{Body, RequestOptions, ResponseBody, RetryConfig};
pub use resource::{PaginatedList, PaginationParams, Resource};
