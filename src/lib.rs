//! `resilient-fetch` executes single HTTP requests with a per-attempt
//! timeout, jittered exponential retry and a response transformer pipeline.
//!
//! Configure a request with [`FetchBuilder`], freeze it with
//! [`FetchBuilder::build`] and run it with:
//! - [`FetchClient::execute`] for a typed result
//! - [`FetchClient::execute_value`] for the untyped payload
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use resilient_fetch::{FetchBuilder, RetryPolicy};
//!
//! # async fn run() -> resilient_fetch::Result<()> {
//! let client = FetchBuilder::json_api("https://api.example.com")
//!     .path("/users")
//!     .query([("page", 1), ("limit", 10)])
//!     .retry(RetryPolicy::default().initial_delay(Duration::from_millis(50)))
//!     .build()?;
//!
//! let users: Vec<serde_json::Value> = client.execute().await?;
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

mod builder;
mod client;
mod config;
mod decode;
mod error;
mod options;
mod params;
mod response;
mod retry;
pub mod transform;
mod value;

pub use builder::{FetchBuilder, DEFAULT_JSON_TIMEOUT};
pub use client::FetchClient;
pub use config::{Method, RequestConfig};
pub use error::{BoxError, FetchError};
pub use options::RequestOptions;
pub use params::QueryParams;
pub use response::RawResponse;
pub use retry::{RetryObserver, RetryOptions, RetryPolicy, DEFAULT_RETRYABLE_STATUSES};
pub use transform::Transformer;
pub use value::QueryValue;

pub type Result<T> = std::result::Result<T, FetchError>;
