use std::{future::Future, sync::Arc, time::Duration};

use reqwest::header;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    error::BoxError,
    transform::{AsyncFnTransformer, FnTransformer, Schema, StageResult, Validator},
    FetchClient, FetchError, Method, QueryValue, RawResponse, RequestConfig, RequestOptions,
    Result, RetryPolicy, Transformer,
};

/// Timeout preset by [`FetchBuilder::json_api`] and [`FetchBuilder::bearer`].
pub const DEFAULT_JSON_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Fluent accumulator for a [`RequestConfig`].
///
/// Every setter edits the draft in place and hands the builder back;
/// [`FetchBuilder::build`] freezes the draft into a [`FetchClient`].
#[derive(Debug, Default)]
pub struct FetchBuilder {
    config: RequestConfig,
    http: Option<reqwest::Client>,
    deferred: Option<FetchError>,
}

impl FetchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for JSON APIs: JSON content type and a 30 s timeout.
    pub fn json_api(base_url: impl Into<String>) -> Self {
        Self::new()
            .base_url(base_url)
            .header(header::CONTENT_TYPE.as_str(), "application/json")
            .timeout(DEFAULT_JSON_TIMEOUT)
    }

    /// JSON API preset plus `Authorization: Bearer <token>`.
    ///
    /// If the token already carries the `Bearer ` prefix it is kept as is.
    pub fn bearer(base_url: impl Into<String>, token: impl AsRef<str>) -> Self {
        let authorization = normalize_bearer_authorization(token.as_ref());
        Self::json_api(base_url).header(header::AUTHORIZATION.as_str(), authorization)
    }

    /// Starts from a copy of an existing configuration.
    ///
    /// Headers, query parameters, the transformer list and the retry policy
    /// are all copied, so editing `config` afterwards leaves the builder
    /// untouched.
    pub fn from_config(config: &RequestConfig) -> Self {
        Self {
            config: RequestConfig {
                base_url: config.base_url.clone(),
                path: config.path.clone(),
                method: config.method,
                headers: config.headers.clone(),
                timeout: config.timeout,
                query: config.query.clone(),
                body: config.body.clone(),
                transformers: config.transformers.to_vec(),
                retry: config.retry.clone(),
            },
            http: None,
            deferred: None,
        }
    }

    /// Starts from declarative options, see [`RequestOptions`].
    pub fn from_options(options: RequestOptions) -> Self {
        let mut builder = Self::new();
        builder.config.base_url = options.base_url;
        builder.config.path = options.path;
        builder.config.method = options.method;
        builder.config.timeout = options.timeout_ms.map(Duration::from_millis);
        builder.config.query = options.query_params;
        builder.config.body = options.body;
        builder.config.retry = options.retry.map(RetryPolicy::from);
        builder.headers(options.headers)
    }

    /// Builds a client from environment variables.
    ///
    /// Reads:
    /// - `FETCH_BASE_URL`: base target (required)
    /// - `FETCH_TOKEN`: bearer token (optional, `Bearer ` prefix optional)
    /// - `FETCH_TIMEOUT_MS`: per-attempt timeout in milliseconds (optional)
    ///
    /// The JSON API preset is applied in every case.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("FETCH_BASE_URL").map_err(|_| {
            FetchError::Config("missing FETCH_BASE_URL environment variable".to_owned())
        })?;
        if base_url.trim().is_empty() {
            return Err(FetchError::Config(
                "FETCH_BASE_URL is set but empty".to_owned(),
            ));
        }

        let mut builder = match std::env::var("FETCH_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Self::bearer(base_url, token),
            _ => Self::json_api(base_url),
        };

        if let Ok(raw) = std::env::var("FETCH_TIMEOUT_MS") {
            let ms = raw.trim().parse::<u64>().map_err(|err| {
                FetchError::Config(format!("invalid FETCH_TIMEOUT_MS '{raw}': {err}"))
            })?;
            builder = builder.timeout(Duration::from_millis(ms));
        }

        Ok(builder)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.config.method = method;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Sets one header, merging into the existing headers.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.set_header(name, value);
        self
    }

    /// Merges several headers into the existing headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.config.set_header(name, value);
        }
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.config.query.set(key, value);
        self
    }

    /// Merges query parameters, keeping insertion order.
    pub fn query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        self.config.query.extend(params);
        self
    }

    /// Replaces the request body. Ignored for GET requests.
    ///
    /// Serialization errors surface from [`FetchBuilder::build`] unless a
    /// later call replaces the body successfully.
    pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.config.body = Some(value);
                self.deferred = None;
            }
            Err(err) => {
                self.deferred = Some(FetchError::Config(format!(
                    "request body could not be serialized: {err}"
                )))
            }
        }
        self
    }

    /// Appends a synchronous transformer stage.
    pub fn transform<F>(self, f: F) -> Self
    where
        F: Fn(Value, &RawResponse) -> StageResult + Send + Sync + 'static,
    {
        self.transformer(FnTransformer::new(f))
    }

    /// Appends an asynchronous transformer stage.
    pub fn transform_async<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Value, RawResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageResult> + Send + 'static,
    {
        self.transformer(AsyncFnTransformer::new(f))
    }

    /// Appends any [`Transformer`] implementation.
    pub fn transformer<T: Transformer + 'static>(mut self, transformer: T) -> Self {
        self.config.transformers.push(Arc::new(transformer));
        self
    }

    /// Appends a stage that fails the request when `validate` rejects the
    /// payload and otherwise passes it through.
    pub fn validate<F, E>(self, validate: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        self.transformer(Validator::new(validate))
    }

    /// Appends a stage requiring the payload to deserialize into `T`.
    pub fn schema<T>(self) -> Self
    where
        T: DeserializeOwned + Serialize + 'static,
    {
        self.transformer(Schema::<T>::new())
    }

    /// Replaces the retry policy wholesale.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = Some(policy);
        self
    }

    pub fn no_retry(mut self) -> Self {
        self.config.retry = None;
        self
    }

    /// Uses a caller-supplied `reqwest` client for transport.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// The configuration accumulated so far.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Freezes the draft into a client.
    ///
    /// A missing base url is not checked here; it fails at execution time.
    pub fn build(self) -> Result<FetchClient> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        let client = FetchClient::from_owned(self.config);
        Ok(match self.http {
            Some(http) => client.with_http_client(http),
            None => client,
        })
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
