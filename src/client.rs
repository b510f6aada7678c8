use std::fmt;

use reqwest::{header::HeaderMap, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::{sleep, timeout};

use crate::{
    decode::{build_headers, decode_typed, parse_body},
    transform::Pipeline,
    FetchBuilder, FetchError, Method, RawResponse, RequestConfig, Result,
};

/// Executes one configured request with timeout, retry and transformation.
///
/// A client holds a private copy of its [`RequestConfig`] and never mutates
/// it, so it can be cloned and executed concurrently from many tasks.
#[derive(Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    config: RequestConfig,
}

impl fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchClient")
            .field("config", &self.config)
            .finish()
    }
}

impl FetchClient {
    /// Creates a client from a copy of `config`.
    ///
    /// Later changes to `config` do not affect the returned client.
    pub fn new(config: &RequestConfig) -> Self {
        Self::from_owned(config.clone())
    }

    pub(crate) fn from_owned(config: RequestConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Starts a fluent builder.
    pub fn builder() -> FetchBuilder {
        FetchBuilder::new()
    }

    /// Replaces the underlying `reqwest` client, e.g. to configure a proxy.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Executes the request and deserializes the transformed payload into `T`.
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.execute_value().await?;
        decode_typed(value)
    }

    /// Executes the request and returns the transformed payload untyped.
    ///
    /// Without a retry policy exactly one attempt is made. With one, failed
    /// attempts are retried while the policy allows and the last error is
    /// returned once it refuses or retries run out.
    pub async fn execute_value(&self) -> Result<Value> {
        let url = self.config.url()?;
        let headers = build_headers(&self.config)?;

        let Some(policy) = &self.config.retry else {
            return self.attempt(&url, &headers, 0).await;
        };

        let mut attempt = 0u32;
        loop {
            let err = match self.attempt(&url, &headers, attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= policy.max_retries || !policy.should_retry(self.config.method, &err) {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    method = %self.config.method,
                    url = %url,
                    attempt,
                    error = %err,
                    "request failed"
                );
                return Err(err);
            }

            let delay = policy.delay(attempt);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );

            policy.notify(attempt + 1, &err, delay);
            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &Url, headers: &HeaderMap, attempt: u32) -> Result<Value> {
        #[cfg(feature = "tracing")]
        tracing::debug!(method = %self.config.method, url = %url, attempt, "sending request");
        #[cfg(not(feature = "tracing"))]
        let _ = attempt;

        let exchange = self.send(url, headers);
        let (response, body) = match self.config.timeout {
            Some(limit) => match timeout(limit, exchange).await {
                Ok(result) => result?,
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(timeout_ms = limit.as_millis() as u64, "request timed out");
                    return Err(FetchError::timeout(limit));
                }
            },
            None => exchange.await?,
        };

        let value = parse_body(&response, body)?;
        Pipeline::new(self.config.transformers.clone())
            .run(value, &response)
            .await
    }

    /// Sends the request and reads the whole body.
    async fn send(&self, url: &Url, headers: &HeaderMap) -> Result<(RawResponse, String)> {
        let mut request = self
            .http
            .request(self.config.method.into(), url.clone())
            .headers(headers.clone());

        if self.config.method != Method::Get {
            if let Some(body) = &self.config.body {
                request = request.json(body);
            }
        }

        let response = request.send().await.map_err(FetchError::Transport)?;
        let mut raw = RawResponse::from_reqwest(&response);
        let body = response.text().await.map_err(FetchError::Transport)?;

        if !raw.status.is_success() {
            raw.body = Some(body);
            return Err(FetchError::from_response(raw));
        }

        Ok((raw, body))
    }
}
