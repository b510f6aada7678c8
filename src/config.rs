use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use reqwest::{header, Url};
use serde::Deserialize;

use crate::{FetchError, QueryParams, Result, RetryPolicy, Transformer};

/// HTTP method of a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// GET, PUT and DELETE are safe to repeat.
    pub fn is_idempotent(self) -> bool {
        matches!(self, Self::Get | Self::Put | Self::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Everything needed to issue one logical request.
///
/// Cloning copies every collection one level deep; transformers are shared
/// through `Arc`, so a clone never observes later edits to the source.
#[derive(Clone, Default)]
pub struct RequestConfig {
    /// Base target, e.g. `https://api.test`. Required at execution time.
    pub base_url: Option<String>,
    /// Suffix appended verbatim to `base_url`.
    pub path: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    /// Per-attempt timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub query: QueryParams,
    /// JSON body, never sent with GET.
    pub body: Option<serde_json::Value>,
    pub transformers: Vec<Arc<dyn Transformer>>,
    pub retry: Option<RetryPolicy>,
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case(header::AUTHORIZATION.as_str()) {
                    (name.as_str(), "<redacted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("RequestConfig")
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("method", &self.method)
            .field("headers", &headers)
            .field("timeout", &self.timeout)
            .field("query", &self.query)
            .field("body", &self.body.is_some())
            .field("transformers", &self.transformers.len())
            .field("retry", &self.retry)
            .finish()
    }
}

impl RequestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Sets a header, replacing any existing entry with the same name in
    /// any letter case.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Joins base and path, then appends query parameters in insertion order.
    pub fn url(&self) -> Result<Url> {
        let base = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .ok_or_else(|| FetchError::Config("request has no base url".to_owned()))?;

        let joined = join_path(base, &self.path);
        let mut url = Url::parse(&joined)
            .map_err(|err| FetchError::Config(format!("invalid url '{joined}': {err}")))?;

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.query.iter() {
                pairs.append_pair(key, &value.to_string());
            }
        }
        Ok(url)
    }
}

fn join_path(base: &str, path: &str) -> String {
    if base.ends_with('/') && path.starts_with('/') {
        format!("{base}{}", &path[1..])
    } else {
        format!("{base}{path}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{join_path, Method, RequestConfig};
    use crate::{FetchError, QueryParams, RetryPolicy};

    #[test]
    fn url_joins_path_and_query_in_order() {
        let mut config = RequestConfig::new("https://api.test");
        config.path = "/users".to_owned();
        config.query = QueryParams::from([("page", 1), ("limit", 10)]);

        let url = config.url().expect("must build url");
        assert_eq!(url.as_str(), "https://api.test/users?page=1&limit=10");
    }

    #[test]
    fn url_encodes_query_values() {
        let mut config = RequestConfig::new("https://api.test/search");
        config.query = QueryParams::from([("q", "rust lang&co")]);

        let url = config.url().expect("must build url");
        assert_eq!(url.as_str(), "https://api.test/search?q=rust+lang%26co");
    }

    #[test]
    fn url_without_base_is_config_error() {
        let mut config = RequestConfig::default();
        config.path = "/users".to_owned();
        assert!(matches!(config.url(), Err(FetchError::Config(_))));

        config.base_url = Some("   ".to_owned());
        assert!(matches!(config.url(), Err(FetchError::Config(_))));
    }

    #[test]
    fn unparseable_url_is_config_error() {
        let config = RequestConfig::new("not a url");
        assert!(matches!(config.url(), Err(FetchError::Config(_))));
    }

    #[test]
    fn join_path_collapses_one_duplicate_slash() {
        assert_eq!(join_path("https://a/", "/b"), "https://a/b");
        assert_eq!(join_path("https://a", "/b"), "https://a/b");
        assert_eq!(join_path("https://a", ""), "https://a");
    }

    #[test]
    fn set_header_is_case_insensitive_last_write_wins() {
        let mut config = RequestConfig::default();
        config.set_header("X-Trace", "1");
        config.set_header("x-trace", "2");
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.header("X-TRACE"), Some("2"));
    }

    #[test]
    fn method_idempotency() {
        assert!(Method::Get.is_idempotent());
        assert!(Method::Put.is_idempotent());
        assert!(Method::Delete.is_idempotent());
        assert!(!Method::Post.is_idempotent());
        assert!(!Method::Patch.is_idempotent());
        assert_eq!(Method::default(), Method::Get);
    }

    #[test]
    fn clone_is_independent_of_source() {
        let mut original = RequestConfig::new("https://api.test");
        original.set_header("X-A", "1");
        original.query.set("page", 1);
        original.retry = Some(RetryPolicy::default());

        let copy = original.clone();
        original.set_header("X-A", "2");
        original.query.set("page", 2);
        original.transformers.push(std::sync::Arc::new(
            crate::transform::FnTransformer::new(|value, _| Ok(value)),
        ));
        if let Some(retry) = original.retry.as_mut() {
            retry.max_retries = 9;
            retry.initial_delay = Duration::from_secs(9);
        }

        assert_eq!(copy.header("x-a"), Some("1"));
        assert_eq!(copy.query.get("page").map(|v| v.to_string()), Some("1".to_owned()));
        assert!(copy.transformers.is_empty());
        let retry = copy.retry.expect("retry must be cloned");
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.initial_delay, Duration::from_millis(100));
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let mut config = RequestConfig::new("https://api.test");
        config.set_header("Authorization", "Bearer secret-token");
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
