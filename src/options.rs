use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{FetchError, Method, QueryParams, Result, RetryOptions};

/// Declarative request configuration, e.g. loaded from a JSON file.
///
/// Field names are camelCase. Transformers and retry observers are code and
/// have to be attached on the [`FetchBuilder`](crate::FetchBuilder) returned
/// by [`FetchBuilder::from_options`](crate::FetchBuilder::from_options).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestOptions {
    pub base_url: Option<String>,
    pub path: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    pub query_params: QueryParams,
    pub body: Option<serde_json::Value>,
    pub retry: Option<RetryOptions>,
}

impl RequestOptions {
    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| FetchError::Config(format!("invalid request options: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::{FetchError, Method, RequestOptions};

    #[test]
    fn empty_document_yields_defaults() {
        let options = RequestOptions::from_json("{}").expect("must parse");
        assert_eq!(options, RequestOptions::default());
        assert_eq!(options.method, Method::Get);
        assert!(options.retry.is_none());
    }

    #[test]
    fn method_names_are_uppercase() {
        let options = RequestOptions::from_json(r#"{"method": "DELETE"}"#).expect("must parse");
        assert_eq!(options.method, Method::Delete);
        assert!(RequestOptions::from_json(r#"{"method": "TRACE"}"#).is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RequestOptions::from_json(r#"{"baseURL": "https://api.test"}"#)
            .expect_err("must reject unknown field");
        assert!(matches!(err, FetchError::Config(_)));
    }

    #[test]
    fn retry_section_is_partial() {
        let options = RequestOptions::from_json(r#"{"retry": {"exponential": false}}"#)
            .expect("must parse");
        let retry = options.retry.expect("retry must be present");
        assert_eq!(retry.exponential, Some(false));
        assert_eq!(retry.max_retries, None);
    }
}
