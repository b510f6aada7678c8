use reqwest::{header, header::HeaderMap, StatusCode, Url};

/// Snapshot of the HTTP response an attempt received.
///
/// Transformers receive it alongside the parsed payload, and HTTP status
/// errors carry it for diagnostics.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
    /// Body text, captured only for non-success responses.
    pub body: Option<String>,
}

impl RawResponse {
    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            url: response.url().clone(),
            body: None,
        }
    }

    /// Canonical reason phrase for the status, e.g. `"Service Unavailable"`.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Whether the body should be parsed as JSON.
    ///
    /// A missing `Content-Type` counts as JSON; anything present that does not
    /// mention `application/json` is read as text.
    pub fn is_json(&self) -> bool {
        match self.headers.get(header::CONTENT_TYPE) {
            None => true,
            Some(value) => value
                .to_str()
                .is_ok_and(|value| value.contains("application/json")),
        }
    }
}
