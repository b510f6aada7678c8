use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{FetchError, RawResponse, RequestConfig};

/// Default `Content-Type: application/json` overlaid with the configured
/// headers; configured values win on collision.
pub(crate) fn build_headers(config: &RequestConfig) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::with_capacity(config.headers.len() + 1);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| FetchError::Config(format!("invalid header name '{name}': {err}")))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|err| FetchError::Config(format!("invalid value for header '{name}': {err}")))?;
        if name == header::AUTHORIZATION {
            value.set_sensitive(true);
        }
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Parses a success body as JSON or text depending on `Content-Type`.
pub(crate) fn parse_body(response: &RawResponse, body: String) -> Result<Value, FetchError> {
    if !response.is_json() {
        return Ok(Value::String(body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|err| {
        FetchError::Decode(format!("invalid JSON response body: {err}; body: {body}"))
    })
}

pub(crate) fn decode_typed<T: DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value)
        .map_err(|err| FetchError::Decode(format!("payload does not match target type: {err}")))
}
