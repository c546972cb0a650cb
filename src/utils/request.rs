//! Conversion of `http` requests into [`IncomingRequest`] values.

use std::collections::HashMap;

use bytes::Bytes;
use http::{header, HeaderMap};
use serde_json::{Map, Value as JsonValue};
use url::form_urlencoded;

use crate::core::{ApiError, ApiResult, IncomingRequest, RawQuery};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

impl IncomingRequest {
    /// Builds an incoming request from an `http` request.
    ///
    /// Query values arrive as strings. The body is decoded according to its
    /// `Content-Type`; an unparsable JSON body is an
    /// [`ApiError::InvalidBody`].
    pub fn from_http(request: http::Request<Bytes>) -> ApiResult<Self> {
        let (parts, body) = request.into_parts();

        let url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.to_string());
        let query = parts.uri.query().map(parse_query_string).unwrap_or_default();
        let cookies = parse_cookies(&parts.headers);
        let body = decode_body(&parts.headers, &body)?;

        Ok(Self {
            url: Some(url),
            method: Some(parts.method),
            body,
            query,
            cookies,
            headers: parts.headers,
        })
    }
}

/// Decodes a raw query string, keeping parameter order.
pub fn parse_query_string(query: &str) -> RawQuery {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), JsonValue::String(v.into_owned())))
        .collect()
}

/// Retrieves the value of a specific header.
///
/// Returns `None` if the header is not present or its value is not valid UTF-8.
pub fn get_req_header_value<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key).and_then(|value| value.to_str().ok())
}

/// Collects every `name=value` pair of the `Cookie` headers.
///
/// Items without `=` are skipped. Values are taken verbatim, without
/// decoding; the first occurrence of a name wins.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            log::debug!("Skipping non UTF-8 Cookie header");
            continue;
        };
        for item in value.split(';') {
            if let Some((k, v)) = item.trim().split_once('=') {
                cookies
                    .entry(k.trim().to_string())
                    .or_insert_with(|| v.trim().to_string());
            }
        }
    }

    cookies
}

/// Decodes a request body according to its `Content-Type`.
pub fn decode_body(headers: &HeaderMap, body: &Bytes) -> ApiResult<JsonValue> {
    if body.is_empty() {
        return Ok(JsonValue::Null);
    }

    let content_type = get_req_header_value(headers, header::CONTENT_TYPE.as_str())
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if content_type == "application/json" || content_type.ends_with("+json") {
        return serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()));
    }

    if content_type == FORM_URLENCODED {
        let form: Map<String, JsonValue> = form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), JsonValue::String(v.into_owned())))
            .collect();
        return Ok(JsonValue::Object(form));
    }

    match std::str::from_utf8(body) {
        Ok(text) => Ok(JsonValue::String(text.to_string())),
        Err(e) => Err(ApiError::InvalidBody(format!("body is not valid UTF-8: {e}"))),
    }
}
