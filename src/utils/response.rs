//! Response sink producing `http::Response` values.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde_json::Value as JsonValue;

use crate::core::{ApiResult, ResponseSink};

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Accumulates the calls of the dispatcher into an `http::Response`.
#[derive(Debug, Clone)]
pub struct HttpResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for HttpResponseSink {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl HttpResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_response(self) -> ApiResult<Response<Bytes>> {
        let mut builder = Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        Ok(builder.body(self.body)?)
    }

    fn ensure_content_type(&mut self, value: &'static str) {
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        }
    }
}

impl ResponseSink for HttpResponseSink {
    fn status(&mut self, code: StatusCode) -> &mut Self {
        self.status = code;
        self
    }

    fn json(&mut self, body: &JsonValue) -> &mut Self {
        match serde_json::to_vec(body) {
            Ok(json_body) => {
                self.ensure_content_type(content_type::APPLICATION_JSON);
                self.body = Bytes::from(json_body);
            }
            Err(e) => {
                log::error!("Failed to serialize JSON response: {}", e);
                self.status = StatusCode::INTERNAL_SERVER_ERROR;
                self.headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(content_type::TEXT_PLAIN),
                );
                self.body = Bytes::from_static(b"JSON serialization failed");
            }
        }
        self
    }

    fn send(&mut self, body: &JsonValue) -> &mut Self {
        self.body = match body {
            JsonValue::Null => Bytes::new(),
            JsonValue::String(text) => Bytes::copy_from_slice(text.as_bytes()),
            other => Bytes::from(other.to_string()),
        };
        self
    }

    fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => log::error!("Invalid header name '{}': {}", name, e),
            (_, Err(e)) => log::error!("Invalid value for header '{}': {}", name, e),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_response() {
        let mut sink = HttpResponseSink::new();
        sink.status(StatusCode::ACCEPTED)
            .json(&json!({"message": "success", "code": 200}));

        let response = sink.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            content_type::APPLICATION_JSON
        );
        let expected = r#"{"message":"success","code":200}"#;
        assert_eq!(response.body().as_ref(), expected.as_bytes());
    }

    #[test]
    fn test_send_keeps_content_type() {
        let mut sink = HttpResponseSink::new();
        sink.set_header("Content-Type", content_type::TEXT_PLAIN)
            .set_header("x-custom", "test")
            .status(StatusCode::OK)
            .send(&json!("plain body"));

        let response = sink.into_response().unwrap();
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(response.headers()["x-custom"], "test");
        assert_eq!(response.body().as_ref(), b"plain body");
    }

    #[test]
    fn test_json_respects_staged_content_type() {
        let mut sink = HttpResponseSink::new();
        sink.set_header("Content-Type", "application/json; charset=utf-8")
            .json(&json!({}));

        assert_eq!(
            sink.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(sink.body().as_ref(), b"{}");
    }

    #[test]
    fn test_send_non_string_values() {
        let mut sink = HttpResponseSink::new();
        sink.send(&json!({}));
        assert_eq!(sink.body().as_ref(), b"{}");

        sink.send(&JsonValue::Null);
        assert!(sink.body().is_empty());
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let mut sink = HttpResponseSink::new();
        sink.set_header("bad header", "x").set_header("x-ok", "bad\nvalue");
        assert!(sink.headers().is_empty());
    }
}
