//! Unified error handling for serverless-api
//!
//! Two families live here: `ApiError` for failures of the adapter itself
//! (bad configuration, a missing response sink, an unreadable body) and
//! `HookError` for failures raised by caller-supplied business hooks.

use std::{borrow::Cow, fmt};

use serde_json::Value as JsonValue;

/// Kind tag carried by plain domain errors.
pub const DEFAULT_KIND: &str = "Error";
/// Kind tag for dereferencing a missing value.
pub const TYPE_ERROR: &str = "TypeError";
/// Kind tag for referring to something that does not exist.
pub const REFERENCE_ERROR: &str = "ReferenceError";
/// Kind tag given to hook panics.
pub const PANIC: &str = "Panic";

/// Errors produced by the adapter itself
#[derive(Debug)]
pub enum ApiError {
    /// A caller bug that cannot be turned into a response
    Precondition(String),

    /// Configuration-related errors
    Configuration(String),

    /// Request body could not be decoded
    InvalidBody(String),

    /// Response construction errors
    Http(http::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Precondition(msg) => write!(f, "Precondition failed: {msg}"),
            ApiError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ApiError::InvalidBody(msg) => write!(f, "Invalid body: {msg}"),
            ApiError::Http(err) => write!(f, "HTTP error: {err}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<http::Error> for ApiError {
    fn from(err: http::Error) -> Self {
        ApiError::Http(err)
    }
}

/// Result type alias for adapter operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Builds an [`ApiError::Configuration`]
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::ApiError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::ApiError::Configuration(format!($fmt, $($arg)*))
    };
}

/// Error raised by a business validation or processing hook.
///
/// `message` becomes the `message` of the error body. `detail`, when set,
/// is reported as the `error` field. `kind` is matched against the
/// dispatcher's fault policy to decide whether the failure is a programming
/// fault rather than a deliberate rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct HookError {
    message: String,
    detail: Option<JsonValue>,
    kind: Cow<'static, str>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            kind: Cow::Borrowed(DEFAULT_KIND),
        }
    }

    /// A fault caused by reading through a missing value.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(TYPE_ERROR)
    }

    /// A fault caused by naming something that does not exist.
    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(REFERENCE_ERROR)
    }

    pub(crate) fn panic(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(PANIC)
    }

    /// Attach a detail reported as the `error` field of the response body.
    pub fn with_detail(mut self, detail: impl Into<JsonValue>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<Cow<'static, str>>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&JsonValue> {
        self.detail.as_ref()
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_panic(&self) -> bool {
        self.kind == PANIC
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for HookError {}

/// Result type returned by business hooks
pub type HookResult = std::result::Result<(), HookError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Precondition("Response is not passed".to_string());
        assert_eq!(err.to_string(), "Precondition failed: Response is not passed");

        let err = config_error!("level {} unknown", "loud");
        assert!(matches!(err, ApiError::Configuration(ref m) if m == "level loud unknown"));
    }

    #[test]
    fn test_http_error_conversion() {
        let http_error = http::Response::builder()
            .header("bad header", "x")
            .body(())
            .unwrap_err();
        let api_error: ApiError = http_error.into();
        assert!(matches!(api_error, ApiError::Http(_)));
        assert!(std::error::Error::source(&api_error).is_some());
    }

    #[test]
    fn test_hook_error_builders() {
        let err = HookError::new("Wrong age").with_detail("Not 10");
        assert_eq!(err.message(), "Wrong age");
        assert_eq!(err.detail(), Some(&json!("Not 10")));
        assert_eq!(err.kind(), DEFAULT_KIND);

        let err = HookError::type_error("Cannot read property 'a' of undefined");
        assert_eq!(err.kind(), TYPE_ERROR);
        assert!(err.detail().is_none());
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read property 'a' of undefined"
        );

        assert!(HookError::panic("oops").is_panic());
        assert!(!HookError::reference_error("x is not defined").is_panic());
    }
}
