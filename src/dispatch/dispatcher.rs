use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe};

use futures::FutureExt;
use http::StatusCode;
use serde_json::{json, Map, Value as JsonValue};

use super::fault::FaultPolicy;
use crate::{
    core::{
        error::HookResult, request::is_blank, ApiRequest, HookError, RequestHandler,
        ResponseSink,
    },
    schema::{Schema, StructError},
};

pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal Server Error";
pub const PROCESS_FAULT_MESSAGE: &str = "Something went wrong";

/// Request categories checked against the handler's schemas, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructCategory {
    Ids,
    Body,
    Filters,
    Sort,
    Query,
}

impl StructCategory {
    pub const ORDER: [StructCategory; 5] = [
        StructCategory::Ids,
        StructCategory::Body,
        StructCategory::Filters,
        StructCategory::Sort,
        StructCategory::Query,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StructCategory::Ids => "Ids",
            StructCategory::Body => "Body",
            StructCategory::Filters => "Filters",
            StructCategory::Sort => "Sort",
            StructCategory::Query => "Query",
        }
    }

    fn schema<'h>(&self, handler: &'h dyn RequestHandler) -> Option<&'h dyn Schema> {
        match self {
            StructCategory::Ids => handler.ids_struct(),
            StructCategory::Body => handler.body_struct(),
            StructCategory::Filters => handler.filters_struct(),
            StructCategory::Sort => handler.sort_struct(),
            StructCategory::Query => handler.query_struct(),
        }
    }

    fn select(&self, api: &ApiRequest) -> JsonValue {
        match self {
            StructCategory::Ids => JsonValue::Object(api.path_ids().clone()),
            StructCategory::Body => api.data().clone(),
            StructCategory::Filters => JsonValue::Object(api.filters().clone()),
            StructCategory::Sort => match api.sort() {
                Some(sort) => serde_json::to_value(sort).unwrap_or(JsonValue::Null),
                None => JsonValue::Null,
            },
            StructCategory::Query => JsonValue::Object(api.query().clone()),
        }
    }
}

impl fmt::Display for StructCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one validation step
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    StructInvalid {
        category: StructCategory,
        error: StructError,
    },
    BusinessInvalid {
        message: String,
        detail: Option<JsonValue>,
        status: Option<StatusCode>,
    },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Builds the `{message, error?}` body of a failed request.
pub fn error_body(message: &str, detail: Option<JsonValue>) -> JsonValue {
    let mut body = Map::new();
    body.insert("message".to_string(), JsonValue::from(message));
    if let Some(detail) = detail {
        body.insert("error".to_string(), detail);
    }
    JsonValue::Object(body)
}

/// Runs the pipeline of a single request and writes exactly one response.
pub struct Dispatcher<'a, S: ResponseSink> {
    api: ApiRequest,
    handler: &'a dyn RequestHandler,
    response: &'a mut S,
    policy: &'a FaultPolicy,
}

impl<'a, S: ResponseSink> Dispatcher<'a, S> {
    pub fn new(
        api: ApiRequest,
        handler: &'a dyn RequestHandler,
        response: &'a mut S,
        policy: &'a FaultPolicy,
    ) -> Self {
        Self {
            api,
            handler,
            response,
            policy,
        }
    }

    pub async fn run(mut self) {
        log::debug!(
            "[{}] Dispatching {} {} to {}",
            self.api.id(),
            self.api.request().method.as_ref().map_or("-", |m| m.as_str()),
            self.api.request().url.as_deref().unwrap_or("-"),
            self.handler.name()
        );

        for category in StructCategory::ORDER {
            let outcome = self.validate_struct(category);
            if !outcome.is_valid() {
                self.reject(outcome);
                return;
            }
        }

        let handler = self.handler;

        if handler.validator().is_some() {
            let outcome = self.validate_api().await;
            if !outcome.is_valid() {
                self.reject(outcome);
                return;
            }
        }

        if handler.processor().is_some() {
            self.process_api().await;
            return;
        }

        self.response.status(StatusCode::OK).json(&json!({}));
    }

    /// Checks one category against the handler's schema, if it declares one.
    pub fn validate_struct(&self, category: StructCategory) -> ValidationOutcome {
        let Some(schema) = category.schema(self.handler) else {
            return ValidationOutcome::Valid;
        };

        match schema.validate(&category.select(&self.api)) {
            Ok(()) => ValidationOutcome::Valid,
            Err(error) => ValidationOutcome::StructInvalid { category, error },
        }
    }

    /// Runs the handler's business validator, if it has one.
    pub async fn validate_api(&mut self) -> ValidationOutcome {
        let handler = self.handler;
        let Some(validator) = handler.validator() else {
            return ValidationOutcome::Valid;
        };

        let result = guard(validator.validate(&mut self.api), self.policy.catch_panics()).await;

        match result {
            Ok(()) => ValidationOutcome::Valid,
            Err(error) if self.policy.is_internal(&error) => {
                log::error!(
                    "[{}] Validation fault in {}: {error}",
                    self.api.id(),
                    handler.name()
                );
                self.api.staged_mut().status = Some(StatusCode::INTERNAL_SERVER_ERROR);
                ValidationOutcome::BusinessInvalid {
                    message: INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
                    detail: error_detail(&error, true),
                    status: self.api.staged().status,
                }
            }
            Err(error) => ValidationOutcome::BusinessInvalid {
                message: error.message().to_string(),
                detail: error_detail(&error, false),
                status: self.api.staged().status,
            },
        }
    }

    /// Runs the handler's processor, if it has one, and flushes the staged
    /// response or the processing error.
    pub async fn process_api(&mut self) {
        let handler = self.handler;
        let Some(processor) = handler.processor() else {
            return;
        };

        let result = guard(processor.process(&mut self.api), self.policy.catch_panics()).await;

        match result {
            Ok(()) => self.flush_staged(),
            Err(error) => {
                let internal = self.policy.is_internal(&error);
                if internal {
                    log::error!(
                        "[{}] Processing fault in {}: {error}",
                        self.api.id(),
                        handler.name()
                    );
                } else {
                    log::warn!(
                        "[{}] Processing failed in {}: {error}",
                        self.api.id(),
                        handler.name()
                    );
                }

                let status = self
                    .api
                    .staged()
                    .status
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let message = if internal {
                    PROCESS_FAULT_MESSAGE
                } else {
                    error.message()
                };

                self.response
                    .status(status)
                    .json(&error_body(message, error_detail(&error, internal)));
            }
        }
    }

    fn flush_staged(&mut self) {
        let staged = self.api.staged();

        if let Some(headers) = &staged.headers {
            for (name, value) in headers {
                self.response.set_header(name, value);
            }
        }

        let status = staged.status.unwrap_or(StatusCode::OK);
        let body = match &staged.body {
            Some(body) if !is_blank(body) => body.clone(),
            _ => json!({}),
        };

        log::debug!("[{}] Responding {status}", self.api.id());

        self.response.status(status);
        if staged.is_raw() {
            self.response.send(&body);
        } else {
            self.response.json(&body);
        }
    }

    fn reject(&mut self, outcome: ValidationOutcome) {
        let (status, body) = match outcome {
            ValidationOutcome::Valid => return,
            ValidationOutcome::StructInvalid { category, error } => {
                log::warn!(
                    "[{}] Invalid struct for {category}: {error}",
                    self.api.id()
                );
                let message = format!("Invalid Struct for {category}");
                (
                    StatusCode::BAD_REQUEST,
                    error_body(&message, Some(error.to_json())),
                )
            }
            ValidationOutcome::BusinessInvalid {
                message,
                detail,
                status,
            } => {
                log::warn!(
                    "[{}] Validation rejected request: {message}",
                    self.api.id()
                );
                (
                    status.unwrap_or(StatusCode::BAD_REQUEST),
                    error_body(&message, detail),
                )
            }
        };

        self.response.status(status).json(&body);
    }
}

/// The `error` field of a hook failure: the attached detail, or the message
/// itself for internal faults.
fn error_detail(error: &HookError, internal: bool) -> Option<JsonValue> {
    error
        .detail()
        .cloned()
        .or_else(|| internal.then(|| JsonValue::from(error.message())))
}

/// Awaits a hook, turning a panic into a [`HookError`] when enabled.
async fn guard<F>(hook: F, catch_panics: bool) -> HookResult
where
    F: Future<Output = HookResult>,
{
    if !catch_panics {
        return hook.await;
    }

    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(HookError::panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "hook panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body() {
        assert_eq!(error_body("Fail", None), json!({"message": "Fail"}));
        assert_eq!(
            error_body("Timeout", Some(json!("Not really"))),
            json!({"message": "Timeout", "error": "Not really"})
        );
    }

    #[test]
    fn test_error_detail_rules() {
        let plain = HookError::new("Wrong name!");
        assert_eq!(error_detail(&plain, false), None);

        let detailed = HookError::new("Wrong age").with_detail("Not 10");
        assert_eq!(error_detail(&detailed, false), Some(json!("Not 10")));
        assert_eq!(error_detail(&detailed, true), Some(json!("Not 10")));

        let fault = HookError::type_error("Cannot read property 'a' of undefined");
        assert_eq!(
            error_detail(&fault, true),
            Some(json!("Cannot read property 'a' of undefined"))
        );
    }

    #[test]
    fn test_category_names() {
        let names: Vec<&str> = StructCategory::ORDER.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["Ids", "Body", "Filters", "Sort", "Query"]);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "hook panicked");
    }
}
