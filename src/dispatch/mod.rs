//! Request dispatching.
//!
//! [`handle`] is the entry point a serverless function calls with its
//! handler, the incoming request and the response sink of the platform.

pub mod dispatcher;
pub mod fault;

use bytes::Bytes;
use http::StatusCode;
use once_cell::sync::Lazy;

pub use dispatcher::{
    error_body, Dispatcher, StructCategory, ValidationOutcome, INTERNAL_SERVER_ERROR_MESSAGE,
    PROCESS_FAULT_MESSAGE,
};
pub use fault::FaultPolicy;

use crate::{
    config::Config,
    core::{ApiError, ApiRequest, ApiResult, IncomingRequest, RequestHandler, ResponseSink},
    utils::response::HttpResponseSink,
};

pub const HANDLER_MISSING_MESSAGE: &str = "API cannot be initialize. Cannot found API Class";
pub const INVALID_BODY_MESSAGE: &str = "Invalid Body";

static DEFAULT_API: Lazy<ServerlessApi> =
    Lazy::new(|| ServerlessApi::new(fault::DEFAULT_POLICY.clone()));

/// Entry point carrying the fault policy shared by every invocation.
#[derive(Debug, Clone, Default)]
pub struct ServerlessApi {
    policy: FaultPolicy,
}

impl ServerlessApi {
    pub fn new(policy: FaultPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(FaultPolicy::from(&config.faults))
    }

    pub fn policy(&self) -> &FaultPolicy {
        &self.policy
    }

    /// Runs `handler` against one request and writes the response.
    ///
    /// Every failure of the handler becomes a response. The only error
    /// returned is a missing response sink.
    pub async fn handle<S: ResponseSink>(
        &self,
        handler: Option<&dyn RequestHandler>,
        request: IncomingRequest,
        response: Option<&mut S>,
    ) -> ApiResult<()> {
        let Some(response) = response else {
            return Err(ApiError::Precondition("Response is not passed".to_string()));
        };

        let Some(handler) = handler else {
            log::error!("No handler given for {}", request.url.as_deref().unwrap_or("-"));
            response
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .json(&error_body(
                    INTERNAL_SERVER_ERROR_MESSAGE,
                    Some(HANDLER_MISSING_MESSAGE.into()),
                ));
            return Ok(());
        };

        let api = ApiRequest::new(request);
        Dispatcher::new(api, handler, response, &self.policy)
            .run()
            .await;

        Ok(())
    }

    /// Like [`ServerlessApi::handle`] for hosts speaking the `http` crate
    /// types.
    pub async fn handle_http(
        &self,
        handler: Option<&dyn RequestHandler>,
        request: http::Request<Bytes>,
    ) -> ApiResult<http::Response<Bytes>> {
        let mut sink = HttpResponseSink::new();

        match IncomingRequest::from_http(request) {
            Ok(incoming) => self.handle(handler, incoming, Some(&mut sink)).await?,
            Err(ApiError::InvalidBody(reason)) => {
                log::warn!("Rejecting request body: {reason}");
                sink.status(StatusCode::BAD_REQUEST)
                    .json(&error_body(INVALID_BODY_MESSAGE, Some(reason.into())));
            }
            Err(e) => return Err(e),
        }

        sink.into_response()
    }
}

/// Runs `handler` with the default fault policy.
pub async fn handle<S: ResponseSink>(
    handler: Option<&dyn RequestHandler>,
    request: IncomingRequest,
    response: Option<&mut S>,
) -> ApiResult<()> {
    DEFAULT_API.handle(handler, request, response).await
}

/// Runs `handler` on an `http` request with the default fault policy.
pub async fn handle_http(
    handler: Option<&dyn RequestHandler>,
    request: http::Request<Bytes>,
) -> ApiResult<http::Response<Bytes>> {
    DEFAULT_API.handle_http(handler, request).await
}
