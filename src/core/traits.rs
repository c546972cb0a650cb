//! Core traits for serverless-api
//!
//! A handler is a capability set: it may declare schemas for any request
//! category, a business validator and a processor. Every member is
//! optional, a handler implements the subset it needs.

use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value as JsonValue;

use super::{error::HookResult, request::ApiRequest};
use crate::schema::Schema;

/// Declares how one API endpoint validates and processes requests.
pub trait RequestHandler: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Schema for the path ids
    fn ids_struct(&self) -> Option<&dyn Schema> {
        None
    }

    /// Schema for the request body
    fn body_struct(&self) -> Option<&dyn Schema> {
        None
    }

    /// Schema for the filters
    fn filters_struct(&self) -> Option<&dyn Schema> {
        None
    }

    /// Schema for the sort directive, seen as `{by, direction?}`
    fn sort_struct(&self) -> Option<&dyn Schema> {
        None
    }

    /// Schema for the remaining dotted query groups
    fn query_struct(&self) -> Option<&dyn Schema> {
        None
    }

    /// Business validation run after every schema passed
    fn validator(&self) -> Option<&dyn BusinessValidator> {
        None
    }

    /// Business processing run after validation passed
    fn processor(&self) -> Option<&dyn Processor> {
        None
    }
}

/// Semantic checks that may reject a structurally valid request.
#[async_trait]
pub trait BusinessValidator: Send + Sync {
    /// Return an error to reject the request.
    ///
    /// The rejection status defaults to 400; stage another one with
    /// [`ApiRequest::set_code`] before returning the error.
    async fn validate(&self, api: &mut ApiRequest) -> HookResult;
}

/// The endpoint's business logic.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Stage the response with [`ApiRequest::set_code`],
    /// [`ApiRequest::set_body`] and [`ApiRequest::set_header`].
    async fn process(&self, api: &mut ApiRequest) -> HookResult;
}

/// Outgoing response of the host platform.
pub trait ResponseSink {
    fn status(&mut self, code: StatusCode) -> &mut Self;

    /// Send the body JSON encoded
    fn json(&mut self, body: &JsonValue) -> &mut Self;

    /// Send the body as is
    fn send(&mut self, body: &JsonValue) -> &mut Self;

    fn set_header(&mut self, name: &str, value: &str) -> &mut Self;
}
