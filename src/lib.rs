//! Request-handling adapter for serverless HTTP functions.
//!
//! A request is decomposed into a typed [`core::ApiRequest`], checked
//! against the schemas its [`core::RequestHandler`] declares, handed to the
//! handler's validation and processing hooks, and written back through a
//! [`core::ResponseSink`].

pub mod config;
pub mod core;
pub mod dispatch;
pub mod logging;
pub mod schema;
pub mod utils;

pub use crate::core::{
    ApiError, ApiRequest, ApiResult, BusinessValidator, HookError, HookResult, IncomingRequest,
    Processor, RawQuery, RequestHandler, ResponseSink,
};
pub use crate::dispatch::{handle, handle_http, FaultPolicy, ServerlessApi};
pub use crate::schema::{FieldType, Schema, StructSchema, TypedSchema};
