//! Core abstractions and interfaces for serverless-api
//!
//! This module provides the request model, the query decomposer, the error
//! types and the traits handlers and response sinks implement.

pub mod error;
pub mod query;
pub mod request;
pub mod traits;


// Re-export commonly used types
pub use error::{ApiError, ApiResult, HookError, HookResult};
pub use query::{parse_query, ParsedQuery, RawQuery, SortDirection};
pub use request::{ApiRequest, IncomingRequest, RequestInfo, Sort, StagedResponse};
pub use traits::*;
