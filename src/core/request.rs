//! Per-invocation request model
//!
//! `ApiRequest` is built once from an `IncomingRequest` and handed to the
//! business hooks. Response data produced by the hooks is staged on it and
//! flushed to the response sink by the dispatcher.

use std::collections::HashMap;

use http::{header, HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use super::{
    error::HookError,
    query::{parse_query, RawQuery, SortDirection},
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

static UNDEFINED: JsonValue = JsonValue::Null;

/// Request data as received from the host platform.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    pub url: Option<String>,
    pub method: Option<Method>,
    /// Decoded body, `Null` when absent
    pub body: JsonValue,
    pub query: RawQuery,
    pub cookies: HashMap<String, String>,
    pub headers: HeaderMap,
}

impl IncomingRequest {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_body(mut self, body: impl Into<JsonValue>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<RawQuery>) -> Self {
        self.query = query.into();
        self
    }
}

/// Transport details of the request
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub url: Option<String>,
    pub method: Option<Method>,
    pub cookies: HashMap<String, String>,
    pub headers: HeaderMap,
}

/// Sort directive taken from `sortBy`/`sort` and `sortDirection`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sort {
    pub by: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
}

/// Response data staged by hooks before it reaches the sink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedResponse {
    pub status: Option<StatusCode>,
    pub body: Option<JsonValue>,
    /// Created on the first `set_header` call, kept in insertion order
    pub headers: Option<Vec<(String, String)>>,
}

impl StagedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    /// Whether the staged body must be sent as is rather than JSON encoded.
    pub fn is_raw(&self) -> bool {
        match self.header(header::CONTENT_TYPE.as_str()) {
            Some(content_type) => !is_json_content_type(content_type),
            None => false,
        }
    }
}

/// `application/json`, ignoring parameters such as `charset`.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|essence| essence.eq_ignore_ascii_case("application/json"))
}

/// The typed view of one API invocation.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    id: String,
    data: JsonValue,
    path_ids: Map<String, JsonValue>,
    filters: Map<String, JsonValue>,
    query: Map<String, JsonValue>,
    sort: Option<Sort>,
    request: RequestInfo,
    staged: StagedResponse,
}

impl ApiRequest {
    pub fn new(incoming: IncomingRequest) -> Self {
        let IncomingRequest {
            url,
            method,
            body,
            query,
            cookies,
            headers,
        } = incoming;

        let parsed = parse_query(&query);

        let sort = parsed
            .sort
            .filter(|by| !is_blank(by))
            .map(|by| Sort {
                by,
                direction: parsed.sort_direction,
            });

        let id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

        Self {
            id,
            data: body,
            path_ids: parsed.path_ids,
            filters: parsed.filters,
            query: parsed.groups,
            sort,
            request: RequestInfo {
                url,
                method,
                cookies,
                headers,
            },
            staged: StagedResponse::default(),
        }
    }

    /// Identifier used to correlate log lines of this invocation
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The request body
    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn path_ids(&self) -> &Map<String, JsonValue> {
        &self.path_ids
    }

    pub fn filters(&self) -> &Map<String, JsonValue> {
        &self.filters
    }

    /// Dotted query groups other than `pathIds` and `filters`
    pub fn query(&self) -> &Map<String, JsonValue> {
        &self.query
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Reads a dotted path inside the body.
    ///
    /// A missing leaf reads as `Null`. Reading through a missing or `null`
    /// intermediate value is a `TypeError` fault. An absent body counts as
    /// missing.
    pub fn field(&self, path: &str) -> Result<&JsonValue, HookError> {
        // `None` while the value read so far does not exist
        let mut current = Some(&self.data).filter(|data| !data.is_null());
        for segment in path.split('.') {
            let value = match current {
                None => return Err(read_through(segment, "undefined")),
                Some(JsonValue::Null) => return Err(read_through(segment, "null")),
                Some(value) => value,
            };
            current = match value {
                JsonValue::Object(map) => map.get(segment),
                JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
        }
        Ok(current.unwrap_or(&UNDEFINED))
    }

    /// Stage the response status code.
    pub fn set_code(&mut self, code: StatusCode) -> &mut Self {
        self.staged.status = Some(code);
        self
    }

    /// Stage the response body. Without a non-JSON `Content-Type` header it
    /// is sent JSON encoded.
    pub fn set_body(&mut self, body: impl Into<JsonValue>) -> &mut Self {
        self.staged.body = Some(body.into());
        self
    }

    /// Stage a response header. Setting the same name again replaces it.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        let name = name.into();
        let value = value.to_string();
        let headers = self.staged.headers.get_or_insert_with(Vec::new);

        match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(existing) => existing.1 = value,
            None => headers.push((name, value)),
        }
        self
    }

    pub(crate) fn staged(&self) -> &StagedResponse {
        &self.staged
    }

    pub(crate) fn staged_mut(&mut self) -> &mut StagedResponse {
        &mut self.staged
    }
}

/// `null`, `false`, `0` and `""`: no sort key, and no staged body.
pub(crate) fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}

fn read_through(segment: &str, missing: &str) -> HookError {
    HookError::type_error(format!("Cannot read property '{segment}' of {missing}"))
}

impl From<IncomingRequest> for ApiRequest {
    fn from(incoming: IncomingRequest) -> Self {
        Self::new(incoming)
    }
}
