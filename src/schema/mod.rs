//! Structural validation of request data.
//!
//! A [`Schema`] checks the shape of one request category (ids, body,
//! filters, sort or query) before any business logic runs. Two
//! implementations ship with the crate: [`StructSchema`], a declarative
//! description of a JSON object, and [`TypedSchema`], which deserializes
//! into a `validator`-annotated struct.

mod shape;
mod typed;

use serde::Serialize;
use serde_json::Value as JsonValue;

pub use shape::{FieldType, StructSchema};
pub use typed::TypedSchema;

/// Shape check for one request category.
pub trait Schema: Send + Sync {
    fn validate(&self, data: &JsonValue) -> Result<(), StructError>;
}

/// One failed field check
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    /// Expected type or failed rule, reported as `type`
    pub kind: String,
    pub path: Vec<String>,
    /// Offending value, `Null` when the field is missing
    pub value: JsonValue,
    pub reason: Option<String>,
}

impl FieldFailure {
    pub fn new(kind: impl Into<String>, path: Vec<String>, value: JsonValue) -> Self {
        Self {
            kind: kind.into(),
            path,
            value,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The dotted path of the field, empty for the root value
    pub fn field(&self) -> String {
        self.path.join(".")
    }
}

/// Wire form of a [`FieldFailure`] inside an error body.
#[derive(Debug, Serialize)]
pub struct FieldReport<'a> {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub value: &'a JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

impl<'a> From<&'a FieldFailure> for FieldReport<'a> {
    fn from(failure: &'a FieldFailure) -> Self {
        Self {
            field: failure.field(),
            kind: &failure.kind,
            value: &failure.value,
            reason: failure.reason.as_deref(),
        }
    }
}

/// Every field failure found while validating one value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructError {
    pub errors: Vec<FieldFailure>,
}

impl StructError {
    pub fn new(errors: Vec<FieldFailure>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Renders the failures as the `error` list of a 400 body.
    pub fn to_json(&self) -> JsonValue {
        let reports: Vec<FieldReport<'_>> = self.errors.iter().map(FieldReport::from).collect();
        serde_json::to_value(reports).unwrap_or_else(|e| {
            log::error!("Failed to serialize field failures: {e}");
            JsonValue::Array(Vec::new())
        })
    }
}

impl std::fmt::Display for StructError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{} ({})", e.field(), e.kind))
            .collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for StructError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_shape() {
        let error = StructError::new(vec![
            FieldFailure::new("number", vec!["content".into(), "total".into()], json!("Ten")),
            FieldFailure::new("length", vec!["name".into()], json!("")).with_reason("too short"),
        ]);

        assert_eq!(
            error.to_json(),
            json!([
                {"field": "content.total", "type": "number", "value": "Ten"},
                {"field": "name", "type": "length", "value": "", "reason": "too short"}
            ])
        );
        assert_eq!(
            error.to_string(),
            "invalid fields: content.total (number), name (length)"
        );
    }
}
