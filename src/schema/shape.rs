use serde_json::{Map, Value as JsonValue};

use super::{FieldFailure, Schema, StructError};

/// Expected type of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Any,
    String,
    Number,
    Integer,
    Boolean,
    /// Every element must match
    Array(Box<FieldType>),
    Object(StructSchema),
    /// Missing or `null` is accepted, anything else must match
    Optional(Box<FieldType>),
    /// One of the listed values
    Enum(Vec<JsonValue>),
}

impl FieldType {
    pub fn array(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        FieldType::Enum(values.into_iter().map(Into::into).collect())
    }

    /// The name reported as `type` when the check fails
    pub fn name(&self) -> String {
        match self {
            FieldType::Any => "any".to_string(),
            FieldType::String => "string".to_string(),
            FieldType::Number => "number".to_string(),
            FieldType::Integer => "integer".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Array(_) => "array".to_string(),
            FieldType::Object(_) => "object".to_string(),
            FieldType::Optional(inner) => format!("{}?", inner.name()),
            FieldType::Enum(values) => values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    fn check(&self, value: Option<&JsonValue>, path: &[String], failures: &mut Vec<FieldFailure>) {
        let present = value.filter(|v| !v.is_null());

        let matches = match (self, present) {
            (FieldType::Any, _) => true,
            (FieldType::Optional(_), None) => true,
            (FieldType::Optional(inner), Some(v)) => {
                let before = failures.len();
                inner.check(Some(v), path, failures);
                // report under the optional name
                for failure in &mut failures[before..] {
                    if failure.path == path {
                        failure.kind = self.name();
                    }
                }
                return;
            }
            (_, None) => false,
            (FieldType::String, Some(v)) => v.is_string(),
            (FieldType::Number, Some(v)) => v.is_number(),
            (FieldType::Integer, Some(v)) => v.is_i64() || v.is_u64(),
            (FieldType::Boolean, Some(v)) => v.is_boolean(),
            (FieldType::Enum(values), Some(v)) => values.contains(v),
            (FieldType::Array(item), Some(JsonValue::Array(items))) => {
                for (i, element) in items.iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(i.to_string());
                    item.check(Some(element), &item_path, failures);
                }
                true
            }
            (FieldType::Object(schema), Some(JsonValue::Object(map))) => {
                schema.check_object(map, path, failures);
                true
            }
            (FieldType::Array(_) | FieldType::Object(_), Some(_)) => false,
        };

        if !matches {
            failures.push(FieldFailure::new(
                self.name(),
                path.to_vec(),
                value.cloned().unwrap_or(JsonValue::Null),
            ));
        }
    }
}

/// Declarative description of a JSON object.
///
/// A partial schema ignores keys it does not declare; a strict one reports
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    fields: Vec<(String, FieldType)>,
    strict: bool,
}

impl StructSchema {
    pub fn partial<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldType)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
            strict: false,
        }
    }

    pub fn strict<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldType)>,
        K: Into<String>,
    {
        Self {
            strict: true,
            ..Self::partial(fields)
        }
    }

    fn check_object(
        &self,
        map: &Map<String, JsonValue>,
        path: &[String],
        failures: &mut Vec<FieldFailure>,
    ) {
        for (name, field_type) in &self.fields {
            let mut field_path = path.to_vec();
            field_path.push(name.clone());
            field_type.check(map.get(name), &field_path, failures);
        }

        if self.strict {
            for (key, value) in map {
                if !self.fields.iter().any(|(name, _)| name == key) {
                    let mut field_path = path.to_vec();
                    field_path.push(key.clone());
                    failures.push(
                        FieldFailure::new("never", field_path, value.clone())
                            .with_reason("unexpected field"),
                    );
                }
            }
        }
    }
}

impl Schema for StructSchema {
    fn validate(&self, data: &JsonValue) -> Result<(), StructError> {
        let mut failures = Vec::new();

        match data {
            JsonValue::Object(map) => self.check_object(map, &[], &mut failures),
            other => failures.push(FieldFailure::new("object", Vec::new(), other.clone())),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StructError::new(failures))
        }
    }
}
