use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::{FieldFailure, Schema, StructError};

const SCHEMA_LEVEL_KEY: &str = "__all__";

/// Schema backed by a `validator`-annotated struct.
///
/// The data must first deserialize into `T`; the derived `Validate` rules
/// then run on the result.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Validate,
{
    fn validate(&self, data: &JsonValue) -> Result<(), StructError> {
        let value: T = serde_json::from_value(data.clone()).map_err(|e| {
            StructError::new(vec![FieldFailure::new(
                short_type_name::<T>(),
                Vec::new(),
                data.clone(),
            )
            .with_reason(e.to_string())])
        })?;

        value.validate().map_err(|errors| {
            let mut failures = Vec::new();
            collect_failures(&errors, &[], &mut failures);
            StructError::new(failures)
        })
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

fn collect_failures(errors: &ValidationErrors, path: &[String], out: &mut Vec<FieldFailure>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let mut field_path = path.to_vec();
        if &**field != SCHEMA_LEVEL_KEY {
            field_path.push(field.to_string());
        }

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let value = error
                        .params
                        .get("value")
                        .cloned()
                        .unwrap_or(JsonValue::Null);
                    let mut failure =
                        FieldFailure::new(error.code.to_string(), field_path.clone(), value);
                    if let Some(message) = &error.message {
                        failure = failure.with_reason(message.to_string());
                    }
                    out.push(failure);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_failures(nested, &field_path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let mut item_path = field_path.clone();
                    item_path.push(index.to_string());
                    collect_failures(nested, &item_path, out);
                }
            }
        }
    }
}
