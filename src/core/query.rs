//! Query string decomposition.
//!
//! Turns a flat query map such as `{"pathIds.id": 1, "sortBy": "name",
//! "status": "active"}` into path ids, filters, sort directives and
//! free-form nested groups.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub const PATH_IDS_GROUP: &str = "pathIds";
pub const FILTERS_GROUP: &str = "filters";
pub const SORT_KEYS: [&str; 2] = ["sortBy", "sort"];
pub const SORT_DIRECTION_KEY: &str = "sortDirection";

/// Flat query parameters in the order they were received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery(Vec<(String, JsonValue)>);

impl RawQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawQuery
where
    K: Into<String>,
    V: Into<JsonValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for RawQuery
where
    K: Into<String>,
    V: Into<JsonValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Normalizes a raw `sortDirection` value. Anything unrecognized sorts
    /// ascending.
    pub fn normalize(value: &JsonValue) -> Self {
        match value {
            JsonValue::Number(n) if n.as_f64() == Some(0.0) => SortDirection::Desc,
            JsonValue::String(s) if s == "0" || s == "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of decomposing a [`RawQuery`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub path_ids: Map<String, JsonValue>,
    pub filters: Map<String, JsonValue>,
    pub sort: Option<JsonValue>,
    pub sort_direction: Option<SortDirection>,
    /// Dotted keys whose group is neither `pathIds` nor `filters`.
    pub groups: Map<String, JsonValue>,
}

impl ParsedQuery {
    /// Re-merges the decomposition into flat query parameters.
    pub fn to_flat(&self) -> RawQuery {
        let mut flat = RawQuery::new();

        for (field, value) in &self.path_ids {
            flat.push(format!("{PATH_IDS_GROUP}.{field}"), value.clone());
        }
        for (field, value) in &self.filters {
            flat.push(field.clone(), value.clone());
        }
        for (group, fields) in &self.groups {
            if let JsonValue::Object(fields) = fields {
                for (field, value) in fields {
                    flat.push(format!("{group}.{field}"), value.clone());
                }
            }
        }
        if let Some(sort) = &self.sort {
            flat.push(SORT_KEYS[1], sort.clone());
        }
        if let Some(direction) = self.sort_direction {
            flat.push(SORT_DIRECTION_KEY, direction.as_str());
        }

        flat
    }
}

/// Splits a flat query map into its path ids, filters, sort directives and
/// nested groups.
///
/// Dotted keys split on the first `.` only, so `"a.b.c"` lands in group `a`
/// under the field `"b.c"`. When both `sort` and `sortBy` are present the
/// one seen last wins.
pub fn parse_query(query: &RawQuery) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();

    for (key, value) in query.iter() {
        if let Some((group, field)) = key.split_once('.') {
            let bucket = match group {
                PATH_IDS_GROUP => Some(&mut parsed.path_ids),
                FILTERS_GROUP => Some(&mut parsed.filters),
                _ => parsed
                    .groups
                    .entry(group.to_string())
                    .or_insert_with(|| JsonValue::Object(Map::new()))
                    .as_object_mut(),
            };
            if let Some(bucket) = bucket {
                bucket.insert(field.to_string(), value.clone());
            }
        } else if SORT_KEYS.contains(&key) {
            parsed.sort = Some(value.clone());
        } else if key == SORT_DIRECTION_KEY {
            parsed.sort_direction = Some(SortDirection::normalize(value));
        } else {
            parsed.filters.insert(key.to_string(), value.clone());
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_plain_keys_are_filters() {
        let parsed = parse_query(&RawQuery::from([("name", "John"), ("age", "11")]));

        assert_eq!(parsed.filters, object(json!({"name": "John", "age": "11"})));
        assert!(parsed.path_ids.is_empty());
        assert!(parsed.groups.is_empty());
        assert_eq!(parsed.sort, None);
        assert_eq!(parsed.sort_direction, None);
    }

    #[test]
    fn test_filters_notation() {
        let parsed = parse_query(&RawQuery::from([
            ("filters.name", "John"),
            ("filters.age", "11"),
        ]));
        assert_eq!(parsed.filters, object(json!({"name": "John", "age": "11"})));

        let parsed = parse_query(&RawQuery::from([("filters.name", "John"), ("age", "11")]));
        assert_eq!(parsed.filters, object(json!({"name": "John", "age": "11"})));
    }

    #[test]
    fn test_sort_direction_table() {
        let cases = [
            (json!(1), SortDirection::Asc),
            (json!("1"), SortDirection::Asc),
            (json!("asc"), SortDirection::Asc),
            (json!(0), SortDirection::Desc),
            (json!("0"), SortDirection::Desc),
            (json!("desc"), SortDirection::Desc),
            (json!(2), SortDirection::Asc),
            (json!("DESC"), SortDirection::Asc),
            (json!(null), SortDirection::Asc),
            (json!(true), SortDirection::Asc),
        ];

        for (input, expected) in cases {
            let mut query = RawQuery::new();
            query.push("sortBy", "John");
            query.push("sortDirection", input.clone());
            let parsed = parse_query(&query);
            assert_eq!(parsed.sort, Some(json!("John")));
            assert_eq!(parsed.sort_direction, Some(expected), "input {input}");
            assert!(parsed.filters.is_empty());
        }
    }

    #[test]
    fn test_last_sort_key_wins() {
        let parsed = parse_query(&RawQuery::from([("sortBy", "John"), ("sort", "Doe")]));
        assert_eq!(parsed.sort, Some(json!("Doe")));
        assert_eq!(parsed.sort_direction, None);

        let parsed = parse_query(&RawQuery::from([("sort", "Doe"), ("sortBy", "John")]));
        assert_eq!(parsed.sort, Some(json!("John")));
    }

    #[test]
    fn test_path_ids() {
        let parsed = parse_query(&RawQuery::from([
            ("pathIds.name", "John"),
            ("pathIds.age", "11"),
        ]));
        assert_eq!(parsed.path_ids, object(json!({"name": "John", "age": "11"})));
        assert!(parsed.filters.is_empty());
    }

    #[test]
    fn test_other_groups() {
        let parsed = parse_query(&RawQuery::from([
            ("pathId.name", "John"),
            ("pathId.age", "11"),
        ]));
        assert!(parsed.path_ids.is_empty());
        assert_eq!(
            parsed.groups,
            object(json!({"pathId": {"name": "John", "age": "11"}}))
        );
    }

    #[test]
    fn test_only_first_dot_splits() {
        let parsed = parse_query(&RawQuery::from([("a.b.c", 1)]));
        assert_eq!(parsed.groups, object(json!({"a": {"b.c": 1}})));
    }

    #[test]
    fn test_reserved_names_as_groups() {
        let parsed = parse_query(&RawQuery::from([("sort.field", "x"), ("sortBy", "y")]));
        assert_eq!(parsed.sort, Some(json!("y")));
        assert_eq!(parsed.groups, object(json!({"sort": {"field": "x"}})));
    }

    #[test]
    fn test_unrelated_keys_in_any_order() {
        let pairs = [
            ("pathIds.id", json!(10)),
            ("filters.city", json!("Rome")),
            ("status", json!("active")),
            ("content.total", json!(3)),
            ("sortBy", json!("name")),
            ("sortDirection", json!("desc")),
        ];
        let expected = parse_query(&RawQuery::from(pairs.clone()));

        for shift in 1..pairs.len() {
            let mut rotated = pairs.to_vec();
            rotated.rotate_left(shift);
            let mut reversed = rotated.clone();
            reversed.reverse();

            for order in [rotated, reversed] {
                let parsed = parse_query(&order.into_iter().collect());
                assert_eq!(parsed.path_ids, expected.path_ids);
                assert_eq!(parsed.filters, expected.filters);
                assert_eq!(parsed.groups, expected.groups);
                assert_eq!(parsed.sort, expected.sort);
                assert_eq!(parsed.sort_direction, expected.sort_direction);
            }
        }
    }

    #[test]
    fn test_filter_only_round_trip() {
        let original = RawQuery::from([("status", "active"), ("age", "11"), ("city", "Rome")]);
        assert_eq!(parse_query(&original).to_flat(), original);
    }

    #[test]
    fn test_to_flat_reparses_identically() {
        let original = RawQuery::from([
            ("pathIds.id", json!(10)),
            ("content.total", json!(3)),
            ("name", json!("John")),
            ("sortBy", json!("name")),
            ("sortDirection", json!(0)),
        ]);
        let parsed = parse_query(&original);
        assert_eq!(parse_query(&parsed.to_flat()), parsed);
    }
}
