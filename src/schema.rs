// src/schema.rs
//! Declarative shape checking for JSON produced by the generative model.
//!
//! The model is asked for a specific JSON structure but nothing guarantees it
//! complies. A [`Shape`] describes the expected structure (field names, types,
//! numeric bounds, array length bounds) and [`Shape::check`] either returns the
//! narrowed value or every violation found.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Every listed field is required. Keys not listed are dropped on narrowing.
    Object(Vec<(&'static str, Shape)>),
    Array {
        item: Box<Shape>,
        min: Option<usize>,
        max: Option<usize>,
    },
    String {
        url: bool,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Number,
    Nullable(Box<Shape>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}

impl Shape {
    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Shape)>,
    {
        Shape::Object(fields.into_iter().collect())
    }

    pub fn array(item: Shape) -> Self {
        Shape::Array {
            item: Box::new(item),
            min: None,
            max: None,
        }
    }

    pub fn string() -> Self {
        Shape::String { url: false }
    }

    pub fn url() -> Self {
        Shape::String { url: true }
    }

    pub fn integer() -> Self {
        Shape::Integer {
            min: None,
            max: None,
        }
    }

    pub fn number() -> Self {
        Shape::Number
    }

    pub fn nullable(self) -> Self {
        Shape::Nullable(Box::new(self))
    }

    /// Inclusive bounds. Applies to integers (value) and arrays (length).
    pub fn between(self, low: i64, high: i64) -> Self {
        self.at_least(low).at_most(high)
    }

    pub fn at_least(self, low: i64) -> Self {
        match self {
            Shape::Integer { max, .. } => Shape::Integer {
                min: Some(low),
                max,
            },
            Shape::Array { item, max, .. } => Shape::Array {
                item,
                min: Some(low.max(0) as usize),
                max,
            },
            other => other,
        }
    }

    pub fn at_most(self, high: i64) -> Self {
        match self {
            Shape::Integer { min, .. } => Shape::Integer {
                min,
                max: Some(high),
            },
            Shape::Array { item, min, .. } => Shape::Array {
                item,
                min,
                max: Some(high.max(0) as usize),
            },
            other => other,
        }
    }

    pub fn exactly(self, n: i64) -> Self {
        self.between(n, n)
    }

    /// Check `value` against this shape.
    ///
    /// On success the returned value contains only declared object keys, and
    /// whole-number floats in integer positions are normalized to integers.
    pub fn check(&self, value: &Value) -> Result<Value, Vec<Violation>> {
        let mut violations = Vec::new();
        let narrowed = self.visit(value, "", &mut violations);
        if violations.is_empty() {
            Ok(narrowed)
        } else {
            Err(violations)
        }
    }

    fn visit(&self, value: &Value, path: &str, out: &mut Vec<Violation>) -> Value {
        match self {
            Shape::Nullable(inner) => {
                if value.is_null() {
                    Value::Null
                } else {
                    inner.visit(value, path, out)
                }
            }
            Shape::Object(fields) => {
                let Some(map) = value.as_object() else {
                    out.push(mismatch(path, "object", value));
                    return Value::Null;
                };
                let mut narrowed = Map::new();
                for (name, shape) in fields {
                    let field_path = format!("{}/{}", path, name);
                    match map.get(*name) {
                        Some(field) => {
                            let checked = shape.visit(field, &field_path, out);
                            narrowed.insert(name.to_string(), checked);
                        }
                        None => out.push(Violation {
                            path: field_path,
                            message: "required field is missing".to_string(),
                        }),
                    }
                }
                Value::Object(narrowed)
            }
            Shape::Array { item, min, max } => {
                let Some(items) = value.as_array() else {
                    out.push(mismatch(path, "array", value));
                    return Value::Null;
                };
                if let Some(min) = min {
                    if items.len() < *min {
                        out.push(Violation {
                            path: path.to_string(),
                            message: format!(
                                "expected at least {} item(s), found {}",
                                min,
                                items.len()
                            ),
                        });
                    }
                }
                if let Some(max) = max {
                    if items.len() > *max {
                        out.push(Violation {
                            path: path.to_string(),
                            message: format!(
                                "expected at most {} item(s), found {}",
                                max,
                                items.len()
                            ),
                        });
                    }
                }
                Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, v)| item.visit(v, &format!("{}/{}", path, i), out))
                        .collect(),
                )
            }
            Shape::String { url } => {
                let Some(text) = value.as_str() else {
                    out.push(mismatch(path, "string", value));
                    return Value::Null;
                };
                if *url && reqwest::Url::parse(text).is_err() {
                    out.push(Violation {
                        path: path.to_string(),
                        message: format!("invalid url: {:?}", text),
                    });
                }
                value.clone()
            }
            Shape::Integer { min, max } => {
                let Some(n) = as_integer(value) else {
                    out.push(mismatch(path, "integer", value));
                    return Value::Null;
                };
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    out.push(Violation {
                        path: path.to_string(),
                        message: format!(
                            "{} is outside the allowed range [{}, {}]",
                            n,
                            min.map_or("-inf".to_string(), |m| m.to_string()),
                            max.map_or("inf".to_string(), |m| m.to_string()),
                        ),
                    });
                }
                Value::from(n)
            }
            Shape::Number => {
                if !value.is_number() {
                    out.push(mismatch(path, "number", value));
                }
                value.clone()
            }
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> Violation {
    Violation {
        path: path.to_string(),
        message: format!("expected {}, found {}", expected, type_name(found)),
    }
}

/// A type whose JSON representation is described by a [`Shape`].
pub trait Validated: DeserializeOwned {
    fn shape() -> Shape;
}

/// Check `value` against `T::shape()` and deserialize the narrowed result.
pub fn validate<T: Validated>(value: &Value) -> Result<T, Vec<Violation>> {
    let narrowed = T::shape().check(value)?;
    serde_json::from_value(narrowed).map_err(|e| {
        vec![Violation {
            path: String::new(),
            message: format!("shape accepted but value did not deserialize: {}", e),
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scored_list() -> Shape {
        Shape::object([
            ("items", Shape::array(Shape::string()).between(2, 3)),
            ("score", Shape::integer().between(0, 100)),
        ])
    }

    #[test]
    fn test_accepts_matching_value() {
        let value = json!({"items": ["a", "b"], "score": 42});
        assert_eq!(scored_list().check(&value).unwrap(), value);
    }

    #[test]
    fn test_out_of_range_integer() {
        let err = scored_list()
            .check(&json!({"items": ["a", "b"], "score": 150}))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].path, "/score");
        assert!(err[0].message.contains("outside the allowed range"));
    }

    #[test]
    fn test_missing_field_and_short_array_are_both_reported() {
        let err = scored_list().check(&json!({"items": ["a"]})).unwrap_err();
        let paths: Vec<&str> = err.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["/items", "/score"]);
    }

    #[test]
    fn test_array_too_long() {
        let err = scored_list()
            .check(&json!({"items": ["a", "b", "c", "d"], "score": 1}))
            .unwrap_err();
        assert!(err[0].message.contains("at most 3"));
    }

    #[test]
    fn test_type_mismatch_reports_found_type() {
        let err = scored_list()
            .check(&json!({"items": ["a", 7], "score": "85"}))
            .unwrap_err();
        assert_eq!(err[0].path, "/items/1");
        assert_eq!(err[0].message, "expected string, found integer");
        assert_eq!(err[1].message, "expected integer, found string");
    }

    #[test]
    fn test_fractional_number_is_not_an_integer() {
        let err = scored_list()
            .check(&json!({"items": ["a", "b"], "score": 85.5}))
            .unwrap_err();
        assert_eq!(err[0].message, "expected integer, found float");
    }

    #[test]
    fn test_whole_float_is_normalized() {
        let narrowed = scored_list()
            .check(&json!({"items": ["a", "b"], "score": 85.0}))
            .unwrap();
        assert_eq!(narrowed["score"], json!(85));
        assert!(narrowed["score"].is_i64());
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let narrowed = scored_list()
            .check(&json!({"items": ["a", "b"], "score": 1, "extra": true}))
            .unwrap();
        assert!(narrowed.get("extra").is_none());
    }

    #[test]
    fn test_nullable_url() {
        let shape = Shape::object([("link", Shape::url().nullable())]);
        assert!(shape.check(&json!({"link": null})).is_ok());
        assert!(shape.check(&json!({"link": "https://doc.rust-lang.org/book/"})).is_ok());
        let err = shape.check(&json!({"link": "not a link"})).unwrap_err();
        assert!(err[0].message.starts_with("invalid url"));
        // nullable still requires the key to be present
        assert!(shape.check(&json!({})).is_err());
    }

    #[test]
    fn test_top_level_type_mismatch() {
        let err = scored_list().check(&json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(err[0].to_string(), "/: expected object, found array");
    }

    #[test]
    fn test_validate_deserializes_narrowed_value() {
        #[derive(serde::Deserialize)]
        struct Scored {
            items: Vec<String>,
            score: u8,
        }
        impl Validated for Scored {
            fn shape() -> Shape {
                scored_list()
            }
        }

        let scored: Scored = validate(&json!({"items": ["x", "y"], "score": 99.0})).unwrap();
        assert_eq!(scored.items, vec!["x", "y"]);
        assert_eq!(scored.score, 99);

        assert!(validate::<Scored>(&json!({"items": [], "score": 1})).is_err());
    }
}
