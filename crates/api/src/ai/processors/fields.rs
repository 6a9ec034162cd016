//! Lenient readers over model output.
//!
//! Every reader takes the section it reads from as an `Option` so a missing
//! section and a missing key fall back to the same default.

use serde::Serialize;
use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// A categorical reading with the model's confidence in it (0-100).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labeled {
    pub label: String,
    pub confidence: f64,
}

impl Labeled {
    fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// One step of a morning/night routine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineStep {
    pub title: String,
    pub description: String,
}

/// A recommended care product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub name: String,
    pub tags: Vec<String>,
    pub time_of_day: String,
    pub overview: String,
    pub how_to_use: Vec<String>,
    pub when_to_use: String,
    pub dont_use_with: Vec<String>,
    pub confidence: f64,
}

/// A timed exercise with instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exercise {
    pub name: String,
    pub duration: String,
    pub steps: Vec<String>,
}

pub fn section<'a>(obj: Option<&'a Object>, key: &str) -> Option<&'a Object> {
    obj.and_then(|o| o.get(key)).and_then(Value::as_object)
}

/// A scalar rendered as a string, or `default`.
pub fn text(obj: Option<&Object>, key: &str, default: &str) -> String {
    match obj.and_then(|o| o.get(key)) {
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => default.to_string(),
    }
}

/// A number, or a string holding one, or `default`.
pub fn number(obj: Option<&Object>, key: &str, default: f64) -> f64 {
    match obj.and_then(|o| o.get(key)) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Any non-null value passed through as-is, or `default`.
pub fn raw(obj: Option<&Object>, key: &str, default: Value) -> Value {
    match obj.and_then(|o| o.get(key)) {
        Some(Value::Null) | None => default,
        Some(v) => v.clone(),
    }
}

/// A `{label, confidence}` pair. A bare scalar becomes the label with zero
/// confidence.
pub fn labeled(obj: Option<&Object>, key: &str, default: &str) -> Labeled {
    match obj.and_then(|o| o.get(key)) {
        Some(Value::Object(inner)) => Labeled::new(
            text(Some(inner), "label", default),
            number(Some(inner), "confidence", 0.0),
        ),
        Some(Value::String(s)) => Labeled::new(s.as_str(), 0.0),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Labeled::new(v.to_string(), 0.0),
        _ => Labeled::new(default, 0.0),
    }
}

/// Up to `max` list entries rendered as strings. Empty and non-scalar
/// entries are dropped.
pub fn string_list(obj: Option<&Object>, key: &str, max: usize) -> Vec<String> {
    list(obj, key)
        .iter()
        .take(max)
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(_) | Value::Bool(_) => Some(item.to_string()),
            _ => None,
        })
        .collect()
}

/// The object entries among the first `max` list entries.
pub fn objects<'a>(obj: Option<&'a Object>, key: &str, max: usize) -> Vec<&'a Object> {
    list(obj, key)
        .iter()
        .take(max)
        .filter_map(Value::as_object)
        .collect()
}

fn list<'a>(obj: Option<&'a Object>, key: &str) -> &'a [Value] {
    obj.and_then(|o| o.get(key))
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

pub fn routine_steps(obj: Option<&Object>, key: &str, max: usize) -> Vec<RoutineStep> {
    objects(obj, key, max)
        .into_iter()
        .map(|item| RoutineStep {
            title: text(Some(item), "title", ""),
            description: text(Some(item), "description", ""),
        })
        .collect()
}

pub fn products(obj: Option<&Object>, key: &str, max: usize) -> Vec<Product> {
    objects(obj, key, max)
        .into_iter()
        .map(|item| {
            let item = Some(item);
            Product {
                name: text(item, "name", "Product"),
                tags: string_list(item, "tags", usize::MAX),
                time_of_day: text(item, "time_of_day", "AM/PM"),
                overview: text(item, "overview", ""),
                how_to_use: string_list(item, "how_to_use", usize::MAX),
                when_to_use: text(item, "when_to_use", "Daily"),
                dont_use_with: string_list(item, "dont_use_with", usize::MAX),
                confidence: number(item, "confidence", 0.0),
            }
        })
        .collect()
}

pub fn exercises(obj: Option<&Object>, key: &str, max: usize) -> Vec<Exercise> {
    objects(obj, key, max)
        .into_iter()
        .map(|item| {
            let item = Some(item);
            Exercise {
                name: text(item, "name", "Exercise"),
                duration: text(item, "duration", "5 min"),
                steps: string_list(item, "steps", usize::MAX),
            }
        })
        .collect()
}

/// Serialize a reshaped section into an output field.
pub fn to_field<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value)
        .inspect_err(|e| tracing::warn!(error = %e, "Failed to serialize AI section"))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Object {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_labeled_variants() {
        let data = object(json!({
            "full": {"label": "Oily", "confidence": 82},
            "bare": "Dry",
            "partial": {"confidence": 40},
        }));
        let data = Some(&data);

        assert_eq!(labeled(data, "full", "Normal"), Labeled::new("Oily", 82.0));
        assert_eq!(labeled(data, "bare", "Normal"), Labeled::new("Dry", 0.0));
        assert_eq!(labeled(data, "partial", "Normal"), Labeled::new("Normal", 40.0));
        assert_eq!(labeled(data, "missing", "Normal"), Labeled::new("Normal", 0.0));
        assert_eq!(labeled(None, "full", "Low"), Labeled::new("Low", 0.0));
    }

    #[test]
    fn test_string_list_truncates_and_filters() {
        let data = object(json!({"items": ["a", "", null, 3, "b", "c", "d", "e", "f"]}));
        assert_eq!(
            string_list(Some(&data), "items", 5),
            vec!["a".to_string(), "3".to_string(), "b".to_string()]
        );
        assert!(string_list(Some(&data), "missing", 5).is_empty());
    }

    #[test]
    fn test_non_list_reads_as_empty() {
        let data = object(json!({"items": "not a list"}));
        assert!(string_list(Some(&data), "items", 5).is_empty());
        assert!(objects(Some(&data), "items", 5).is_empty());
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        let data = object(json!({"a": "12.5", "b": "n/a", "c": 7}));
        assert!((number(Some(&data), "a", 0.0) - 12.5).abs() < f64::EPSILON);
        assert!((number(Some(&data), "b", 1.0) - 1.0).abs() < f64::EPSILON);
        assert!((number(Some(&data), "c", 0.0) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_products_fill_defaults() {
        let data = object(json!({"products": [{"name": "Serum", "tags": ["AM"]}, "junk"]}));
        let products = products(Some(&data), "products", 3);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Serum");
        assert_eq!(products[0].time_of_day, "AM/PM");
        assert_eq!(products[0].when_to_use, "Daily");
        assert_eq!(products[0].tags, vec!["AM".to_string()]);
    }
}
