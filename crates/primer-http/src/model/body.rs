//! Body values shared by request patterns, live requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Tagged body union.
///
/// Matching dispatches on the variant, so a JSON object body never matches a
/// literal body even when their text renderings agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BodyContentRaw", into = "BodyContentRaw")]
pub enum BodyContent {
    /// A JSON scalar (number, bool, null or string). Integral floats are
    /// stored as integers so `1` and `1.0` are the same literal.
    Literal(Value),
    /// Raw text that is compared verbatim.
    JsonString(String),
    /// Ordered list of values, compared by exact equality.
    Array(Vec<Value>),
    /// Keyed values, matched as a subset with regex string values.
    Object(Map<String, Value>),
}

/// Wire form with an explicit discriminant: `{"type": "object", "value": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub(crate) enum BodyContentRaw {
    Literal(Value),
    #[serde(rename = "string")]
    JsonString(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl TryFrom<BodyContentRaw> for BodyContent {
    type Error = String;

    fn try_from(raw: BodyContentRaw) -> Result<Self, Self::Error> {
        match raw {
            BodyContentRaw::Literal(value) => {
                if value.is_array() || value.is_object() {
                    return Err("literal body must be a JSON scalar".to_string());
                }
                Ok(BodyContent::Literal(normalize_numbers(value)))
            }
            BodyContentRaw::JsonString(text) => Ok(BodyContent::JsonString(text)),
            BodyContentRaw::Array(values) => Ok(BodyContent::array(values)),
            BodyContentRaw::Object(map) => Ok(BodyContent::object(map)),
        }
    }
}

impl From<BodyContent> for BodyContentRaw {
    fn from(body: BodyContent) -> Self {
        match body {
            BodyContent::Literal(value) => BodyContentRaw::Literal(value),
            BodyContent::JsonString(text) => BodyContentRaw::JsonString(text),
            BodyContent::Array(values) => BodyContentRaw::Array(values),
            BodyContent::Object(map) => BodyContentRaw::Object(map),
        }
    }
}

impl BodyContent {
    /// Scalar literal. Arrays and objects are routed to their own variants.
    pub fn literal(value: impl Into<Value>) -> Self {
        match normalize_numbers(value.into()) {
            Value::Array(values) => BodyContent::Array(values),
            Value::Object(map) => BodyContent::Object(map),
            scalar => BodyContent::Literal(scalar),
        }
    }

    pub fn json_string(text: impl Into<String>) -> Self {
        BodyContent::JsonString(text.into())
    }

    pub fn array(values: Vec<Value>) -> Self {
        BodyContent::Array(values.into_iter().map(normalize_numbers).collect())
    }

    pub fn object(map: Map<String, Value>) -> Self {
        BodyContent::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_numbers(v)))
                .collect(),
        )
    }

    /// Build an object body from a `serde_json::json!` literal.
    ///
    /// Non-object values fall back to the variant they naturally map to.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => BodyContent::object(map),
            Value::Array(values) => BodyContent::array(values),
            scalar => BodyContent::literal(scalar),
        }
    }

    /// Classify a raw HTTP body.
    ///
    /// Parseable JSON becomes `Object`, `Array` or `Literal`; any other
    /// non-empty text becomes `JsonString`. Empty bodies have no content.
    pub fn from_wire_text(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Some(BodyContent::from_json(value)),
            Err(_) => Some(BodyContent::JsonString(text.to_string())),
        }
    }

    /// Text written to the wire for this body.
    pub fn to_wire_text(&self) -> String {
        match self {
            BodyContent::Literal(Value::String(s)) => s.clone(),
            BodyContent::Literal(other) => other.to_string(),
            BodyContent::JsonString(text) => text.clone(),
            BodyContent::Array(values) => {
                serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
            }
            BodyContent::Object(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }

    /// Whether the wire rendering is a JSON document.
    pub fn is_structured(&self) -> bool {
        matches!(self, BodyContent::Array(_) | BodyContent::Object(_))
    }
}

/// Rewrite integral floats as integers, recursively.
pub(crate) fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(values) => Value::Array(values.into_iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

fn normalize_number(n: Number) -> Number {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                return Number::from(f as i64);
            }
        }
    }
    n
}
