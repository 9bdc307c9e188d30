//! Request matching.
//!
//! `matches(pattern, candidate)` is asymmetric: the pattern is always the left
//! operand and supplies the regular expressions. It is pure and is used both
//! for live routing and for counting history entries during verification.
//!
//! Rules:
//! - method: equality; an absent method or `ANY` matches everything
//! - path: the pattern path must match the whole candidate path as a regex
//! - headers / query params: every pattern key must be present in the
//!   candidate and every value must match as a full regex; extra candidate
//!   keys are ignored (header names compare case-insensitively)
//! - body: an absent pattern body matches any candidate body; otherwise the
//!   variants must agree and the variant's own rule applies

use crate::error::PrimingError;
use crate::model::{BodyContent, Request};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on cached compiled patterns before the cache is flushed.
const REGEX_CACHE_LIMIT: usize = 4096;

static REGEX_CACHE: Lazy<RwLock<HashMap<String, Arc<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Compile `pattern` anchored at both ends, reusing a cached copy when present.
fn anchored_regex(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    if let Some(regex) = REGEX_CACHE.read().get(pattern) {
        return Ok(Arc::clone(regex));
    }

    let regex = Arc::new(Regex::new(&format!("^(?:{pattern})$"))?);
    let mut cache = REGEX_CACHE.write();
    if cache.len() >= REGEX_CACHE_LIMIT {
        cache.clear();
    }
    cache.insert(pattern.to_string(), Arc::clone(&regex));
    Ok(regex)
}

/// Full-string regex match. Invalid patterns never match.
pub fn full_match(pattern: &str, value: &str) -> bool {
    match anchored_regex(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            debug!("Ignoring invalid pattern '{}': {}", pattern, e);
            false
        }
    }
}

/// Check whether `candidate` satisfies `pattern`.
pub fn matches(pattern: &Request, candidate: &Request) -> bool {
    method_matches(pattern, candidate)
        && full_match(pattern.path(), candidate.path())
        && headers_match(pattern.headers(), candidate.headers())
        && query_matches(pattern.query_params(), candidate.query_params())
        && body_matches(pattern.body(), candidate.body())
}

fn method_matches(pattern: &Request, candidate: &Request) -> bool {
    if pattern.is_any_method() {
        return true;
    }
    pattern.method() == candidate.method()
}

fn headers_match(pattern: &HashMap<String, String>, candidate: &HashMap<String, String>) -> bool {
    pattern.iter().all(|(name, expected)| {
        candidate
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .is_some_and(|(_, actual)| full_match(expected, actual))
    })
}

/// Query values are positional: the candidate must carry the same number of
/// values for the key and each must match the pattern value at that index.
/// An empty pattern list only requires the key to be present.
fn query_matches(
    pattern: &HashMap<String, Vec<String>>,
    candidate: &HashMap<String, Vec<String>>,
) -> bool {
    pattern.iter().all(|(name, expected)| {
        let Some(actual) = candidate.get(name) else {
            return false;
        };
        expected.is_empty()
            || (expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(actual)
                    .all(|(e, a)| full_match(e, a)))
    })
}

fn body_matches(pattern: Option<&BodyContent>, candidate: Option<&BodyContent>) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };
    let Some(candidate) = candidate else {
        return false;
    };
    match (pattern, candidate) {
        (BodyContent::Literal(expected), BodyContent::Literal(actual)) => {
            scalars_equal(expected, actual)
        }
        (BodyContent::JsonString(expected), BodyContent::JsonString(actual)) => expected == actual,
        (BodyContent::Array(expected), BodyContent::Array(actual)) => expected == actual,
        (BodyContent::Object(expected), BodyContent::Object(actual)) => {
            object_matches(expected, actual)
        }
        _ => false,
    }
}

/// Numeric equality when both sides read as numbers, text equality otherwise.
fn scalars_equal(expected: &Value, actual: &Value) -> bool {
    match (as_numeric(expected), as_numeric(actual)) {
        (Some(e), Some(a)) => e.equals(a),
        _ => scalar_text(expected) == scalar_text(actual),
    }
}

/// A number read from a body value. Integers stay exact.
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn from_number(n: &Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            Some(Numeric::Int(i as i128))
        } else if let Some(u) = n.as_u64() {
            Some(Numeric::Int(u as i128))
        } else {
            n.as_f64().map(Numeric::Float)
        }
    }

    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i128>() {
            return Some(Numeric::Int(i));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Numeric::Float)
    }

    /// Integers compare exactly; a float equals an integer only when it is
    /// integral and converts to that exact value.
    fn equals(self, other: Numeric) -> bool {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            (Numeric::Float(a), Numeric::Float(b)) => a == b,
            (Numeric::Int(i), Numeric::Float(f)) | (Numeric::Float(f), Numeric::Int(i)) => {
                f.fract() == 0.0
                    && f >= i128::MIN as f64
                    && f < i128::MAX as f64
                    && f as i128 == i
            }
        }
    }
}

fn as_numeric(value: &Value) -> Option<Numeric> {
    match value {
        Value::Number(n) => Numeric::from_number(n),
        Value::String(s) => Numeric::parse(s),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn object_matches(expected: &Map<String, Value>, actual: &Map<String, Value>) -> bool {
    expected.iter().all(|(key, expected_value)| {
        actual
            .get(key)
            .is_some_and(|actual_value| value_matches(expected_value, actual_value))
    })
}

/// Per-key rule inside an object body.
///
/// String pattern values are regexes over the candidate's text; numbers
/// compare by value regardless of integer/float form, integers exactly; nested objects recurse
/// with the same subset rule; arrays compare element-wise.
fn value_matches(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => {
            match (Numeric::from_number(e), Numeric::from_number(a)) {
                (Some(e), Some(a)) => e.equals(a),
                _ => false,
            }
        }
        (Value::String(pattern), Value::String(text)) => full_match(pattern, text),
        (Value::String(pattern), Value::Number(_) | Value::Bool(_)) => {
            full_match(pattern, &actual.to_string())
        }
        (Value::Object(e), Value::Object(a)) => object_matches(e, a),
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| value_matches(e, a))
        }
        _ => expected == actual,
    }
}

/// Reject patterns that cannot be primed.
///
/// A priming needs an explicit method (`ANY` for a wildcard), a non-empty
/// path, and every regex it carries must compile.
pub fn validate_pattern(pattern: &Request) -> Result<(), PrimingError> {
    match pattern.method() {
        Some(m) if !m.trim().is_empty() => {}
        _ => return Err(PrimingError::invalid("request method is required")),
    }
    if pattern.path().is_empty() {
        return Err(PrimingError::invalid("request path is required"));
    }

    check_regex("path", pattern.path())?;
    for (name, value) in pattern.headers() {
        check_regex(&format!("header '{name}'"), value)?;
    }
    for (name, values) in pattern.query_params() {
        for value in values {
            check_regex(&format!("query parameter '{name}'"), value)?;
        }
    }
    if let Some(BodyContent::Object(map)) = pattern.body() {
        check_object_regexes(map)?;
    }
    Ok(())
}

fn check_regex(field: &str, pattern: &str) -> Result<(), PrimingError> {
    anchored_regex(pattern)
        .map(|_| ())
        .map_err(|e| PrimingError::invalid(format!("{field} is not a valid pattern: {e}")))
}

fn check_object_regexes(map: &Map<String, Value>) -> Result<(), PrimingError> {
    for (key, value) in map {
        match value {
            Value::String(pattern) => check_regex(&format!("body field '{key}'"), pattern)?,
            Value::Object(nested) => check_object_regexes(nested)?,
            Value::Array(values) => {
                for value in values {
                    if let Value::Object(nested) = value {
                        check_object_regexes(nested)?;
                    } else if let Value::String(pattern) = value {
                        check_regex(&format!("body field '{key}'"), pattern)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}
