//! Request values: both priming patterns and live requests use this type.

use super::body::BodyContent;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Method wildcard accepted in patterns (case-insensitive on input).
pub const ANY_METHOD: &str = "ANY";

/// An immutable request description.
///
/// As a pattern, `path`, header values and query values are regular
/// expressions that must match the whole candidate value. As a live request
/// they are literal values. Equality is structural and is what identifies a
/// priming; see [`crate::matcher::matches`] for routing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(
        default,
        deserialize_with = "deserialize_method",
        skip_serializing_if = "Option::is_none"
    )]
    method: Option<String>,
    #[serde(default)]
    path: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    query_params: HashMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<BodyContent>,
}

fn deserialize_method<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let method = Option::<String>::deserialize(deserializer)?;
    Ok(method.map(|m| m.to_ascii_uppercase()))
}

impl Request {
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: Some(method.as_ref().to_ascii_uppercase()),
            path: path.into(),
            ..Self::default()
        }
    }

    /// A pattern matching any method on `path`.
    pub fn any_method(path: impl Into<String>) -> Self {
        Self::new(ANY_METHOD, path)
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// True when this request, used as a pattern, accepts every method.
    pub fn is_any_method(&self) -> bool {
        self.method
            .as_deref()
            .map_or(true, |m| m.eq_ignore_ascii_case(ANY_METHOD))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn query_params(&self) -> &HashMap<String, Vec<String>> {
        &self.query_params
    }

    pub fn body(&self) -> Option<&BodyContent> {
        self.body.as_ref()
    }

    pub fn with_method(self, method: impl AsRef<str>) -> Self {
        Self {
            method: Some(method.as_ref().to_ascii_uppercase()),
            ..self
        }
    }

    /// Clear the method. As a pattern this matches every method; it is not
    /// accepted by priming calls.
    pub fn without_method(self) -> Self {
        Self {
            method: None,
            ..self
        }
    }

    pub fn with_path(self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(self, headers: HashMap<String, String>) -> Self {
        Self { headers, ..self }
    }

    /// Append one value to a query parameter.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_query_params(self, query_params: HashMap<String, Vec<String>>) -> Self {
        Self {
            query_params,
            ..self
        }
    }

    pub fn with_body(self, body: BodyContent) -> Self {
        Self {
            body: Some(body),
            ..self
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.as_deref().unwrap_or(ANY_METHOD), self.path)
    }
}

/// Parse a raw query string into a multimap, URL-decoding keys and values.
pub fn parse_query_multimap(query: Option<&str>) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    let Some(query) = query else {
        return params;
    };
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(&key.replace('+', " "))
            .map(|k| k.into_owned())
            .unwrap_or_else(|_| key.to_string());
        let value = urlencoding::decode(&value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        params.entry(key).or_default().push(value);
    }
    params
}
