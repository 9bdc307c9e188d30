//! Canned responses served for primed patterns.

use super::body::BodyContent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// An immutable response description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    status_code: u16,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<BodyContent>,
    /// Delay before the response is written, in milliseconds on the wire.
    #[serde(default, with = "delay_millis", skip_serializing_if = "Option::is_none")]
    delay: Option<Duration>,
    /// Marks the response for the templating collaborator.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    templated: bool,
}

pub(crate) fn default_status_code() -> u16 {
    200
}

/// Deserialize statusCode from either a number or a string
pub(crate) fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .filter(|n| (100..=999).contains(n))
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        serde_json::Value::String(s) => s
            .parse::<u16>()
            .ok()
            .filter(|n| (100..=999).contains(n))
            .ok_or_else(|| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("statusCode must be a number or string")),
    }
}

mod delay_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(delay: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match delay {
            Some(d) => serializer.serialize_u64(d.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.filter(|ms| *ms > 0).map(Duration::from_millis))
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(default_status_code())
    }
}

impl Response {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: None,
            delay: None,
            templated: false,
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&BodyContent> {
        self.body.as_ref()
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn is_templated(&self) -> bool {
        self.templated
    }

    pub fn with_status(self, status_code: u16) -> Self {
        Self {
            status_code,
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

    pub fn with_body(self, body: BodyContent) -> Self {
        Self {
            body: Some(body),
            ..self
        }
    }

    /// Delays have millisecond granularity; partial milliseconds round up.
    pub fn with_delay(self, delay: Duration) -> Self {
        let millis = u64::try_from(delay.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        Self {
            delay: Some(Duration::from_millis(millis)).filter(|d| !d.is_zero()),
            ..self
        }
    }

    pub fn with_templated(self, templated: bool) -> Self {
        Self { templated, ..self }
    }
}
