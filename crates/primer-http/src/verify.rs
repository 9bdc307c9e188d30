//! Invocation-count criteria for verification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many times a pattern is expected to have been served.
///
/// Wire form: `{"exactly": 2}`, `{"atLeast": 1}`, `{"atMost": 3}` or
/// `{"between": {"min": 1, "max": 3}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Times {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    Between { min: usize, max: usize },
}

impl Times {
    pub const fn once() -> Self {
        Times::Exactly(1)
    }

    pub const fn never() -> Self {
        Times::Exactly(0)
    }

    pub fn is_satisfied_by(&self, count: usize) -> bool {
        match *self {
            Times::Exactly(n) => count == n,
            Times::AtLeast(n) => count >= n,
            Times::AtMost(n) => count <= n,
            Times::Between { min, max } => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Times::Exactly(n) => write!(f, "exactly {n}"),
            Times::AtLeast(n) => write!(f, "at least {n}"),
            Times::AtMost(n) => write!(f, "at most {n}"),
            Times::Between { min, max } => write!(f, "between {min} and {max}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_times_satisfaction() {
        assert!(Times::once().is_satisfied_by(1));
        assert!(!Times::once().is_satisfied_by(2));
        assert!(Times::never().is_satisfied_by(0));
        assert!(Times::AtLeast(2).is_satisfied_by(5));
        assert!(!Times::AtLeast(2).is_satisfied_by(1));
        assert!(Times::AtMost(2).is_satisfied_by(0));
        assert!(!Times::AtMost(2).is_satisfied_by(3));
        assert!(Times::Between { min: 1, max: 3 }.is_satisfied_by(3));
        assert!(!Times::Between { min: 1, max: 3 }.is_satisfied_by(4));
    }

    #[test]
    fn test_times_wire_format() {
        let times: Times = serde_json::from_value(json!({"atLeast": 2})).unwrap();
        assert_eq!(times, Times::AtLeast(2));

        let times: Times =
            serde_json::from_value(json!({"between": {"min": 1, "max": 4}})).unwrap();
        assert_eq!(times, Times::Between { min: 1, max: 4 });
    }

    #[test]
    fn test_times_display() {
        assert_eq!(Times::Exactly(3).to_string(), "exactly 3");
        assert_eq!(
            Times::Between { min: 1, max: 2 }.to_string(),
            "between 1 and 2"
        );
    }
}
