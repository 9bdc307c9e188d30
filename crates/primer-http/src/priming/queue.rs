//! Per-pattern response queue with an optional fallback.

use serde::de::Deserializer;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Serialized stand-in for a generator default, which has no value form.
pub const GENERATED_DEFAULT_MARKER: &str = "<generated>";

/// Fallback served once the primed entries are exhausted.
pub enum QueueDefault<R> {
    /// The same value on every poll.
    Value(R),
    /// Evaluated fresh on every poll; never memoized.
    Generator(Arc<dyn Fn() -> R + Send + Sync>),
}

impl<R: Clone> QueueDefault<R> {
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        QueueDefault::Generator(Arc::new(f))
    }

    /// Produce the default's current value.
    pub fn produce(&self) -> R {
        match self {
            QueueDefault::Value(value) => value.clone(),
            QueueDefault::Generator(generate) => generate(),
        }
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, QueueDefault::Generator(_))
    }
}

impl<R: Clone> Clone for QueueDefault<R> {
    fn clone(&self) -> Self {
        match self {
            QueueDefault::Value(value) => QueueDefault::Value(value.clone()),
            QueueDefault::Generator(generate) => QueueDefault::Generator(Arc::clone(generate)),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for QueueDefault<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            QueueDefault::Generator(_) => f.write_str("Generator(<dynamic>)"),
        }
    }
}

/// Generators are equal only when they are the same closure.
impl<R: PartialEq> PartialEq for QueueDefault<R> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QueueDefault::Value(a), QueueDefault::Value(b)) => a == b,
            (QueueDefault::Generator(a), QueueDefault::Generator(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }
}

/// FIFO of primed entries plus an optional default.
///
/// Each primed entry is handed out at most once; the default can be handed
/// out any number of times.
pub struct DefaultingQueue<R> {
    primed: VecDeque<R>,
    default: Option<QueueDefault<R>>,
}

impl<R> Default for DefaultingQueue<R> {
    fn default() -> Self {
        Self {
            primed: VecDeque::new(),
            default: None,
        }
    }
}

impl<R: Clone> DefaultingQueue<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue holding a single primed entry.
    pub fn single(value: R) -> Self {
        let mut queue = Self::new();
        queue.add(value);
        queue
    }

    /// A queue holding no primed entries and the given default.
    pub fn with_default(default: QueueDefault<R>) -> Self {
        Self {
            primed: VecDeque::new(),
            default: Some(default),
        }
    }

    /// Append to the tail.
    pub fn add(&mut self, value: R) {
        self.primed.push_back(value);
    }

    /// Append several values, keeping their order.
    pub fn add_all(&mut self, values: impl IntoIterator<Item = R>) {
        self.primed.extend(values);
    }

    /// Take the head entry, or fall back to the default.
    pub fn poll(&mut self) -> Option<R> {
        if let Some(value) = self.primed.pop_front() {
            return Some(value);
        }
        self.default.as_ref().map(QueueDefault::produce)
    }

    /// Primed entries in serving order. Does not consume anything.
    pub fn snapshot(&self) -> Vec<R> {
        self.primed.iter().cloned().collect()
    }

    pub fn set_default(&mut self, default: QueueDefault<R>) {
        self.default = Some(default);
    }

    pub fn default_value(&self) -> Option<&QueueDefault<R>> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn primed_len(&self) -> usize {
        self.primed.len()
    }

    /// No primed entries left and nothing to fall back on.
    pub fn is_exhausted(&self) -> bool {
        self.primed.is_empty() && self.default.is_none()
    }

    /// Drop both the primed entries and the default.
    pub fn reset(&mut self) {
        self.primed.clear();
        self.default = None;
    }

    /// Split into primed entries and default.
    pub fn into_parts(self) -> (Vec<R>, Option<QueueDefault<R>>) {
        (self.primed.into(), self.default)
    }
}

impl<R: Clone> Clone for DefaultingQueue<R> {
    fn clone(&self) -> Self {
        Self {
            primed: self.primed.clone(),
            default: self.default.clone(),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for DefaultingQueue<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultingQueue")
            .field("primed", &self.primed)
            .field("default", &self.default)
            .finish()
    }
}

impl<R: PartialEq> PartialEq for DefaultingQueue<R> {
    fn eq(&self, other: &Self) -> bool {
        self.primed == other.primed && self.default == other.default
    }
}

/// Wire form: `{"primed": [...], "default": <R> | "<generated>" | null}`
impl<R: Serialize> Serialize for DefaultingQueue<R> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("DefaultingQueue", 2)?;
        state.serialize_field("primed", &self.primed)?;
        match &self.default {
            Some(QueueDefault::Value(value)) => state.serialize_field("default", value)?,
            Some(QueueDefault::Generator(_)) => {
                state.serialize_field("default", GENERATED_DEFAULT_MARKER)?
            }
            None => state.serialize_field("default", &Option::<R>::None)?,
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct DefaultingQueueRaw<R> {
    #[serde(default = "Vec::new")]
    primed: Vec<R>,
    #[serde(default = "Option::default")]
    default: Option<DefaultRaw<R>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefaultRaw<R> {
    Value(R),
    Opaque(String),
}

/// Generator markers cannot be revived and are dropped.
impl<'de, R: Deserialize<'de>> Deserialize<'de> for DefaultingQueue<R> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = DefaultingQueueRaw::<R>::deserialize(deserializer)?;
        let default = match raw.default {
            Some(DefaultRaw::Value(value)) => Some(QueueDefault::Value(value)),
            Some(DefaultRaw::Opaque(marker)) => {
                warn!("Dropping non-restorable default '{}'", marker);
                None
            }
            None => None,
        };
        Ok(Self {
            primed: raw.primed.into(),
            default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fifo_order() {
        let mut queue = DefaultingQueue::new();
        queue.add("A");
        queue.add("B");
        assert_eq!(queue.poll(), Some("A"));
        assert_eq!(queue.poll(), Some("B"));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_static_default_after_drain() {
        let mut queue = DefaultingQueue::new();
        queue.add_all(["A", "B"]);
        queue.set_default(QueueDefault::Value("D"));

        assert_eq!(queue.poll(), Some("A"));
        assert_eq!(queue.poll(), Some("B"));
        for _ in 0..5 {
            assert_eq!(queue.poll(), Some("D"));
        }
        assert!(!queue.is_exhausted());
    }

    #[test]
    fn test_generator_default_is_evaluated_every_poll() {
        let counter = Arc::new(AtomicUsize::new(0));
        let generator_counter = Arc::clone(&counter);
        let mut queue: DefaultingQueue<usize> = DefaultingQueue::with_default(
            QueueDefault::generator(move || generator_counter.fetch_add(1, Ordering::SeqCst)),
        );

        assert_eq!(queue.poll(), Some(0));
        assert_eq!(queue.poll(), Some(1));
        assert_eq!(queue.poll(), Some(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(queue.default_value().is_some_and(QueueDefault::is_generator));
    }

    #[test]
    fn test_snapshot_does_not_consume() {
        let mut queue = DefaultingQueue::new();
        queue.add_all([1, 2, 3]);
        assert_eq!(queue.snapshot(), vec![1, 2, 3]);
        assert_eq!(queue.primed_len(), 3);
        assert_eq!(queue.poll(), Some(1));
        assert_eq!(queue.snapshot(), vec![2, 3]);
    }

    #[test]
    fn test_reset_clears_default() {
        let mut queue = DefaultingQueue::single(1);
        queue.set_default(QueueDefault::Value(9));
        queue.reset();
        assert!(queue.is_exhausted());
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_equality_distinguishes_defaults() {
        let plain = DefaultingQueue::single(1);
        let mut with_default = DefaultingQueue::single(1);
        with_default.set_default(QueueDefault::Value(0));
        assert_ne!(plain, with_default);

        let generator: QueueDefault<i32> = QueueDefault::generator(|| 5);
        let same = generator.clone();
        let other: QueueDefault<i32> = QueueDefault::generator(|| 5);
        assert_eq!(generator, same);
        assert_ne!(generator, other);
        assert_ne!(generator, QueueDefault::Value(5));
    }

    #[test]
    fn test_serialization() {
        let mut queue = DefaultingQueue::single(1);
        assert_eq!(
            serde_json::to_value(&queue).unwrap(),
            json!({"primed": [1], "default": null})
        );

        queue.set_default(QueueDefault::Value(7));
        assert_eq!(
            serde_json::to_value(&queue).unwrap(),
            json!({"primed": [1], "default": 7})
        );

        queue.set_default(QueueDefault::generator(|| 3));
        assert_eq!(
            serde_json::to_value(&queue).unwrap(),
            json!({"primed": [1], "default": "<generated>"})
        );
    }

    #[test]
    fn test_deserialization_drops_generator_marker() {
        let queue: DefaultingQueue<i32> =
            serde_json::from_value(json!({"primed": [1, 2], "default": "<generated>"})).unwrap();
        assert_eq!(queue.snapshot(), vec![1, 2]);
        assert!(!queue.has_default());

        let queue: DefaultingQueue<i32> =
            serde_json::from_value(json!({"default": 4})).unwrap();
        assert_eq!(queue.primed_len(), 0);
        assert_eq!(queue.default_value(), Some(&QueueDefault::Value(4)));
    }
}
