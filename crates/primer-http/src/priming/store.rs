//! Ordered store of primed mappings.

use super::queue::{DefaultingQueue, QueueDefault};
use crate::matcher::matches;
use crate::model::{Request, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One request pattern and the responses primed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimedMapping {
    request: Request,
    responses: DefaultingQueue<Response>,
}

impl PrimedMapping {
    pub fn new(request: Request, responses: DefaultingQueue<Response>) -> Self {
        Self { request, responses }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn responses(&self) -> &DefaultingQueue<Response> {
        &self.responses
    }

    pub fn into_parts(self) -> (Request, DefaultingQueue<Response>) {
        (self.request, self.responses)
    }
}

/// A default that survives `reset()`.
pub type StandingDefault = (Request, QueueDefault<Response>);

/// Insertion-ordered collection of [`PrimedMapping`]s.
///
/// Order is append-only apart from removal and is never re-sorted: when
/// several patterns match a request, the first one primed wins. At most one
/// mapping exists per structurally-equal pattern.
///
/// The store is not synchronized; [`crate::Dispatcher`] owns it behind a lock.
#[derive(Debug, Default)]
pub struct PrimingStore {
    mappings: Vec<PrimedMapping>,
    standing: Vec<StandingDefault>,
}

impl PrimingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with defaults that are re-applied on every reset.
    pub fn with_standing_defaults(standing: Vec<StandingDefault>) -> Self {
        let mut store = Self {
            mappings: Vec::new(),
            standing,
        };
        store.seed_standing();
        store
    }

    fn position(&self, pattern: &Request) -> Option<usize> {
        self.mappings.iter().position(|m| &m.request == pattern)
    }

    /// Index of the mapping for `pattern`, creating an empty one at the end if needed.
    fn entry(&mut self, pattern: Request) -> usize {
        match self.position(&pattern) {
            Some(index) => index,
            None => {
                self.mappings
                    .push(PrimedMapping::new(pattern, DefaultingQueue::new()));
                self.mappings.len() - 1
            }
        }
    }

    /// Append `response` to the queue of `pattern`'s mapping.
    ///
    /// An existing mapping keeps its position in the store.
    pub fn add(&mut self, pattern: Request, response: Response) -> PrimedMapping {
        let index = self.entry(pattern);
        let mapping = &mut self.mappings[index];
        mapping.responses.add(response);
        debug!(
            "Primed {} at position {} ({} queued)",
            mapping.request,
            index,
            mapping.responses.primed_len()
        );
        mapping.clone()
    }

    /// Set or overwrite the default of `pattern`'s mapping.
    pub fn add_default(&mut self, pattern: Request, default: QueueDefault<Response>) -> PrimedMapping {
        let index = self.entry(pattern);
        let dynamic = default.is_generator();
        let mapping = &mut self.mappings[index];
        mapping.responses.set_default(default);
        debug!(
            dynamic,
            "Primed default for {} at position {}", mapping.request, index
        );
        mapping.clone()
    }

    /// Serve the next response for `candidate`.
    ///
    /// The first matching mapping in store order is polled. A mapping left
    /// with no primed entries and no default is removed.
    pub fn get_response(&mut self, candidate: &Request) -> Option<Response> {
        let index = self
            .mappings
            .iter()
            .position(|m| matches(&m.request, candidate))?;

        let mapping = &mut self.mappings[index];
        let response = mapping.responses.poll();
        if mapping.responses.is_exhausted() {
            let removed = self.mappings.remove(index);
            debug!("Priming for {} exhausted, removed", removed.request);
        }
        response
    }

    /// Remove the mapping whose pattern is structurally equal to `pattern`.
    pub fn remove(&mut self, pattern: &Request) -> Option<PrimedMapping> {
        let index = self.position(pattern)?;
        Some(self.mappings.remove(index))
    }

    /// Snapshot of all live mappings in store order.
    pub fn current_priming(&self) -> Vec<PrimedMapping> {
        self.mappings.clone()
    }

    /// Clear every mapping, then re-apply the standing defaults.
    pub fn reset(&mut self) {
        self.mappings.clear();
        self.seed_standing();
    }

    fn seed_standing(&mut self) {
        let standing = self.standing.clone();
        for (pattern, default) in standing {
            self.add_default(pattern, default);
        }
    }

    /// Replay exported mappings through `add` / `add_default`.
    ///
    /// Each mapping's primed entries keep their order.
    pub fn upload_batch(&mut self, mappings: impl IntoIterator<Item = PrimedMapping>) {
        for mapping in mappings {
            let (pattern, queue) = mapping.into_parts();
            let (primed, default) = queue.into_parts();
            for response in primed {
                self.add(pattern.clone(), response);
            }
            if let Some(default) = default {
                self.add_default(pattern, default);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
