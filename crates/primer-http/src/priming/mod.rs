//! Priming engine: per-pattern response queues and the store that owns them.
//!
//! ## Module Structure
//!
//! - `queue`: `DefaultingQueue<R>` and its `QueueDefault<R>` fallback
//! - `store`: `PrimingStore`, the ordered collection of `PrimedMapping`s

mod queue;
mod store;

pub use queue::{DefaultingQueue, QueueDefault, GENERATED_DEFAULT_MARKER};
pub use store::{PrimedMapping, PrimingStore, StandingDefault};
