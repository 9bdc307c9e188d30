//! Primer: an HTTP test double.
//!
//! Tests prime request patterns with canned responses, point the system
//! under test at the server, then inspect and verify the traffic it saw.
//!
//! ## Module Structure
//!
//! - `model`: `Request`, `Response` and `BodyContent` values
//! - `matcher`: pattern-to-request matching
//! - `priming`: per-pattern response queues and the ordered store
//! - `journal`: bounded request logs
//! - `verify`: invocation-count criteria
//! - `dispatcher`: the shared, lock-guarded core
//! - `config`: server configuration
//! - `server`: hyper HTTP/1 front end

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod journal;
pub mod matcher;
pub mod model;
pub mod priming;
pub mod server;
pub mod verify;

pub use config::{ServerConfig, StandingDefaultConfig};
pub use dispatcher::Dispatcher;
pub use error::PrimingError;
pub use journal::{BoundedLog, Exchange};
pub use model::{BodyContent, Request, Response};
pub use priming::{DefaultingQueue, PrimedMapping, PrimingStore, QueueDefault};
pub use server::{PrimerServer, ADMIN_PREFIX};
pub use verify::Times;
