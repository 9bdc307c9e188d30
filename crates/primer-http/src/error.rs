//! Error types for priming, serving and verification.

use crate::model::Request;
use crate::verify::Times;

/// Failures raised by the priming core.
///
/// All of them are synchronous and local to the call that produced them;
/// nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum PrimingError {
    /// A live request arrived with no matching priming.
    #[error("No priming matches {0}")]
    PrimingNotFound(Box<Request>),
    /// A submitted pattern was rejected before it reached the store.
    #[error("Invalid priming: {0}")]
    InvalidPriming(String),
    /// The recorded history does not satisfy the expected count.
    #[error("Verification failed for {request}: expected {expected} call(s), got {actual}")]
    VerificationFailed {
        request: Box<Request>,
        expected: Times,
        actual: usize,
    },
}

impl PrimingError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        PrimingError::InvalidPriming(message.into())
    }
}
