//! HTTP/1 front end over a shared [`Dispatcher`](crate::Dispatcher).
//!
//! ## Module Structure
//!
//! - `listener`: `PrimerServer`, the accept loop
//! - `router`: splits admin requests (under [`ADMIN_PREFIX`]) from live traffic
//! - `admin`: priming, inspection and verification endpoints
//! - `live`: normalizes live requests and writes primed responses
//! - `types`: JSON payloads and response helpers

mod admin;
mod listener;
mod live;
mod router;
mod types;

pub use listener::PrimerServer;
pub use router::ADMIN_PREFIX;
pub use types::{CountResponse, PrimeRequest, VerifyRequest};
