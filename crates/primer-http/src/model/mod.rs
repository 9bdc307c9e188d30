//! Value model: immutable request, response and body descriptions.
//!
//! - `request`: `Request`, used both as a priming pattern and a live request
//! - `response`: `Response`, the canned reply for a pattern
//! - `body`: `BodyContent`, the tagged body union shared by both

mod body;
mod request;
mod response;

pub use body::BodyContent;
pub use request::{parse_query_multimap, Request, ANY_METHOD};
pub use response::Response;
