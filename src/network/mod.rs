//! Network layer for engage-core
//!
//! Typed request descriptors, response classification and a pooled
//! executor.

mod client;
mod request;
mod response;

pub use client::NetworkClient;
pub use request::{Method, RequestDescriptor, ResponseDecoder, parse_url};
pub use response::{HttpOutcome, StatusClass};
