//! Concurrency primitives shared by the cache and session layers
//!
//! - Single-flight resolution collapsing concurrent requests for one key
//! - Weak observer registry for change notifications

pub mod observers;
pub mod single_flight;

pub use observers::ObserverRegistry;
pub use single_flight::{AsyncValue, Flight, Retention, SingleFlight};
