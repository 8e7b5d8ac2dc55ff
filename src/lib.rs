//! # engage-core - client resource and session layer
//!
//! Typed HTTP requests against an engagement API, single-flight
//! resolution of shared values, media caching and session management.
//!
//! ## Architecture
//!
//! - **network**: request descriptors, outcome classification, HTTP executor
//! - **sync**: single-flight values and weak observer registries
//! - **cache**: content cache abstraction and the media cache built on it
//! - **session**: credential persistence, identity resolution, nickname updates
//! - **config**: runtime configuration
//! - **engine**: composition root wiring the services together
//! - **utils**: shared error types

pub mod cache;
pub mod config;
pub mod engine;
pub mod network;
pub mod session;
pub mod sync;
pub mod utils;

// Re-export main types for convenience
pub use cache::{ContentCache, MediaCache, MediaKind, MemoryContentCache, PrefetchReport};
pub use config::{EngageConfig, MediaConfig, NetworkConfig, SessionConfig};
pub use engine::EngageCore;
pub use network::{HttpOutcome, NetworkClient, RequestDescriptor};
pub use session::{AccessToken, CredentialStore, Identity, SessionResolver, SessionState};
pub use utils::error::{EngageError, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "engage-core";
