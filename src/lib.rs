// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod matcher;
pub mod metadata;
pub mod metrics;
pub mod partition;
pub mod pipeline;
pub mod upstream;

pub use crate::api::{router, AppState};
pub use crate::error::{ApiError, PipelineError};
pub use crate::partition::{AlertFeedKind, AlertFeeds};
