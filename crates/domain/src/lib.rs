//! thread-relay domain crate
//!
//! This crate contains the core relay logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `retry`: Retry policy and the retrying post-source decorator
//! - `usecases`: Formatting and the poll/deliver relay loop

pub mod model;
pub mod ports;
pub mod retry;
pub mod usecases;

pub use model::*;
pub use ports::*;
pub use retry::{RetryClass, RetryPolicy, Retryable, RetryingSource};
