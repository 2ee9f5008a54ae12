//! thread-relay adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `state`: Append-only file seen-ID store
//! - `x`: X (Twitter) API read adapter
//! - `telegram`: Telegram Bot API delivery adapter

mod state_file;

pub mod telegram;
pub mod x_api;

/// Re-exports for state adapters
pub mod state {
    pub use crate::state_file::FileSeenStore;
}

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::XTimelineSource;
}
