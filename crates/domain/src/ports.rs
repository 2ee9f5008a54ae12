//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::model::{OutboundMessage, Post};

/// Error type for post fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<Duration>),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for fetching posts from the upstream platform
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch the most recent original (non-repost, non-reply) posts authored
    /// by the account. An empty result is `Ok(vec![])`, not an error.
    async fn fetch_original_posts(
        &self,
        account: &str,
        limit: u32,
    ) -> Result<Vec<Post>, FetchError>;

    /// Fetch posts authored by the account within the conversation rooted at
    /// `root_post_id`.
    async fn fetch_thread_replies(
        &self,
        account: &str,
        root_post_id: &str,
        max_results: u32,
    ) -> Result<Vec<Post>, FetchError>;
}

/// Error type for message delivery operations
#[derive(Debug, Error)]
pub enum DeliverError {
    #[error("Destination rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for delivering formatted messages to the destination channel
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliverError>;
}

/// Error type for the seen-ID store
#[derive(Debug, Error)]
pub enum SeenStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store error: {0}")]
    Store(String),
}

/// Port for the durable set of already-delivered post IDs.
///
/// Membership checks are answered from memory; `record` is append-only and
/// durable. IDs are never removed.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn contains(&self, id: &str) -> Result<bool, SeenStoreError>;

    async fn record(&self, id: &str) -> Result<(), SeenStoreError>;
}
