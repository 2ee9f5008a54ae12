//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single authored post fetched from the watched account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Platform-specific post ID, string-comparable even when numeric
    pub id: String,
    /// Post text content
    pub text: String,
    /// When the post was created
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Conversation the post belongs to, if the platform reported one
    pub conversation_id: Option<String>,
}

/// A formatted message ready for delivery to the destination channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Markup-formatted text payload
    pub text: String,
    /// ID of the post this message was built from
    pub source_post_id: String,
}

/// Outcome of handling a single post within a cycle.
///
/// Used only for logging and observability; never persisted.
#[derive(Debug)]
pub enum RelayOutcome {
    /// Post was delivered and recorded as seen
    Delivered,
    /// Post was skipped (already seen, unformattable, etc.)
    Skipped { reason: String },
    /// Delivery was attempted and failed; the post stays unseen
    Failed { error: String },
}
