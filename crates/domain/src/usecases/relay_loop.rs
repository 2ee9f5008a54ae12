//! Relay loop use case - orchestrates fetch, dedup, ordering, and delivery

use std::sync::Arc;

use crate::{
    model::{Post, RelayOutcome},
    ports::{MessageSink, PostSource, SeenStore},
    usecases::format::Formatter,
};

/// Configuration for the relay loop
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Account to watch
    pub account: String,
    /// Page size requested when fetching original posts
    pub fetch_limit: u32,
    /// Page size requested when fetching a reply thread
    pub thread_fetch_limit: u32,
    /// Log rendered messages instead of delivering; nothing is recorded seen
    pub dry_run: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            fetch_limit: 10,
            thread_fetch_limit: 50,
            dry_run: false,
        }
    }
}

/// Errors that abort the remainder of a cycle.
///
/// The caller logs these and proceeds to the next cycle; they never crash the
/// process.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("Thread fetch failed for {root}: {message}")]
    ThreadFetch { root: String, message: String },
}

/// Relay loop orchestrator
///
/// One cycle fetches the account's recent originals, delivers the unseen ones
/// newest-first, and walks each delivered original's reply thread oldest-first.
/// A post id is recorded seen only after its delivery succeeded.
pub struct RelayLoop<S, K, St>
where
    S: PostSource + ?Sized,
    K: MessageSink + ?Sized,
    St: SeenStore + ?Sized,
{
    source: Arc<S>,
    sink: Arc<K>,
    seen: Arc<St>,
    formatter: Formatter,
    config: RelayConfig,
}

impl<S, K, St> RelayLoop<S, K, St>
where
    S: PostSource + ?Sized,
    K: MessageSink + ?Sized,
    St: SeenStore + ?Sized,
{
    pub fn new(
        source: Arc<S>,
        sink: Arc<K>,
        seen: Arc<St>,
        formatter: Formatter,
        config: RelayConfig,
    ) -> Self {
        Self {
            source,
            sink,
            seen,
            formatter,
            config,
        }
    }

    /// Run a single poll cycle
    pub async fn poll_once(&self) -> Result<Vec<(String, RelayOutcome)>, RelayError> {
        tracing::info!(account = %self.config.account, "Checking for new posts");

        let mut posts = self
            .source
            .fetch_original_posts(&self.config.account, self.config.fetch_limit)
            .await
            .map_err(|e| RelayError::Fetch(e.to_string()))?;

        if posts.is_empty() {
            tracing::debug!(account = %self.config.account, "No new posts");
            return Ok(vec![]);
        }

        tracing::info!(account = %self.config.account, count = posts.len(), "Fetched posts");

        // Newest first within a batch: the documented delivery order
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut results = Vec::new();

        for post in &posts {
            if self.is_seen(&post.id).await {
                tracing::debug!(post_id = %post.id, "Already delivered, skipping");
                results.push((
                    post.id.clone(),
                    RelayOutcome::Skipped {
                        reason: "already delivered".to_string(),
                    },
                ));
                continue;
            }

            let outcome = self.relay_post(post).await;
            let delivered = matches!(outcome, RelayOutcome::Delivered);
            results.push((post.id.clone(), outcome));

            // Only a delivered original gets its thread walked; a failed or
            // unformattable root would put replies ahead of it in the channel
            if delivered {
                results.extend(self.relay_thread(post).await?);
            }
        }

        Ok(results)
    }

    /// Deliver the account's own replies in `root`'s conversation, oldest
    /// first. A failed reply aborts the rest of the thread so replies never
    /// land out of order.
    async fn relay_thread(&self, root: &Post) -> Result<Vec<(String, RelayOutcome)>, RelayError> {
        let mut replies = self
            .source
            .fetch_thread_replies(&self.config.account, &root.id, self.config.thread_fetch_limit)
            .await
            .map_err(|e| RelayError::ThreadFetch {
                root: root.id.clone(),
                message: e.to_string(),
            })?;

        if replies.is_empty() {
            return Ok(vec![]);
        }

        tracing::info!(root = %root.id, count = replies.len(), "Fetched reply thread");

        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut results = Vec::new();

        for reply in &replies {
            if reply.id == root.id {
                continue;
            }

            if self.is_seen(&reply.id).await {
                tracing::debug!(post_id = %reply.id, "Already delivered, skipping");
                results.push((
                    reply.id.clone(),
                    RelayOutcome::Skipped {
                        reason: "already delivered".to_string(),
                    },
                ));
                continue;
            }

            let outcome = self.relay_post(reply).await;
            let failed = matches!(outcome, RelayOutcome::Failed { .. });
            results.push((reply.id.clone(), outcome));

            if failed {
                tracing::warn!(root = %root.id, "Aborting thread after delivery failure");
                break;
            }
        }

        Ok(results)
    }

    /// Format and deliver one post, recording it seen only on success
    async fn relay_post(&self, post: &Post) -> RelayOutcome {
        let message = match self.formatter.format(post) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(post_id = %post.id, error = %error, "Unformattable post, skipping");
                return RelayOutcome::Skipped {
                    reason: error.to_string(),
                };
            }
        };

        if self.config.dry_run {
            tracing::info!(post_id = %post.id, text = %message.text, "[DRY RUN] Would deliver");
            return RelayOutcome::Delivered;
        }

        if let Err(error) = self.sink.deliver(&message).await {
            tracing::error!(post_id = %post.id, error = %error, "Delivery failed");
            return RelayOutcome::Failed {
                error: error.to_string(),
            };
        }

        tracing::info!(post_id = %post.id, "Delivered post");

        if let Err(error) = self.seen.record(&post.id).await {
            // The post is already out; at worst this costs one duplicate
            // delivery after a restart
            tracing::error!(post_id = %post.id, error = %error, "Failed to record seen id");
        }

        RelayOutcome::Delivered
    }

    async fn is_seen(&self, id: &str) -> bool {
        match self.seen.contains(id).await {
            Ok(seen) => seen,
            Err(error) => {
                tracing::warn!(post_id = %id, error = %error, "Seen check failed, treating as unseen");
                false
            }
        }
    }
}
