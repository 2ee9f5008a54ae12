//! Formatting use case - maps a raw post to an outbound channel message

use thiserror::Error;

use crate::model::{OutboundMessage, Post};

/// Error type for formatting failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Post record is missing required field '{0}'")]
    MissingField(&'static str),
}

/// Configuration for the formatter
#[derive(Debug, Clone)]
pub struct FormatConfig {
    /// Tag marker appended after the post body
    pub tag: String,
    /// Base URL for the link back to the original post; the post id is
    /// appended as the final path segment
    pub link_base: String,
    /// Anchor text for the link
    pub link_label: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            tag: "#x".to_string(),
            link_base: "https://twitter.com/user/status".to_string(),
            link_label: "Go to post".to_string(),
        }
    }
}

/// Pure formatter: no I/O, no retries
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: FormatConfig,
}

impl Formatter {
    pub fn new(config: FormatConfig) -> Self {
        Self { config }
    }

    /// Build the HTML message for a post: escaped body, tag marker, and a
    /// deterministic link back to the original.
    ///
    /// Upstream records with an empty `id` or `text` fail with
    /// [`FormatError`] so the caller can skip and log that single post.
    pub fn format(&self, post: &Post) -> Result<OutboundMessage, FormatError> {
        if post.id.is_empty() {
            return Err(FormatError::MissingField("id"));
        }
        if post.text.is_empty() {
            return Err(FormatError::MissingField("text"));
        }

        let escaped = escape_html(&post.text);
        let url = format!("{}/{}", self.config.link_base, post.id);
        let link = format!("<a href=\"{}\">{}</a>", url, self.config.link_label);

        Ok(OutboundMessage {
            text: format!("{}\n{}\n\n{}", escaped, self.config.tag, link),
            source_post_id: post.id.clone(),
        })
    }
}

/// Escape HTML special characters for an HTML-parse-mode channel
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
