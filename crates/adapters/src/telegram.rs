//! Telegram Bot API delivery adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use thread_relay_domain::{DeliverError, MessageSink, OutboundMessage};

/// Telegram channel sink using the Bot API `sendMessage` method
pub struct TelegramSink {
    client: Client,
    bot_token: SecretString,
    chat_id: String,
    base_url: String,
    enabled: bool,
}

impl TelegramSink {
    pub fn new(bot_token: SecretString, chat_id: String) -> Self {
        Self::with_base_url(bot_token, chat_id, "https://api.telegram.org".to_string())
    }

    pub fn with_base_url(bot_token: SecretString, chat_id: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            bot_token,
            chat_id,
            base_url,
            enabled: true,
        }
    }

    /// Create a disabled sink (for dry-run composition: the relay loop never
    /// calls deliver in dry-run mode, so no credentials are needed)
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            bot_token: SecretString::new("".into()),
            chat_id: String::new(),
            base_url: String::new(),
            enabled: false,
        }
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliverError> {
        if !self.enabled {
            return Err(DeliverError::Rejected {
                status: 0,
                body: "Sink is disabled".to_string(),
            });
        }

        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.bot_token.expose_secret()
        );

        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &message.text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliverError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliverError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(post_id = %message.source_post_id, "Message accepted by Telegram");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_message() -> OutboundMessage {
        OutboundMessage {
            text: "escaped body\n#x\n\n<a href=\"https://twitter.com/user/status/123\">Go to post</a>"
                .to_string(),
            source_post_id: "123".to_string(),
        }
    }

    fn sink(mock_server: &MockServer) -> TelegramSink {
        TelegramSink::with_base_url(
            SecretString::new("test-token".into()),
            "-1001234567890".to_string(),
            mock_server.uri(),
        )
    }

    #[tokio::test]
    async fn deliver_sends_html_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_json(serde_json::json!({
                "chat_id": "-1001234567890",
                "text": "escaped body\n#x\n\n<a href=\"https://twitter.com/user/status/123\">Go to post</a>",
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 42 }
            })))
            .mount(&mock_server)
            .await;

        sink(&mock_server).deliver(&sample_message()).await.unwrap();
    }

    #[tokio::test]
    async fn rejection_surfaces_status_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string("{\"ok\":false,\"description\":\"Bad Request\"}"),
            )
            .mount(&mock_server)
            .await;

        let result = sink(&mock_server).deliver(&sample_message()).await;

        match result {
            Err(DeliverError::Rejected { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("Bad Request"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn disabled_sink_refuses_delivery() {
        let sink = TelegramSink::disabled();

        let result = sink.deliver(&sample_message()).await;

        assert!(matches!(result, Err(DeliverError::Rejected { .. })));
    }
}
