//! X API read adapter for fetching posts and reply threads

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thread_relay_domain::{FetchError, Post, PostSource};
use time::OffsetDateTime;

// X API v2 page-size bounds
const TIMELINE_MIN_RESULTS: u32 = 5;
const SEARCH_MIN_RESULTS: u32 = 10;
const MAX_RESULTS: u32 = 100;

/// X API post source reading a user timeline and recent-search threads
pub struct XTimelineSource {
    client: Client,
    bearer_token: SecretString,
    base_url: String,
}

impl XTimelineSource {
    pub fn new(bearer_token: SecretString) -> Self {
        Self::with_base_url(bearer_token, "https://api.twitter.com".to_string())
    }

    pub fn with_base_url(bearer_token: SecretString, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            bearer_token,
            base_url,
        }
    }

    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<TweetsResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(
                "Authorization",
                format!("Bearer {}", self.bearer_token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(FetchError::Auth("Invalid bearer token".to_string()));
        }

        if response.status() == 429 {
            return Err(FetchError::RateLimited(rate_limit_reset(&response)));
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(format!("Request failed: {}", body)));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Api(e.to_string()))
    }
}

/// Duration until the window reset advertised by the `x-rate-limit-reset`
/// header (a unix timestamp), if present
fn rate_limit_reset(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(|ts| {
            let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
            Duration::from_secs(ts.saturating_sub(now))
        })
}

#[derive(Deserialize)]
struct TweetsResponse {
    data: Option<Vec<Tweet>>,
}

#[derive(Deserialize)]
struct Tweet {
    id: String,
    text: String,
    created_at: Option<String>,
    conversation_id: Option<String>,
}

impl Tweet {
    fn into_post(self) -> Post {
        let created_at = self
            .created_at
            .as_ref()
            .and_then(|s| {
                OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).ok()
            })
            .unwrap_or_else(OffsetDateTime::now_utc);

        Post {
            id: self.id,
            text: self.text,
            created_at,
            conversation_id: self.conversation_id,
        }
    }
}

#[async_trait]
impl PostSource for XTimelineSource {
    async fn fetch_original_posts(
        &self,
        account: &str,
        limit: u32,
    ) -> Result<Vec<Post>, FetchError> {
        tracing::info!(account = %account, limit, "Fetching original posts");

        let url = format!("{}/2/users/{}/tweets", self.base_url, account);
        let max_results = limit.clamp(TIMELINE_MIN_RESULTS, MAX_RESULTS);
        let query = [
            ("exclude", "retweets,replies".to_string()),
            ("tweet.fields", "conversation_id,created_at".to_string()),
            ("max_results", max_results.to_string()),
        ];

        let response = self.get_json(&url, &query).await?;
        let posts: Vec<Post> = response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Tweet::into_post)
            .collect();

        tracing::info!(account = %account, count = posts.len(), "Fetched original posts");

        Ok(posts)
    }

    async fn fetch_thread_replies(
        &self,
        account: &str,
        root_post_id: &str,
        max_results: u32,
    ) -> Result<Vec<Post>, FetchError> {
        tracing::info!(account = %account, root = %root_post_id, "Fetching reply thread");

        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let max_results = max_results.clamp(SEARCH_MIN_RESULTS, MAX_RESULTS);
        let query = [
            (
                "query",
                format!("from:{} conversation_id:{}", account, root_post_id),
            ),
            ("tweet.fields", "conversation_id,created_at".to_string()),
            ("max_results", max_results.to_string()),
        ];

        let response = self.get_json(&url, &query).await?;
        let posts: Vec<Post> = response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Tweet::into_post)
            .collect();

        tracing::info!(root = %root_post_id, count = posts.len(), "Fetched reply thread");

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(mock_server: &MockServer) -> XTimelineSource {
        XTimelineSource::with_base_url(SecretString::new("test-token".into()), mock_server.uri())
    }

    #[tokio::test]
    async fn fetch_original_posts_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .and(header("Authorization", "Bearer test-token"))
            .and(query_param("exclude", "retweets,replies"))
            .and(query_param("max_results", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {
                        "id": "tweet1",
                        "text": "Hello world",
                        "created_at": "2024-01-15T12:00:00Z",
                        "conversation_id": "tweet1"
                    },
                    {
                        "id": "tweet2",
                        "text": "Another post",
                        "created_at": "2024-01-15T13:00:00Z",
                        "conversation_id": "tweet2"
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let posts = source(&mock_server)
            .fetch_original_posts("12345", 10)
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "tweet1");
        assert_eq!(posts[0].conversation_id.as_deref(), Some("tweet1"));
        assert_eq!(posts[1].text, "Another post");
    }

    #[tokio::test]
    async fn requested_limit_is_passed_through() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .and(query_param("max_results", "25"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&mock_server)
            .await;

        let posts = source(&mock_server)
            .fetch_original_posts("12345", 25)
            .await
            .unwrap();

        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn limit_is_clamped_to_api_bounds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .and(query_param("max_results", "5"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&mock_server)
            .await;

        // The timeline endpoint rejects max_results below 5
        let result = source(&mock_server).fetch_original_posts("12345", 1).await;

        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_data_field_is_an_empty_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": { "result_count": 0 }
            })))
            .mount(&mock_server)
            .await;

        let posts = source(&mock_server)
            .fetch_original_posts("12345", 10)
            .await
            .unwrap();

        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn fetch_thread_replies_builds_conversation_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .and(query_param("query", "from:tracked conversation_id:root1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {
                        "id": "reply1",
                        "text": "follow-up",
                        "created_at": "2024-01-15T14:00:00Z",
                        "conversation_id": "root1"
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let posts = source(&mock_server)
            .fetch_thread_replies("tracked", "root1", 50)
            .await
            .unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "reply1");
        assert_eq!(posts[0].conversation_id.as_deref(), Some("root1"));
    }

    #[tokio::test]
    async fn rate_limited_carries_reset_duration() {
        let mock_server = MockServer::start().await;

        let reset = OffsetDateTime::now_utc().unix_timestamp() as u64 + 120;
        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("x-rate-limit-reset", reset.to_string().as_str()),
            )
            .mount(&mock_server)
            .await;

        let result = source(&mock_server).fetch_original_posts("12345", 10).await;

        match result {
            Err(FetchError::RateLimited(Some(wait))) => {
                assert!(wait <= Duration::from_secs(120));
                assert!(wait >= Duration::from_secs(110));
            }
            other => panic!("expected RateLimited with reset, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rate_limited_without_header_has_no_reset() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let result = source(&mock_server).fetch_original_posts("12345", 10).await;

        assert!(matches!(result, Err(FetchError::RateLimited(None))));
    }

    #[tokio::test]
    async fn auth_error_on_401() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = source(&mock_server).fetch_original_posts("12345", 10).await;

        assert!(matches!(result, Err(FetchError::Auth(_))));
    }

    #[tokio::test]
    async fn server_error_surfaces_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12345/tweets"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&mock_server)
            .await;

        let result = source(&mock_server).fetch_original_posts("12345", 10).await;

        match result {
            Err(FetchError::Api(message)) => assert!(message.contains("internal error")),
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}
