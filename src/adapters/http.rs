use crate::domain::model::{Article, NewsApiResponse};
use crate::utils::error::{PagesError, Result};
use reqwest::Client;
use std::time::Duration;

/// Query parameters for the NewsAPI `everything` endpoint.
#[derive(Debug, Clone)]
pub struct NewsQuery<'a> {
    pub query: &'a str,
    pub sort_by: &'a str,
    pub page_size: u32,
    pub language: &'a str,
}

pub struct NewsApiClient {
    client: Client,
    endpoint: String,
}

impl NewsApiClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("news-pages/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The key travels in the `X-Api-Key` header so it never shows up in a URL.
    pub async fn fetch_everything(&self, api_key: &str, query: &NewsQuery<'_>) -> Result<Vec<Article>> {
        tracing::debug!("Requesting articles from {}", self.endpoint);

        let page_size = query.page_size.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", api_key)
            .query(&[
                ("q", query.query),
                ("sortBy", query.sort_by),
                ("pageSize", page_size.as_str()),
                ("language", query.language),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("NewsAPI response status: {}", status);
        let body = response.text().await?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<NewsApiResponse>(&body).ok();
            let code = parsed
                .as_ref()
                .and_then(|r| r.code.clone())
                .unwrap_or_else(|| status.as_u16().to_string());
            let message = parsed
                .and_then(|r| r.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(PagesError::NewsApiError { code, message });
        }

        let parsed: NewsApiResponse = serde_json::from_str(&body)?;
        if parsed.is_error() {
            return Err(PagesError::NewsApiError {
                code: parsed.code.unwrap_or_else(|| "unknown".to_string()),
                message: parsed.message.unwrap_or_default(),
            });
        }

        tracing::debug!(
            "NewsAPI reported {} total results, {} returned",
            parsed.total_results.unwrap_or(0),
            parsed.articles.len()
        );
        Ok(parsed.articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn query() -> NewsQuery<'static> {
        NewsQuery {
            query: "AI",
            sort_by: "publishedAt",
            page_size: 20,
            language: "en",
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_expected_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/everything")
                .header("X-Api-Key", "test-key")
                .query_param("q", "AI")
                .query_param("sortBy", "publishedAt")
                .query_param("pageSize", "20")
                .query_param("language", "en");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "ok",
                    "totalResults": 1,
                    "articles": [{"title": "AI news", "url": "https://example.com"}]
                }));
        });

        let client = NewsApiClient::new(server.url("/v2/everything"), Duration::from_secs(5)).unwrap();
        let articles = client.fetch_everything("test-key", &query()).await.unwrap();

        api_mock.assert();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title.as_deref(), Some("AI news"));
    }

    #[tokio::test]
    async fn test_error_payload_becomes_news_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/everything");
            then.status(401)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "error",
                    "code": "apiKeyInvalid",
                    "message": "Your API key is invalid or incorrect."
                }));
        });

        let client = NewsApiClient::new(server.url("/v2/everything"), Duration::from_secs(5)).unwrap();
        let err = client.fetch_everything("secret-key", &query()).await.unwrap_err();

        match &err {
            PagesError::NewsApiError { code, .. } => assert_eq!(code, "apiKeyInvalid"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!err.to_string().contains("secret-key"));
    }

    #[tokio::test]
    async fn test_non_json_failure_uses_status_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/everything");
            then.status(502).body("Bad Gateway");
        });

        let client = NewsApiClient::new(server.url("/v2/everything"), Duration::from_secs(5)).unwrap();
        let err = client.fetch_everything("k", &query()).await.unwrap_err();

        match err {
            PagesError::NewsApiError { code, message } => {
                assert_eq!(code, "502");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
