//! Web search through the Tavily API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::SearchProvider;
use crate::error::ProviderError;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
}

/// Search the web with Tavily. The JSON body is returned unchanged.
pub struct TavilySearch {
    http: reqwest::Client,
    api_key: String,
    max_results: u32,
    endpoint: String,
}

impl TavilySearch {
    pub fn new(api_key: String, max_results: u32) -> Self {
        Self::with_endpoint(api_key, max_results, TAVILY_SEARCH_URL)
    }

    pub fn with_endpoint(api_key: String, max_results: u32, endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("search-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key,
            max_results,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Result<Value, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&SearchRequest {
                query,
                max_results: self.max_results,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_query_and_limit() {
        let body = serde_json::to_value(SearchRequest {
            query: "weather in Valencia",
            max_results: 3,
        })
        .expect("serializes");
        assert_eq!(
            body,
            serde_json::json!({ "query": "weather in Valencia", "max_results": 3 })
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let search = TavilySearch::with_endpoint("key".to_string(), 5, "http://127.0.0.1:9/search");
        let err = search.search("anything").await.expect_err("nothing listens on port 9");
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
