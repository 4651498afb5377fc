//! HTTP research backend.
//!
//! Posts `{"query": ...}` to a search endpoint and reduces the JSON reply to
//! one context string.

use std::time::Duration;

use async_trait::async_trait;
use courseforge_shared::{CourseForgeError, ResearchConfig, Result};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{ContextResearcher, truncate_body};

const PROVIDER: &str = "research";

/// Fields checked, in order, for the context text of an object reply.
const CONTEXT_FIELDS: [&str; 5] = ["context", "result", "answer", "content", "text"];

/// Connection settings for [`HttpResearcher`].
#[derive(Debug, Clone)]
pub struct HttpResearcherConfig {
    pub endpoint: String,
    /// Sent as `X-API-Key` when present.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl HttpResearcherConfig {
    pub fn from_config(config: &ResearchConfig, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key,
            timeout,
        }
    }
}

pub struct HttpResearcher {
    client: reqwest::Client,
    config: HttpResearcherConfig,
}

impl HttpResearcher {
    pub fn new(config: HttpResearcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CourseForgeError::transport(PROVIDER, e.to_string()))?;
        Ok(Self { client, config })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(key)
                    .map_err(|e| CourseForgeError::transport(PROVIDER, e.to_string()))?,
            );
        }
        Ok(headers)
    }
}

#[async_trait]
impl ContextResearcher for HttpResearcher {
    #[instrument(skip_all, fields(endpoint = %self.config.endpoint))]
    async fn research(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(self.headers()?)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| CourseForgeError::transport(PROVIDER, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CourseForgeError::transport(
                PROVIDER,
                format!("HTTP {status}: {}", truncate_body(&text)),
            ));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| CourseForgeError::transport(PROVIDER, format!("bad response body: {e}")))?;

        let context = reduce_reply(value);
        debug!(chars = context.len(), "research complete");
        Ok(context)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// Collapse a research reply into text: a bare string, else the first string
/// field among [`CONTEXT_FIELDS`], else compact JSON.
fn reduce_reply(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Object(ref map) => CONTEXT_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn researcher(server: &MockServer, key: Option<&str>) -> HttpResearcher {
        HttpResearcher::new(HttpResearcherConfig {
            endpoint: format!("{}/fast_search", server.uri()),
            api_key: key.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_query_with_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fast_search"))
            .and(header("x-api-key", "rk-test"))
            .and(header("accept", "application/json"))
            .and(body_json(serde_json::json!({"query": "agile trends"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"context": "Scrum is popular."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = researcher(&server, Some("rk-test"))
            .research("agile trends")
            .await
            .unwrap();
        assert_eq!(text, "Scrum is popular.");
    }

    #[tokio::test]
    async fn server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fast_search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = researcher(&server, None).research("q").await.unwrap_err();
        assert!(matches!(err, CourseForgeError::Transport { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn reply_reduction_order() {
        assert_eq!(reduce_reply(Value::String("plain".into())), "plain");
        assert_eq!(
            reduce_reply(serde_json::json!({"text": "t", "answer": "a"})),
            "a"
        );
        assert_eq!(
            reduce_reply(serde_json::json!({"answer": 3, "content": "c"})),
            "c"
        );
        assert_eq!(
            reduce_reply(serde_json::json!({"hits": [1, 2]})),
            r#"{"hits":[1,2]}"#
        );
        assert_eq!(reduce_reply(serde_json::json!([1, 2])), "[1,2]");
    }
}
