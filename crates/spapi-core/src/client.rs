use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::{Result, SpapiError};
use crate::query::QueryRequest;

// Upstream error bodies can be whole HTML pages; keep logs and errors short.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Executes parameterized queries against the upstream analytics service.
///
/// Implementations return the `data` member of the response.
#[async_trait]
pub trait RemoteQueryClient: Send + Sync {
    async fn execute(&self, request: &QueryRequest) -> Result<Value>;
}

#[derive(Clone)]
pub struct GraphqlClient {
    api_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl GraphqlClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| SpapiError::Config(format!("invalid upstream token: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            api_url: config.api_url.clone(),
            http,
        })
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl RemoteQueryClient for GraphqlClient {
    async fn execute(&self, request: &QueryRequest) -> Result<Value> {
        debug!(
            operation = request.operation_name(),
            report = request.report(),
            "sending upstream query"
        );
        let response = self
            .http
            .post(&self.api_url)
            .json(&request.to_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpapiError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let envelope = response.json::<Value>().await?;
        unwrap_data(envelope)
    }
}

fn unwrap_data(mut envelope: Value) -> Result<Value> {
    let errors = envelope
        .get("errors")
        .and_then(Value::as_array)
        .filter(|errors| !errors.is_empty());
    if let Some(errors) = errors {
        let messages = errors
            .iter()
            .map(|err| {
                err.get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| err.to_string(), ToString::to_string)
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SpapiError::UpstreamGraphql(truncate(&messages)));
    }

    match envelope.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(SpapiError::MalformedResponse(
            "response has no data member".to_string(),
        )),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwrap_data_returns_data_member() {
        let data = unwrap_data(json!({"data": {"reportData": {"report": null}}})).expect("data");
        assert_eq!(data, json!({"reportData": {"report": null}}));
    }

    #[test]
    fn unwrap_data_surfaces_graphql_errors() {
        let err = unwrap_data(json!({
            "data": null,
            "errors": [{"message": "This report does not exist."}, {"code": 7}]
        }))
        .expect_err("must fail");
        match err {
            SpapiError::UpstreamGraphql(message) => {
                assert_eq!(message, "This report does not exist.; {\"code\":7}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unwrap_data_rejects_missing_data() {
        assert!(matches!(
            unwrap_data(json!({"data": null})),
            Err(SpapiError::MalformedResponse(_))
        ));
        assert!(matches!(
            unwrap_data(json!({"errors": []})),
            Err(SpapiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn truncate_caps_long_bodies() {
        let long = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let cut = truncate(&long);
        assert_eq!(cut.len(), MAX_ERROR_BODY_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn debug_output_hides_token() {
        let client = GraphqlClient::new(&UpstreamConfig {
            api_url: "http://127.0.0.1:9/".to_string(),
            token: "secret-token".to_string(),
            timeout_ms: 1000,
        })
        .expect("client");
        let rendered = format!("{client:?}");
        assert!(rendered.contains("127.0.0.1:9"));
        assert!(!rendered.contains("secret-token"));
    }
}
