//! services/api/src/adapters/inference_llm.rs
//!
//! This module contains the adapter for hosted text-generation inference
//! endpoints. It implements the `GenerationService` port from the `core` crate.
//!
//! These endpoints stop after `max_new_tokens` wherever that falls, so their
//! output needs truncation repair.

use std::time::Duration;

use async_trait::async_trait;
use learning_assistant_core::{
    domain::{GenerationParams, GenerationResult, OutputMode},
    ports::GenerationService,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct Candidate {
    generated_text: Option<String>,
}

/// The endpoint answers with a list of candidates, an error object, or a
/// single candidate. Variant order matters for untagged matching.
#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Candidates(Vec<Candidate>),
    Error { error: String },
    Single(Candidate),
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerationService` against a hosted inference endpoint.
#[derive(Clone)]
pub struct InferenceEndpointAdapter {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl InferenceEndpointAdapter {
    /// Creates a new `InferenceEndpointAdapter`. Every call is bounded by `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

//=========================================================================================
// `GenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerationService for InferenceEndpointAdapter {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationResult {
        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: params.max_tokens,
                temperature: params.temperature,
                return_full_text: false,
            },
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("Sending inference request to {}", self.endpoint);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return GenerationResult::failure("inference endpoint timed out")
            }
            Err(e) => return GenerationResult::failure(format!("request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return GenerationResult::failure(format!(
                "endpoint returned {}: {}",
                status,
                detail.trim()
            ));
        }

        match response.json::<InferenceResponse>().await {
            Ok(InferenceResponse::Candidates(candidates)) => GenerationResult::from_completion(
                candidates.into_iter().next().and_then(|c| c.generated_text),
            ),
            Ok(InferenceResponse::Single(candidate)) => {
                GenerationResult::from_completion(candidate.generated_text)
            }
            Ok(InferenceResponse::Error { error }) => GenerationResult::failure(error),
            Err(e) => GenerationResult::failure(format!("malformed response: {}", e)),
        }
    }

    fn output_mode(&self) -> OutputMode {
        OutputMode::TruncationRepair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn adapter(server: &Server, timeout: Duration) -> InferenceEndpointAdapter {
        InferenceEndpointAdapter::new(
            format!("{}/models/gpt2", server.url()),
            Some("hf-token".to_string()),
            timeout,
        )
        .unwrap()
    }

    async fn respond_with(status: usize, body: &str) -> GenerationResult {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gpt2")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
        adapter(&server, Duration::from_secs(5))
            .generate("prompt", &GenerationParams::plan_defaults())
            .await
    }

    #[tokio::test]
    async fn sends_prompt_and_sampling_parameters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gpt2")
            .match_header("authorization", "Bearer hf-token")
            .match_body(Matcher::Json(serde_json::json!({
                "inputs": "Plan for Go",
                "parameters": {
                    "max_new_tokens": 1500,
                    "temperature": 0.6,
                    "return_full_text": false
                }
            })))
            .with_status(200)
            .with_body(r#"[{"generated_text": "Week 1. Week 2"}]"#)
            .create_async()
            .await;

        let result = adapter(&server, Duration::from_secs(5))
            .generate("Plan for Go", &GenerationParams::lecture_defaults())
            .await;

        mock.assert_async().await;
        assert_eq!(
            result,
            GenerationResult::Success {
                text: "Week 1. Week 2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn first_candidate_wins() {
        let result = respond_with(
            200,
            r#"[{"generated_text": "first."}, {"generated_text": "second."}]"#,
        )
        .await;
        assert_eq!(
            result,
            GenerationResult::Success {
                text: "first.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn single_object_response_is_accepted() {
        let result = respond_with(200, r#"{"generated_text": "only one."}"#).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn non_success_status_is_failure() {
        let result = respond_with(503, r#"{"error": "Model is loading"}"#).await;
        match result {
            GenerationResult::Failure { reason } => assert!(reason.contains("503")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn error_object_is_failure() {
        let result = respond_with(200, r#"{"error": "Input too long"}"#).await;
        assert_eq!(result, GenerationResult::failure("Input too long"));
    }

    #[tokio::test]
    async fn empty_or_malformed_completion_is_failure() {
        assert!(!respond_with(200, r#"[]"#).await.is_success());
        assert!(!respond_with(200, r#"[{"generated_text": "   "}]"#).await.is_success());
        assert!(!respond_with(200, r#"not json"#).await.is_success());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_failure() {
        let adapter = InferenceEndpointAdapter::new(
            "http://127.0.0.1:9/models/gpt2",
            None,
            Duration::from_secs(2),
        )
        .unwrap();
        let result = adapter
            .generate("prompt", &GenerationParams::plan_defaults())
            .await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let adapter = InferenceEndpointAdapter::new(
            format!("http://{}/models/gpt2", addr),
            None,
            Duration::from_secs(1),
        )
        .unwrap();

        let started = std::time::Instant::now();
        let result = adapter
            .generate("prompt", &GenerationParams::plan_defaults())
            .await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!result.is_success());
    }
}
