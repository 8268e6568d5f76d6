/// Judge Client - Abstraction for Remote Code Execution
///
/// **Core Responsibility:**
/// Ship execution requests to the judge service and read back raw
/// per-test-case results.
///
/// **Critical Architectural Boundary:**
/// - The client knows HOW to talk to the judge (wire format, auth)
/// - The client does NOT decide when a batch is finished (poller's job)
/// - The client does NOT score results (evaluator's job)
///
/// Tests substitute a scripted stub for the whole service via the
/// `JudgeService` trait.
use async_trait::async_trait;
use codeforge_common::config::EvalConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EvalError;

/// Judge status codes: 1 = in queue, 2 = processing, 3 = accepted,
/// 4 = runtime error, 6 = compile error; anything above 2 is terminal.
pub const STATUS_IN_QUEUE: u32 = 1;
pub const STATUS_PROCESSING: u32 = 2;
pub const STATUS_ACCEPTED: u32 = 3;
pub const STATUS_RUNTIME_ERROR: u32 = 4;
pub const STATUS_COMPILE_ERROR: u32 = 6;

/// One queued execution: the same source and language id for every
/// case in a batch, with that case's stdin and expected output.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
    pub expected_output: String,
}

/// Raw per-token result as the judge reports it. `time` and `memory`
/// stay unset while the token is still queued or processing.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResult {
    pub token: String,
    pub status_id: u32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    /// Runtime in seconds, as a decimal string ("0.002")
    pub time: Option<String>,
    /// Peak memory in KB
    pub memory: Option<u64>,
}

impl TokenResult {
    pub fn is_terminal(&self) -> bool {
        self.status_id > STATUS_PROCESSING
    }
}

/// The external judge service, as consumed by the pipeline.
#[async_trait]
pub trait JudgeService: Send + Sync {
    /// Submit one batch; returns one opaque token per request, in
    /// request order.
    async fn dispatch_batch(&self, requests: &[ExecutionRequest])
        -> Result<Vec<String>, EvalError>;

    /// Query the current status of every token in one call.
    async fn poll_batch(&self, tokens: &[String]) -> Result<Vec<TokenResult>, EvalError>;
}

#[derive(Serialize)]
struct BatchSubmitBody<'a> {
    submissions: &'a [ExecutionRequest],
}

#[derive(Deserialize)]
struct DispatchedToken {
    token: String,
}

#[derive(Deserialize)]
struct BatchPollResponse {
    submissions: Vec<TokenResult>,
}

/// HTTP client for a Judge0-compatible service.
#[derive(Clone)]
pub struct Judge0Client {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Judge0Client {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
            base_url: config.judge_url.trim_end_matches('/').to_string(),
            api_key: config.judge_api_key.clone(),
        }
    }

    fn batch_url(&self) -> String {
        format!("{}/submissions/batch", self.base_url)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("X-Auth-Token", key),
            None => req,
        }
    }
}

#[async_trait]
impl JudgeService for Judge0Client {
    async fn dispatch_batch(
        &self,
        requests: &[ExecutionRequest],
    ) -> Result<Vec<String>, EvalError> {
        if requests.is_empty() {
            return Err(EvalError::DispatchFailed("empty batch".to_string()));
        }

        let request = self
            .authorized(self.client.post(self.batch_url()))
            .query(&[("base64_encoded", "false")])
            .json(&BatchSubmitBody {
                submissions: requests,
            });

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EvalError::DispatchFailed(e.to_string()))?;

        let tokens: Vec<DispatchedToken> = response
            .json()
            .await
            .map_err(|e| EvalError::DispatchFailed(e.to_string()))?;

        // The token count is load-bearing: token[i] must correspond to
        // requests[i] all the way to the aggregator.
        if tokens.len() != requests.len() {
            return Err(EvalError::DispatchFailed(format!(
                "submitted {} requests, judge returned {} tokens",
                requests.len(),
                tokens.len()
            )));
        }

        Ok(tokens.into_iter().map(|t| t.token).collect())
    }

    async fn poll_batch(&self, tokens: &[String]) -> Result<Vec<TokenResult>, EvalError> {
        let request = self
            .authorized(self.client.get(self.batch_url()))
            .query(&[
                ("tokens", tokens.join(",").as_str()),
                ("base64_encoded", "false"),
                ("fields", "*"),
            ]);

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EvalError::JudgeUnavailable(e.to_string()))?;

        let body: BatchPollResponse = response
            .json()
            .await
            .map_err(|e| EvalError::JudgeUnavailable(e.to_string()))?;

        Ok(body.submissions)
    }
}
