// crates/agentops-narrative/src/llm.rs
// ============================================================================
// Module: Optional LLM Enrichment
// Description: Opt-in rewrite of a deterministic hypothesis description.
// Purpose: Enrichment only; never a source of truth and never fatal on failure.
// Dependencies: reqwest (blocking)
// ============================================================================

use std::time::Duration;

use thiserror::Error;

/// Request timeout for the enrichment call. Short, because a slow or dead
/// LLM endpoint must not materially delay RCA completion.
const LLM_TIMEOUT_MS: u64 = 4_000;

/// Hard cap on the rewritten description length accepted back from the
/// remote service, to bound what ends up in a persisted report.
const MAX_REWRITE_LEN: usize = 4_000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(String),

    #[error("llm response was empty")]
    Empty,
}

/// A pluggable narrative rewriter. The deterministic template is always
/// computed first; implementations of this trait only get a chance to
/// improve its prose, never to invent facts the evidence doesn't support.
pub trait LlmClient: Send + Sync {
    /// Rewrites `deterministic_description` using `evidence_snippets` as
    /// context.
    ///
    /// # Errors
    /// Returns [`LlmError`] on any transport or parsing failure; callers
    /// fall back to the deterministic text rather than propagating this.
    fn rewrite(&self, deterministic_description: &str, evidence_snippets: &[String]) -> Result<String, LlmError>;
}

/// A minimal OpenAI-compatible chat-completion client, used when
/// `openai_api_key` is configured.
pub struct ReqwestLlmClient {
    api_key: String,
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl ReqwestLlmClient {
    /// Builds a client against the given endpoint (defaulting to OpenAI's
    /// chat completions API if `None`).
    ///
    /// # Errors
    /// Returns [`LlmError`] if the underlying HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, endpoint: Option<String>) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(LLM_TIMEOUT_MS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            client,
            endpoint: endpoint.unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_owned()),
        })
    }
}

impl LlmClient for ReqwestLlmClient {
    fn rewrite(&self, deterministic_description: &str, evidence_snippets: &[String]) -> Result<String, LlmError> {
        let prompt = format!(
            "Rewrite this root-cause description to be clearer, using only the evidence given. \
             Description: {deterministic_description}\nEvidence: {}",
            evidence_snippets.join("; ")
        );
        let body = serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": 300,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Request(format!("status {}", response.status())));
        }

        let parsed: serde_json::Value = response.json().map_err(|e| LlmError::Request(e.to_string()))?;
        let text = parsed["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LlmError::Empty)?
            .trim();
        if text.is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(text.chars().take(MAX_REWRITE_LEN).collect())
    }
}
