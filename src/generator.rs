//! Minimal OpenAI-compatible client used as the generation source.
//!
//! We only call chat.completions and ask for plain text; the text is handed
//! to the extractor untouched. Calls are instrumented and log model names,
//! latencies and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::error::{AssessmentError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Clone)]
pub struct Generator {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl Generator {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout = Duration::from_secs(
      std::env::var("LLM_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;

    Some(Self { client, api_key, base_url, model, timeout })
  }

  /// Send the prompt and return the raw completion text.
  #[instrument(level = "info", skip(self, prompts, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  pub async fn generate(&self, prompts: &Prompts, prompt: &str) -> Result<String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: prompts.system.clone() },
        ChatMessageReq { role: "user".into(), content: prompt.into() },
      ],
      temperature: 0.7,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "assessment-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| {
        error!(target: "generator", elapsed = ?start.elapsed(), error = %e, "Model call failed");
        AssessmentError::GenerationUnavailable(e.to_string())
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(target: "generator", %status, "Model returned an error status");
      return Err(AssessmentError::GenerationUnavailable(format!("HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| AssessmentError::malformed(format!("unreadable completion body: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(target: "generator", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }

    let text = completion_text(body)?;
    info!(target: "generator", elapsed = ?start.elapsed(), text_len = text.len(), "Model response received");
    Ok(text)
  }
}

fn completion_text(body: ChatCompletionResponse) -> Result<String> {
  body
    .choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .ok_or_else(|| AssessmentError::malformed("model sent no completion text"))
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  #[test]
  fn picks_first_completion() {
    let body: ChatCompletionResponse = serde_json::from_str(
      r#"{"choices":[{"message":{"content":"[]"}},{"message":{"content":"x"}}],"usage":{"total_tokens":3}}"#,
    ).unwrap();
    assert_eq!(completion_text(body).unwrap(), "[]");
  }

  #[test]
  fn missing_completion_is_malformed_output() {
    let body: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
    assert_eq!(completion_text(body).unwrap_err().kind(), ErrorKind::MalformedOutput);

    let body: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
    assert_eq!(completion_text(body).unwrap_err().kind(), ErrorKind::MalformedOutput);
  }

  #[test]
  fn reads_openai_error_message() {
    assert_eq!(
      extract_openai_error(r#"{"error":{"message":"Rate limit","type":"x"}}"#).as_deref(),
      Some("Rate limit")
    );
    assert_eq!(extract_openai_error("<html>"), None);
  }
}
