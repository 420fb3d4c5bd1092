//! HTTP client for the external timetable-generation service.
//!
//! The service is a black box: it accepts the assembled wizard payload and
//! returns either a schedule document or an error. We do not retry and we do
//! not interpret generation-specific errors; the caller decides what to do
//! with the message (the draft is never cleared on failure).
//!
//! NOTE: We never log the API key and we log latencies and payload sizes,
//! not contents.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::domain::GenerationRequest;
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct GenerationClient {
  client: reqwest::Client,
  api_key: Option<String>,
  pub base_url: String,
}

impl GenerationClient {
  /// Construct the client if GENERATION_API_URL is set; otherwise None and
  /// generation requests surface a configuration error to the caller.
  pub fn from_env() -> Option<Self> {
    let base_url = std::env::var("GENERATION_API_URL").ok()?;
    let api_key = std::env::var("GENERATION_API_KEY").ok();
    let timeout = std::env::var("GENERATION_TIMEOUT_SECS")
      .ok()
      .and_then(|v| v.parse::<u64>().ok())
      .unwrap_or(20);

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url })
  }

  /// POST the payload to the generation endpoint and hand back the schedule
  /// document as-is. The schedule's shape belongs to the service.
  #[instrument(level = "info", skip(self, payload),
               fields(subjects = payload.subjects.len(), topics = payload.topics.len()))]
  pub async fn generate(&self, payload: &GenerationRequest) -> Result<serde_json::Value, String> {
    let url = format!("{}/timetables/generate", self.base_url.trim_end_matches('/'));

    let mut req = self
      .client
      .post(&url)
      .header(USER_AGENT, "studyplan-backend/0.1")
      .header(CONTENT_TYPE, "application/json");
    if let Some(key) = &self.api_key {
      req = req.header(AUTHORIZATION, format!("Bearer {}", key));
    }

    let start = std::time::Instant::now();
    let res = req.json(payload).send().await.map_err(|e| e.to_string())?;
    let elapsed = start.elapsed();

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_service_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(?elapsed, %status, "Generation service returned an error");
      return Err(format!("Generation HTTP {}: {}", status, msg));
    }

    let schedule: serde_json::Value = res.json().await.map_err(|e| e.to_string())?;
    info!(?elapsed, size = schedule.to_string().len(), "Schedule received from generation service");
    Ok(schedule)
  }
}

/// Pull a readable message out of the service's error body, if it has the
/// conventional `{"error": {"message": ...}}` or `{"error": "..."}` shape.
fn extract_service_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct Outer {
    error: serde_json::Value,
  }
  let outer: Outer = serde_json::from_str(body).ok()?;
  match outer.error {
    serde_json::Value::String(s) => Some(s),
    serde_json::Value::Object(m) => m.get("message").and_then(|v| v.as_str()).map(String::from),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_both_error_body_shapes() {
    assert_eq!(
      extract_service_error(r#"{"error":"window too small"}"#).as_deref(),
      Some("window too small")
    );
    assert_eq!(
      extract_service_error(r#"{"error":{"message":"no free slots","code":42}}"#).as_deref(),
      Some("no free slots")
    );
    assert_eq!(extract_service_error("plain text"), None);
  }
}
