//! Language-model collaborator (spec.md §6d). Reworked from the donor's
//! `AiClient`/`AiProvider` pair into a single async trait narrowed to the
//! one operation the extractor needs: turn a prompt pair into JSON.

use crate::errors::CareerEngineError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// spec.md §5: the language-model call MUST use a bounded timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Send a system/user prompt pair to `model` and return its JSON
    /// response. Callers are responsible for validating the shape of the
    /// returned value against whatever schema they asked for.
    async fn generate_json(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Value, CareerEngineError>;
}

/// OpenAI-compatible chat-completions client, grounded on the donor's
/// `CloudAiProvider::call_openai`.
pub struct ReqwestLanguageModelClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl ReqwestLanguageModelClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1/chat/completions".to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self::with_timeout(api_key, base_url, REQUEST_TIMEOUT)
    }

    fn with_timeout(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url,
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builder with a fixed timeout never fails"),
        }
    }
}

#[async_trait]
impl LanguageModelClient for ReqwestLanguageModelClient {
    async fn generate_json(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Value, CareerEngineError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "model": model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": 0.2,
                "response_format": {"type": "json_object"}
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CareerEngineError::LanguageModelTimeout(e.to_string())
                } else {
                    CareerEngineError::ExtractionFailed(format!("network error: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CareerEngineError::ExtractionFailed(format!(
                "language model returned {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CareerEngineError::ExtractionFailed(format!("invalid response body: {}", e)))?;

        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                CareerEngineError::ExtractionFailed("missing content in model response".to_string())
            })?;

        serde_json::from_str(content)
            .map_err(|e| CareerEngineError::ExtractionFailed(format!("model content not JSON: {}", e)))
    }
}

/// Deterministic client for tests: exact-match and substring-match
/// registered responses, grounded on the donor's `MockAiClient`.
#[derive(Default)]
pub struct MockLanguageModelClient {
    responses: std::sync::Mutex<std::collections::HashMap<String, Value>>,
}

impl MockLanguageModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_response_for_prompt(&self, prompt_pattern: &str, response: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(prompt_pattern.to_string(), response);
    }
}

#[async_trait]
impl LanguageModelClient for MockLanguageModelClient {
    async fn generate_json(
        &self,
        _model: &str,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Value, CareerEngineError> {
        let responses = self.responses.lock().unwrap();
        if let Some(response) = responses.get(user_prompt) {
            return Ok(response.clone());
        }
        for (pattern, response) in responses.iter() {
            if user_prompt.contains(pattern.as_str()) {
                return Ok(response.clone());
            }
        }
        Err(CareerEngineError::ExtractionFailed(format!(
            "no mock response registered for prompt: {}",
            user_prompt
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_client_exact_match() {
        let client = MockLanguageModelClient::new();
        client.register_response_for_prompt("resume text", json!({"skills": []}));
        let result = client
            .generate_json("gpt-4o-mini", "system", "resume text")
            .await
            .unwrap();
        assert_eq!(result, json!({"skills": []}));
    }

    #[tokio::test]
    async fn mock_client_no_match_fails() {
        let client = MockLanguageModelClient::new();
        let result = client.generate_json("gpt-4o-mini", "system", "nothing registered").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn request_past_bounded_timeout_surfaces_as_retryable_timeout_error() {
        use std::io::Read;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            // Accept and hold the connection open without ever responding.
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                std::thread::sleep(Duration::from_secs(2));
            }
        });

        let client = ReqwestLanguageModelClient::with_timeout(
            "test-key".to_string(),
            format!("http://{}/", addr),
            Duration::from_millis(100),
        );
        let result = client.generate_json("gpt-4o-mini", "system", "user").await;
        assert!(
            matches!(result, Err(CareerEngineError::LanguageModelTimeout(_))),
            "expected a timeout error, got {:?}",
            result
        );
        assert!(crate::errors::is_retryable(&result.unwrap_err()));
    }
}
