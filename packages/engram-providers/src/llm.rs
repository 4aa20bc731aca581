use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

const SYSTEM_PROMPT: &str = "You are a concise assistant that produces structured outputs.";

/// One chat completion. `model_override` lets the caller pick a different
/// model than the configured default for a single call.
pub async fn complete(
	cfg: &engram_config::LlmProviderConfig,
	prompt: &str,
	model_override: Option<&str>,
) -> Result<String> {
	let Some(api_key) = cfg.api_key.as_deref() else {
		return Err(eyre::eyre!("LLM provider api_key is not configured."));
	};
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": model_override.unwrap_or(cfg.model.as_str()),
		"temperature": cfg.temperature,
		"messages": [
			{ "role": "system", "content": SYSTEM_PROMPT },
			{ "role": "user", "content": prompt },
		],
	});
	let res = client.post(url).headers(crate::auth_headers(api_key)?).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_response(json)
}

fn parse_completion_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Completion response is missing message content."))?;

	Ok(content.trim().to_string())
}
