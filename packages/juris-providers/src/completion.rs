use std::{sync::LazyLock, time::Duration};

use color_eyre::{Result, eyre};
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

static THINK_BLOCK: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").ok());

/// Per-call overrides on top of the configured provider defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionOptions {
	pub temperature: Option<f32>,
	pub max_tokens: Option<u32>,
}

/// Sends a chat-completions request and returns the assistant text with reasoning blocks removed.
pub async fn complete(
	cfg: &juris_config::LlmProviderConfig,
	messages: &[Value],
	options: CompletionOptions,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": options.temperature.unwrap_or(cfg.temperature),
		"max_tokens": options.max_tokens.unwrap_or(cfg.max_tokens),
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_text(&json)
}

fn parse_completion_text(json: &Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Completion response is missing message content."))?;
	let text = strip_reasoning(content);

	if text.is_empty() {
		return Err(eyre::eyre!("Completion response is empty."));
	}

	Ok(text)
}

/// Removes `<think>...</think>` blocks some reasoning models prepend to their answer.
pub fn strip_reasoning(content: &str) -> String {
	match THINK_BLOCK.as_ref() {
		Some(re) => re.replace_all(content, "").trim().to_string(),
		None => content.trim().to_string(),
	}
}
