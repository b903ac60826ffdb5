pub mod completion;

pub use completion::CompletionOptions;

use color_eyre::{Result, eyre};
use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use juris_config::LlmProviderConfig;

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		options: CompletionOptions,
	) -> BoxFuture<'a, Result<String>>;
}

/// Chat-completions over HTTP using the configured provider.
pub struct HttpCompletion;
impl CompletionProvider for HttpCompletion {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		options: CompletionOptions,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(completion::complete(cfg, messages, options))
	}
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header {key:?} must be a string."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
