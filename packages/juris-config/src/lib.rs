mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Agentic, Cache, Config, Corpus, LlmProviderConfig, Prompt, Providers, ResponseStyle,
	Retrieval, Service, Strategies, Strategy, StrategyConfig, VectorCorpus,
};

use std::{fs, path::Path};

/// Upper bound for `strategies.*.max_rounds`; keeps the agentic loop finite even when misconfigured.
pub const MAX_ROUNDS_HARD_LIMIT: u32 = 8;
/// Smallest synthesis prompt budget; the fixed instructions and the listed sub-queries fit below it.
pub const MIN_CONTEXT_BUDGET_CHARS: u32 = 6_000;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "service.request_timeout_ms must be greater than zero.".to_string(),
		});
	}

	let llm = &cfg.providers.llm;

	if llm.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.llm.api_key must be non-empty.".to_string(),
		});
	}
	if llm.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.llm.model must be non-empty.".to_string(),
		});
	}
	if !llm.temperature.is_finite() || !(0.0..=2.0).contains(&llm.temperature) {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if llm.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.llm.max_tokens must be greater than zero.".to_string(),
		});
	}
	if llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for strategy in Strategy::ALL {
		validate_strategy(strategy, cfg.strategy(strategy))?;
	}

	if cfg.strategies.quick.max_sub_queries != 1 {
		return Err(Error::Validation {
			message: "strategies.quick.max_sub_queries must be exactly 1.".to_string(),
		});
	}
	if cfg.strategies.quick.max_rounds != 1 || cfg.strategies.research.max_rounds != 1 {
		return Err(Error::Validation {
			message: "strategies.quick.max_rounds and strategies.research.max_rounds must be 1."
				.to_string(),
		});
	}
	if cfg.strategies.quick.round_deadline_ms > cfg.strategies.agentic.round_deadline_ms {
		return Err(Error::Validation {
			message: "strategies.quick.round_deadline_ms must not exceed strategies.agentic.round_deadline_ms."
				.to_string(),
		});
	}
	if cfg.retrieval.adapter_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.adapter_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.max_hits_per_adapter == 0 {
		return Err(Error::Validation {
			message: "retrieval.max_hits_per_adapter must be greater than zero.".to_string(),
		});
	}
	if cfg.agentic.evaluation_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "agentic.evaluation_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.agentic.max_evidence_items == 0 {
		return Err(Error::Validation {
			message: "agentic.max_evidence_items must be greater than zero.".to_string(),
		});
	}
	if cfg.prompt.max_excerpt_chars == 0 {
		return Err(Error::Validation {
			message: "prompt.max_excerpt_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.prompt.context_budget_chars < MIN_CONTEXT_BUDGET_CHARS {
		return Err(Error::Validation {
			message: format!("prompt.context_budget_chars must be at least {MIN_CONTEXT_BUDGET_CHARS}."),
		});
	}
	if cfg.prompt.context_budget_chars < cfg.prompt.max_excerpt_chars {
		return Err(Error::Validation {
			message: "prompt.context_budget_chars must be at least prompt.max_excerpt_chars."
				.to_string(),
		});
	}
	if cfg.cache.decomposition_ttl_secs <= 0 {
		return Err(Error::Validation {
			message: "cache.decomposition_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.search_ttl_secs <= 0 {
		return Err(Error::Validation {
			message: "cache.search_ttl_secs must be greater than zero.".to_string(),
		});
	}

	if let Some(max) = cfg.cache.max_payload_bytes
		&& max == 0
	{
		return Err(Error::Validation {
			message: "cache.max_payload_bytes must be greater than zero.".to_string(),
		});
	}

	if let Some(vector) = cfg.corpus.vector.as_ref() {
		if vector.name.trim().is_empty() || vector.url.trim().is_empty() {
			return Err(Error::Validation {
				message: "corpus.vector.name and corpus.vector.url must be non-empty.".to_string(),
			});
		}
		if vector.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "corpus.vector.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	Ok(())
}

fn validate_strategy(strategy: Strategy, cfg: &StrategyConfig) -> Result<()> {
	if cfg.max_sub_queries == 0 {
		return Err(Error::Validation {
			message: format!("strategies.{strategy}.max_sub_queries must be greater than zero."),
		});
	}
	if cfg.max_rounds == 0 || cfg.max_rounds > MAX_ROUNDS_HARD_LIMIT {
		return Err(Error::Validation {
			message: format!(
				"strategies.{strategy}.max_rounds must be in the range 1-{MAX_ROUNDS_HARD_LIMIT}."
			),
		});
	}
	if cfg.max_results == 0 {
		return Err(Error::Validation {
			message: format!("strategies.{strategy}.max_results must be greater than zero."),
		});
	}
	if cfg.round_deadline_ms == 0 {
		return Err(Error::Validation {
			message: format!("strategies.{strategy}.round_deadline_ms must be greater than zero."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.corpus.legal_database_root.as_deref().map(|root| root.trim().is_empty()).unwrap_or(false)
	{
		cfg.corpus.legal_database_root = None;
	}
	if cfg.corpus.user_files_root.as_deref().map(|root| root.trim().is_empty()).unwrap_or(false) {
		cfg.corpus.user_files_root = None;
	}

	cfg.providers.llm.api_base = cfg.providers.llm.api_base.trim_end_matches('/').to_string();
}
