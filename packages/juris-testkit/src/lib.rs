mod adapters;
mod completion;
mod error;

pub use adapters::{EchoAdapter, FailingAdapter, PrefixAdapter, SlowAdapter, StaticAdapter, hit};
pub use completion::{CompletionKind, Reply, ScriptedCompletion};
pub use error::{Error, Result};

use juris_config::Config;

/// Baseline configuration for service tests: generous deadlines, in-memory cache on, no corpora.
pub const TEST_CONFIG_TOML: &str = r#"
[service]
http_bind          = "127.0.0.1:0"
log_level          = "debug"
request_timeout_ms = 10000

[providers.llm]
provider_id = "scripted"
api_base    = "http://127.0.0.1:9"
api_key     = "test-key"
path        = "/v1/chat/completions"
model       = "scripted-model"
temperature = 0.3
max_tokens  = 2048
timeout_ms  = 2000

[strategies.quick]
max_sub_queries   = 1
max_rounds        = 1
max_results       = 10
round_deadline_ms = 2000

[strategies.research]
max_sub_queries   = 4
max_rounds        = 1
max_results       = 20
round_deadline_ms = 4000

[strategies.agentic]
max_sub_queries   = 8
max_rounds        = 3
max_results       = 20
round_deadline_ms = 4000

[retrieval]
adapter_timeout_ms   = 1000
max_hits_per_adapter = 12

[agentic]
synthesize_inline     = false
evaluation_timeout_ms = 2000
max_evidence_items    = 12

[prompt]
context_budget_chars = 24000
max_excerpt_chars    = 600
default_style        = "standard_v2"

[cache]
enabled                = true
decomposition_ttl_secs = 86400
search_ttl_secs        = 7200
max_payload_bytes      = 262144

[corpus]
"#;

/// Parses and validates [`TEST_CONFIG_TOML`].
pub fn test_config() -> Result<Config> {
	let cfg: Config = toml::from_str(TEST_CONFIG_TOML)
		.map_err(|err| Error::Message(format!("Failed to parse test config: {err}.")))?;

	juris_config::validate(&cfg)?;

	Ok(cfg)
}
