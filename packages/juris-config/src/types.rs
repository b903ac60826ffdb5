use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub strategies: Strategies,
	pub retrieval: Retrieval,
	pub agentic: Agentic,
	pub prompt: Prompt,
	pub cache: Cache,
	pub corpus: Corpus,
}
impl Config {
	pub fn strategy(&self, strategy: Strategy) -> &StrategyConfig {
		match strategy {
			Strategy::Quick => &self.strategies.quick,
			Strategy::Research => &self.strategies.research,
			Strategy::Agentic => &self.strategies.agentic,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Overall deadline for one search request, including synthesis.
	pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Strategies {
	pub quick: StrategyConfig,
	pub research: StrategyConfig,
	pub agentic: StrategyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
	/// Cap on sub-queries issued across the whole request.
	pub max_sub_queries: u32,
	/// Hard cap on retrieval rounds. Only `agentic` may exceed one.
	pub max_rounds: u32,
	/// Default and upper bound for the number of returned results.
	pub max_results: u32,
	pub round_deadline_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	pub adapter_timeout_ms: u64,
	pub max_hits_per_adapter: u32,
}

#[derive(Debug, Deserialize)]
pub struct Agentic {
	/// Lets the evaluator's own answer replace the completion step when evidence is sufficient.
	pub synthesize_inline: bool,
	pub evaluation_timeout_ms: u64,
	#[serde(default = "default_max_evidence_items")]
	pub max_evidence_items: u32,
}

#[derive(Debug, Deserialize)]
pub struct Prompt {
	pub context_budget_chars: u32,
	pub max_excerpt_chars: u32,
	#[serde(default)]
	pub default_style: ResponseStyle,
}

#[derive(Debug, Deserialize)]
pub struct Cache {
	pub enabled: bool,
	pub decomposition_ttl_secs: i64,
	pub search_ttl_secs: i64,
	pub max_payload_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Corpus {
	pub legal_database_root: Option<String>,
	pub user_files_root: Option<String>,
	pub vector: Option<VectorCorpus>,
}

#[derive(Debug, Deserialize)]
pub struct VectorCorpus {
	pub name: String,
	pub url: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub score_threshold: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Strategy {
	Quick,
	Research,
	Agentic,
}
impl Strategy {
	pub const ALL: [Self; 3] = [Self::Quick, Self::Research, Self::Agentic];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Quick => "quick",
			Self::Research => "research",
			Self::Agentic => "agentic",
		}
	}
}
impl FromStr for Strategy {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim() {
			"quick" => Ok(Self::Quick),
			"research" => Ok(Self::Research),
			"agentic" => Ok(Self::Agentic),
			other => Err(Error::Validation {
				message: format!(
					"Unknown strategy {other:?}; expected one of quick, research, or agentic."
				),
			}),
		}
	}
}
impl TryFrom<String> for Strategy {
	type Error = Error;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		raw.parse()
	}
}
impl From<Strategy> for &'static str {
	fn from(strategy: Strategy) -> Self {
		strategy.as_str()
	}
}
impl fmt::Display for Strategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ResponseStyle {
	#[default]
	StandardV2,
	Standard,
	Concise,
	Professional,
	Educational,
	SimpleEnglish,
}
impl ResponseStyle {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::StandardV2 => "standard_v2",
			Self::Standard => "standard",
			Self::Concise => "concise",
			Self::Professional => "professional",
			Self::Educational => "educational",
			Self::SimpleEnglish => "simple_english",
		}
	}
}
impl FromStr for ResponseStyle {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim() {
			"standard_v2" => Ok(Self::StandardV2),
			"standard" => Ok(Self::Standard),
			"concise" => Ok(Self::Concise),
			"professional" => Ok(Self::Professional),
			"educational" => Ok(Self::Educational),
			"simple_english" => Ok(Self::SimpleEnglish),
			other => Err(Error::Validation {
				message: format!("Unknown response style {other:?}."),
			}),
		}
	}
}
impl TryFrom<String> for ResponseStyle {
	type Error = Error;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		raw.parse()
	}
}
impl From<ResponseStyle> for &'static str {
	fn from(style: ResponseStyle) -> Self {
		style.as_str()
	}
}

fn default_max_evidence_items() -> u32 {
	12
}
