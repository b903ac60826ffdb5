pub mod cache;
pub mod history;
pub mod search;

mod error;

pub use cache::{Cache, MemoryCache, SingleFlight};
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistorySink, TracingHistory};
pub use juris_domain::{BoxFuture, ChatRole, ChatTurn};
pub use juris_providers::{CompletionOptions, CompletionProvider};
pub use search::{
	AdapterFailure, Citation, EvaluationVerdict, FailureReason, LoopState, PromptContext,
	QuickLookupRequest, QuickLookupResponse, SearchOutcome, SearchRequest, SearchResponse,
	SearchSource, SearchStep, Stage,
};

use std::sync::Arc;

use juris_config::Config;
use juris_domain::AdapterRegistry;
use juris_providers::HttpCompletion;

#[derive(Clone)]
pub struct Providers {
	pub completion: Arc<dyn CompletionProvider>,
}
impl Providers {
	pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
		Self { completion }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { completion: Arc::new(HttpCompletion) }
	}
}

pub struct JurisService {
	pub cfg: Config,
	pub registry: AdapterRegistry,
	pub providers: Providers,
	cache: Arc<dyn Cache>,
	history: Arc<dyn HistorySink>,
	flights: SingleFlight,
}
impl JurisService {
	pub fn new(cfg: Config, registry: AdapterRegistry) -> Self {
		Self::with_providers(cfg, registry, Providers::default())
	}

	pub fn with_providers(cfg: Config, registry: AdapterRegistry, providers: Providers) -> Self {
		Self {
			cfg,
			registry,
			providers,
			cache: Arc::new(MemoryCache::new()),
			history: Arc::new(TracingHistory),
			flights: SingleFlight::new(),
		}
	}

	pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
		self.cache = cache;

		self
	}

	pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
		self.history = history;

		self
	}
}
