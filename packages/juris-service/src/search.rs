mod evaluator;
mod orchestrator;
mod planner;
mod prompt;
mod ranking;

pub use evaluator::{EvaluationVerdict, LoopState};
pub use orchestrator::{AdapterFailure, FailureReason};
pub use prompt::{Citation, PromptContext};

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::time::{self, Instant};
use uuid::Uuid;

use juris_config::{ResponseStyle, Strategy, StrategyConfig};
use juris_domain::{CacheKey, CacheKind, ChatMode, ChatTurn, RankedResult, SourceAdapter, SubQuery};
use juris_providers::CompletionOptions;

use crate::{
	Error, HistoryEntry, JurisService, Result, history,
	search::{
		evaluator::{Decision, LoopBudget},
		orchestrator::Round,
		planner::{DecompositionPayload, Plan},
		prompt::PromptOptions,
		ranking::Merger,
	},
};

pub const QUICK_LOOKUP_DEFAULT_LIMIT: u32 = 10;
pub const QUICK_LOOKUP_MAX_LIMIT: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
	pub query: String,
	#[serde(default = "default_strategy")]
	pub strategy: Strategy,
	/// Adapter names to search; empty searches every registered adapter.
	#[serde(default)]
	pub source_filter: Vec<String>,
	#[serde(default)]
	pub max_results: Option<u32>,
	#[serde(default)]
	pub include_user_files: bool,
	#[serde(default)]
	pub style: Option<ResponseStyle>,
	#[serde(default)]
	pub chat_mode: Option<ChatMode>,
	/// Earlier turns of the conversation, oldest first; only the most recent few are used.
	#[serde(default)]
	pub history: Vec<ChatTurn>,
}
impl SearchRequest {
	pub fn new(query: impl Into<String>, strategy: Strategy) -> Self {
		Self {
			query: query.into(),
			strategy,
			source_filter: Vec::new(),
			max_results: None,
			include_user_files: false,
			style: None,
			chat_mode: None,
			history: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSource {
	pub rank: u32,
	pub adapter: String,
	pub id: String,
	pub title: String,
	pub category: String,
	pub subcategory: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
	/// Normalized score in `[0, 1]`.
	pub score: f32,
	pub relevant_text: String,
	#[serde(default)]
	pub excerpts: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
}
impl From<&RankedResult> for SearchSource {
	fn from(result: &RankedResult) -> Self {
		Self {
			rank: result.rank,
			adapter: result.adapter.clone(),
			id: result.hit.id.clone(),
			title: result.hit.title.clone(),
			category: result.hit.category.clone(),
			subcategory: result.hit.subcategory.clone(),
			number: result.hit.number.clone(),
			date: result.hit.date.clone(),
			score: result.normalized_score,
			relevant_text: result.hit.relevant_text.clone(),
			excerpts: result.excerpts.clone(),
			path: result.hit.path.clone(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Plan,
	Retrieve,
	Rank,
	Evaluate,
	Synthesize,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Plan => "plan",
			Self::Retrieve => "retrieve",
			Self::Rank => "rank",
			Self::Evaluate => "evaluate",
			Self::Synthesize => "synthesize",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStep {
	pub stage: Stage,
	pub round: u32,
	pub detail: String,
}
impl SearchStep {
	fn new(stage: Stage, round: u32, detail: impl Into<String>) -> Self {
		Self { stage, round, detail: detail.into() }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub trace_id: Uuid,
	pub strategy: Strategy,
	pub answer: Option<String>,
	pub sources: Vec<SearchSource>,
	pub sub_queries: Vec<String>,
	pub total_sources_scanned: u32,
	pub iterations: u32,
	pub steps: Vec<SearchStep>,
}

/// Everything retrieval produced for one request, before synthesis.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
	pub results: Vec<RankedResult>,
	/// Every sub-query issued, in issuance order.
	pub sub_queries: Vec<SubQuery>,
	pub iterations: u32,
	pub inline_answer: Option<String>,
	pub scanned: u32,
	pub failures: Vec<AdapterFailure>,
	pub steps: Vec<SearchStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLookupRequest {
	pub q: String,
	#[serde(default)]
	pub limit: Option<u32>,
	#[serde(default)]
	pub source_filter: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLookupResponse {
	pub results: Vec<SearchSource>,
	pub total_results: u32,
}

struct RunContext<'a> {
	trace_id: Uuid,
	query: &'a str,
	strategy: Strategy,
	limits: &'a StrategyConfig,
	adapters: Vec<Arc<dyn SourceAdapter>>,
	max_results: u32,
	style: ResponseStyle,
	chat_mode: Option<ChatMode>,
	history: &'a [ChatTurn],
	deadline: Instant,
}

impl JurisService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let ctx = self.prepare(&req)?;

		tracing::info!(
			trace_id = %ctx.trace_id,
			query = ctx.query,
			strategy = ctx.strategy.as_str(),
			adapters = ctx.adapters.len(),
			max_results = ctx.max_results,
			"Search started."
		);

		let result = match self.search_cache_key(&ctx) {
			Some(key) => self.flights.run(&key, || self.search_through_cache(&ctx, &key)).await,
			None => self.run_search(&ctx).await.map(|(response, _)| response),
		};
		let response = match result {
			Ok(response) => response,
			Err(err) => {
				tracing::warn!(
					error = %err,
					trace_id = %ctx.trace_id,
					query = ctx.query,
					strategy = ctx.strategy.as_str(),
					stage = failed_stage(&err),
					"Search failed."
				);

				return Err(err);
			},
		};

		tracing::info!(
			trace_id = %ctx.trace_id,
			sources = response.sources.len(),
			iterations = response.iterations,
			answered = response.answer.is_some(),
			"Search completed."
		);
		history::record_detached(
			&self.history,
			HistoryEntry::new(
				ctx.query,
				&req.source_filter,
				ctx.strategy,
				response.sources.len() as u32,
			),
		);

		Ok(response)
	}

	/// Plans and retrieves without synthesis, caching, or history.
	pub async fn retrieve(&self, req: &SearchRequest) -> Result<SearchOutcome> {
		let ctx = self.prepare(req)?;

		self.run_retrieval(&ctx).await
	}

	pub async fn quick_lookup(&self, req: QuickLookupRequest) -> Result<QuickLookupResponse> {
		let query = req.q.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "q must be non-empty.".to_string() });
		}

		let limit = req.limit.unwrap_or(QUICK_LOOKUP_DEFAULT_LIMIT).clamp(1, QUICK_LOOKUP_MAX_LIMIT);
		let ctx = RunContext {
			trace_id: Uuid::new_v4(),
			query,
			strategy: Strategy::Quick,
			limits: self.cfg.strategy(Strategy::Quick),
			adapters: self.registry.select(&req.source_filter, false)?,
			max_results: limit,
			style: self.cfg.prompt.default_style,
			chat_mode: None,
			history: &[],
			deadline: Instant::now() + Duration::from_millis(self.cfg.service.request_timeout_ms),
		};
		let outcome = self.run_retrieval(&ctx).await?;
		let results: Vec<SearchSource> = outcome.results.iter().map(SearchSource::from).collect();

		Ok(QuickLookupResponse { total_results: results.len() as u32, results })
	}

	fn prepare<'a>(&'a self, req: &'a SearchRequest) -> Result<RunContext<'a>> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}
		if req.max_results == Some(0) {
			return Err(Error::InvalidRequest {
				message: "maxResults must be greater than zero.".to_string(),
			});
		}

		let limits = self.cfg.strategy(req.strategy);

		Ok(RunContext {
			trace_id: Uuid::new_v4(),
			query,
			strategy: req.strategy,
			limits,
			adapters: self.registry.select(&req.source_filter, req.include_user_files)?,
			max_results: req.max_results.unwrap_or(limits.max_results).min(limits.max_results),
			style: req.style.unwrap_or(self.cfg.prompt.default_style),
			chat_mode: req.chat_mode,
			history: &req.history[req.history.len().saturating_sub(prompt::HISTORY_TURNS)..],
			deadline: Instant::now() + Duration::from_millis(self.cfg.service.request_timeout_ms),
		})
	}

	async fn search_through_cache(&self, ctx: &RunContext<'_>, key: &CacheKey) -> Result<SearchResponse> {
		if let Some(mut cached) =
			self.cache_read::<SearchResponse>(key, self.cfg.cache.search_ttl_secs).await
		{
			cached.trace_id = ctx.trace_id;

			return Ok(cached);
		}

		let (response, cacheable) = self.run_search(ctx).await?;

		if cacheable {
			self.cache_write(key, &response, self.cfg.cache.search_ttl_secs).await;
		}

		Ok(response)
	}

	/// Returns the response and whether it is complete enough to cache.
	async fn run_search(&self, ctx: &RunContext<'_>) -> Result<(SearchResponse, bool)> {
		let mut outcome = self.run_retrieval(ctx).await?;
		let answer = match (ctx.strategy, outcome.inline_answer.clone()) {
			(Strategy::Quick, _) => None,
			(_, Some(answer)) => {
				outcome.steps.push(SearchStep::new(
					Stage::Synthesize,
					outcome.iterations,
					"Answer produced inline by the evaluator.",
				));

				Some(answer)
			},
			(_, None) => {
				let (answer, cited) = self.synthesize(ctx, &outcome).await?;

				outcome.steps.push(SearchStep::new(
					Stage::Synthesize,
					outcome.iterations,
					format!("Synthesized an answer from {cited} cited sources."),
				));

				Some(answer)
			},
		};

		if ctx.strategy != Strategy::Quick {
			tracing::debug!(
				trace_id = %ctx.trace_id,
				from = LoopState::Synthesizing.as_str(),
				to = LoopState::Done.as_str(),
				"Search state changed."
			);
		}

		let cacheable = outcome.failures.is_empty();
		let response = SearchResponse {
			trace_id: ctx.trace_id,
			strategy: ctx.strategy,
			answer,
			sources: outcome.results.iter().map(SearchSource::from).collect(),
			sub_queries: outcome.sub_queries.iter().map(|sub_query| sub_query.text.clone()).collect(),
			total_sources_scanned: outcome.scanned,
			iterations: outcome.iterations,
			steps: outcome.steps,
		};

		Ok((response, cacheable))
	}

	async fn run_retrieval(&self, ctx: &RunContext<'_>) -> Result<SearchOutcome> {
		let mut state = LoopState::Planning;
		let mut steps = Vec::new();
		let plan = match ctx.strategy {
			Strategy::Quick => Plan::literal(ctx.query),
			Strategy::Research | Strategy::Agentic => self.plan(ctx).await,
		};
		let decomposed = plan.decomposed;

		steps.push(SearchStep::new(
			Stage::Plan,
			1,
			format!(
				"Planned {} sub-queries{}.",
				plan.sub_queries.len(),
				if decomposed { "" } else { " without decomposition" }
			),
		));

		let mut issued = plan.sub_queries.clone();
		let mut round_queries = plan.sub_queries;
		let mut merger = Merger::new();
		let mut failures = Vec::new();
		let mut scanned = 0;
		let mut iterations = 0;
		let mut inline_answer = None;

		loop {
			evaluator::advance(&mut state, LoopState::Retrieving, ctx.trace_id, iterations + 1);

			iterations += 1;

			let round = orchestrator::run_round(Round {
				number: iterations,
				sub_queries: &round_queries,
				adapters: &ctx.adapters,
				per_adapter_limit: orchestrator::per_adapter_limit(
					ctx.max_results,
					round_queries.len(),
					self.cfg.retrieval.max_hits_per_adapter,
				),
				adapter_timeout: Duration::from_millis(self.cfg.retrieval.adapter_timeout_ms),
				deadline: (Instant::now() + Duration::from_millis(ctx.limits.round_deadline_ms))
					.min(ctx.deadline),
			})
			.await;

			if iterations == 1 && round.calls > 0 && round.succeeded == 0 && !decomposed {
				return Err(Error::RetrievalFailed {
					message: format!("All {} adapter calls failed.", round.calls),
				});
			}

			scanned += round.scanned;

			steps.push(SearchStep::new(
				Stage::Retrieve,
				iterations,
				format!(
					"Searched {} sub-queries across {} adapters; {} hits, {} failed calls.",
					round_queries.len(),
					ctx.adapters.len(),
					round.scanned,
					round.failures.len()
				),
			));
			failures.extend(round.failures);

			let added = merger.merge(round.batches);

			steps.push(SearchStep::new(
				Stage::Rank,
				iterations,
				format!("{added} new documents; {} accumulated.", merger.len()),
			));

			if ctx.strategy != Strategy::Agentic {
				break;
			}

			evaluator::advance(&mut state, LoopState::Evaluating, ctx.trace_id, iterations);

			let budget = LoopBudget {
				round: iterations,
				max_rounds: ctx.limits.max_rounds,
				issued: issued.len(),
				max_sub_queries: ctx.limits.max_sub_queries as usize,
				added,
			};

			if !budget.can_follow_up() && !self.cfg.agentic.synthesize_inline {
				steps.push(SearchStep::new(
					Stage::Evaluate,
					iterations,
					"Skipped evaluation; no further rounds are possible.",
				));

				break;
			}
			if Instant::now() >= ctx.deadline {
				tracing::warn!(
					trace_id = %ctx.trace_id,
					round = iterations,
					stage = Stage::Evaluate.as_str(),
					"Request deadline elapsed; keeping partial results."
				);

				break;
			}

			let evidence = merger.ranked(self.cfg.agentic.max_evidence_items as usize);
			let verdict = match self.evaluate(ctx, &evidence, &issued, budget.remaining()).await {
				Ok(verdict) => verdict,
				Err(err) => {
					tracing::warn!(
						error = %err,
						trace_id = %ctx.trace_id,
						query = ctx.query,
						strategy = ctx.strategy.as_str(),
						round = iterations,
						stage = Stage::Evaluate.as_str(),
						"Evaluation failed; ending the loop at the current round."
					);
					steps.push(SearchStep::new(
						Stage::Evaluate,
						iterations,
						"Evaluation failed; using the evidence gathered so far.",
					));

					break;
				},
			};
			let gaps = verdict.gaps.len();

			match evaluator::decide(
				verdict,
				&budget,
				&issued,
				&merger,
				self.cfg.agentic.synthesize_inline,
			) {
				Decision::Continue(next) => {
					steps.push(SearchStep::new(
						Stage::Evaluate,
						iterations,
						format!("Insufficient: {gaps} gaps; {} follow-up sub-queries.", next.len()),
					));
					issued.extend(next.iter().cloned());

					round_queries = next;
				},
				Decision::Synthesize { inline_answer: answer, reason } => {
					steps.push(SearchStep::new(
						Stage::Evaluate,
						iterations,
						format!("Stopped after round {iterations}: {reason}."),
					));

					inline_answer = answer;

					break;
				},
			}
		}

		evaluator::advance(&mut state, LoopState::Synthesizing, ctx.trace_id, iterations);

		Ok(SearchOutcome {
			results: merger.ranked(ctx.max_results as usize),
			sub_queries: issued,
			iterations,
			inline_answer,
			scanned,
			failures,
			steps,
		})
	}

	async fn plan(&self, ctx: &RunContext<'_>) -> Plan {
		let max_queries = ctx.limits.max_sub_queries.min(planner::MAX_DECOMPOSED_QUERIES);

		if max_queries < 2 {
			return Plan::literal(ctx.query);
		}

		let key = if self.cfg.cache.enabled {
			let identifier = serde_json::json!({
				"query": ctx.query,
				"chat_mode": ctx.chat_mode.map(ChatMode::as_str),
				"history": ctx.history,
				"max_queries": max_queries,
				"provider_id": self.cfg.providers.llm.provider_id,
				"model": self.cfg.providers.llm.model,
			});

			match CacheKey::new(CacheKind::Decomposition, &identifier) {
				Ok(key) => Some(key),
				Err(err) => {
					tracing::warn!(
						error = %err,
						cache_kind = CacheKind::Decomposition.as_str(),
						"Cache key build failed."
					);

					None
				},
			}
		} else {
			None
		};

		match key {
			Some(key) => self.flights.run(&key, || self.decompose_through_cache(ctx, &key, max_queries)).await,
			None => self.decompose(ctx, max_queries).await.unwrap_or_else(|| Plan::literal(ctx.query)),
		}
	}

	async fn decompose_through_cache(&self, ctx: &RunContext<'_>, key: &CacheKey, max_queries: u32) -> Plan {
		let ttl_secs = self.cfg.cache.decomposition_ttl_secs;

		if let Some(cached) = self.cache_read::<DecompositionPayload>(key, ttl_secs).await
			&& !cached.queries.is_empty()
		{
			return Plan::from_queries(planner::normalize_queries(
				cached.queries,
				ctx.query,
				max_queries,
			));
		}

		match self.decompose(ctx, max_queries).await {
			Some(plan) => {
				let payload = DecompositionPayload {
					queries: plan.sub_queries.iter().map(|sub_query| sub_query.text.clone()).collect(),
				};

				self.cache_write(key, &payload, ttl_secs).await;

				plan
			},
			None => Plan::literal(ctx.query),
		}
	}

	/// `None` when decomposition failed or added nothing beyond the literal query.
	async fn decompose(&self, ctx: &RunContext<'_>, max_queries: u32) -> Option<Plan> {
		let messages =
			planner::build_decomposition_messages(ctx.query, ctx.chat_mode, ctx.history, max_queries);
		let options = CompletionOptions {
			temperature: Some(planner::DECOMPOSITION_TEMPERATURE),
			max_tokens: Some(planner::DECOMPOSITION_MAX_TOKENS),
		};
		let call = self.providers.completion.complete(&self.cfg.providers.llm, &messages, options);
		let raw = match time::timeout_at(ctx.deadline, call).await {
			Ok(Ok(raw)) => raw,
			Ok(Err(err)) => {
				let err = Error::Decomposition { message: err.to_string() };

				tracing::warn!(
					error = %err,
					trace_id = %ctx.trace_id,
					query = ctx.query,
					strategy = ctx.strategy.as_str(),
					stage = Stage::Plan.as_str(),
					"Query decomposition failed; falling back to the original query."
				);

				return None;
			},
			Err(_) => {
				tracing::warn!(
					trace_id = %ctx.trace_id,
					stage = Stage::Plan.as_str(),
					"Query decomposition timed out; falling back to the original query."
				);

				return None;
			},
		};
		let Some(queries) = planner::parse_decomposition(&raw) else {
			tracing::warn!(
				trace_id = %ctx.trace_id,
				stage = Stage::Plan.as_str(),
				"Query decomposition returned no usable JSON; falling back to the original query."
			);

			return None;
		};
		let plan = Plan::from_queries(planner::normalize_queries(queries, ctx.query, max_queries));

		plan.decomposed.then_some(plan)
	}

	async fn evaluate(
		&self,
		ctx: &RunContext<'_>,
		evidence: &[RankedResult],
		issued: &[SubQuery],
		max_follow_ups: usize,
	) -> Result<EvaluationVerdict> {
		let synthesize_inline = self.cfg.agentic.synthesize_inline;
		let messages = evaluator::build_evaluation_messages(
			ctx.query,
			evidence,
			issued,
			max_follow_ups,
			synthesize_inline,
		);
		let options = CompletionOptions {
			temperature: Some(evaluator::EVALUATION_TEMPERATURE),
			max_tokens: Some(if synthesize_inline {
				prompt::SYNTHESIS_MAX_TOKENS
			} else {
				evaluator::EVALUATION_MAX_TOKENS
			}),
		};
		let deadline = (Instant::now() + Duration::from_millis(self.cfg.agentic.evaluation_timeout_ms))
			.min(ctx.deadline);
		let call = self.providers.completion.complete(&self.cfg.providers.llm, &messages, options);
		let raw = time::timeout_at(deadline, call)
			.await
			.map_err(|_| Error::Evaluation { message: "Evaluation timed out.".to_string() })?
			.map_err(|err| Error::Evaluation { message: err.to_string() })?;

		evaluator::parse_verdict(&raw).ok_or_else(|| Error::Evaluation {
			message: "Evaluator output contained no JSON verdict.".to_string(),
		})
	}

	/// Returns the answer and how many sources made it into the prompt.
	async fn synthesize(&self, ctx: &RunContext<'_>, outcome: &SearchOutcome) -> Result<(String, usize)> {
		let context = prompt::build(
			&outcome.results,
			&outcome.sub_queries,
			&PromptOptions {
				style: ctx.style,
				chat_mode: ctx.chat_mode,
				budget_chars: self.cfg.prompt.context_budget_chars as usize,
				max_excerpt_chars: self.cfg.prompt.max_excerpt_chars as usize,
			},
		);
		let messages = context.messages(ctx.query, ctx.history);
		let options = CompletionOptions {
			temperature: Some(prompt::SYNTHESIS_TEMPERATURE),
			max_tokens: Some(prompt::SYNTHESIS_MAX_TOKENS),
		};
		let call = self.providers.completion.complete(&self.cfg.providers.llm, &messages, options);

		// Retrieval may spend the whole request deadline; the answer call gets its own window.
		match time::timeout(Duration::from_millis(self.cfg.providers.llm.timeout_ms), call).await {
			Ok(Ok(answer)) => Ok((answer, context.citations.len())),
			Ok(Err(err)) => Err(Error::Synthesis { message: err.to_string() }),
			Err(_) => Err(Error::Synthesis { message: "Synthesis timed out.".to_string() }),
		}
	}

	fn search_cache_key(&self, ctx: &RunContext<'_>) -> Option<CacheKey> {
		if !self.cfg.cache.enabled {
			return None;
		}

		let adapters: Vec<&str> = ctx.adapters.iter().map(|adapter| adapter.name()).collect();
		let identifier = serde_json::json!({
			"query": ctx.query,
			"strategy": ctx.strategy.as_str(),
			"adapters": adapters,
			"max_results": ctx.max_results,
			"style": ctx.style.as_str(),
			"chat_mode": ctx.chat_mode.map(ChatMode::as_str),
			"history": ctx.history,
			"provider_id": self.cfg.providers.llm.provider_id,
			"model": self.cfg.providers.llm.model,
		});

		match CacheKey::new(CacheKind::Search, &identifier) {
			Ok(key) => Some(key),
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_kind = CacheKind::Search.as_str(),
					"Cache key build failed."
				);

				None
			},
		}
	}

	async fn cache_read<T>(&self, key: &CacheKey, ttl_secs: i64) -> Option<T>
	where
		T: DeserializeOwned,
	{
		match self.cache.get(key).await {
			Ok(Some(value)) => match serde_json::from_value(value) {
				Ok(decoded) => {
					tracing::info!(
						cache_kind = key.kind().as_str(),
						cache_key_prefix = key.prefix(),
						hit = true,
						ttl_secs,
						"Cache hit."
					);

					Some(decoded)
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						cache_kind = key.kind().as_str(),
						cache_key_prefix = key.prefix(),
						"Cache payload decode failed."
					);

					None
				},
			},
			Ok(None) => {
				tracing::info!(
					cache_kind = key.kind().as_str(),
					cache_key_prefix = key.prefix(),
					hit = false,
					ttl_secs,
					"Cache miss."
				);

				None
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_kind = key.kind().as_str(),
					cache_key_prefix = key.prefix(),
					"Cache read failed."
				);

				None
			},
		}
	}

	async fn cache_write<T>(&self, key: &CacheKey, payload: &T, ttl_secs: i64)
	where
		T: Serialize,
	{
		let value = match serde_json::to_value(payload) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_kind = key.kind().as_str(),
					cache_key_prefix = key.prefix(),
					"Cache payload encode failed."
				);

				return;
			},
		};
		let payload_size = value.to_string().len() as u64;

		if let Some(max) = self.cfg.cache.max_payload_bytes
			&& payload_size > max
		{
			tracing::warn!(
				cache_kind = key.kind().as_str(),
				cache_key_prefix = key.prefix(),
				payload_size,
				max_payload_bytes = max,
				"Cache payload skipped due to size."
			);

			return;
		}

		match self.cache.set(key, value, ::time::Duration::seconds(ttl_secs)).await {
			Ok(()) => tracing::info!(
				cache_kind = key.kind().as_str(),
				cache_key_prefix = key.prefix(),
				payload_size,
				ttl_secs,
				"Cache stored."
			),
			Err(err) => tracing::warn!(
				error = %err,
				cache_kind = key.kind().as_str(),
				cache_key_prefix = key.prefix(),
				"Cache write failed."
			),
		}
	}
}

fn default_strategy() -> Strategy {
	Strategy::Research
}

fn failed_stage(err: &Error) -> &'static str {
	match err {
		Error::InvalidRequest { .. } => "validate",
		Error::Decomposition { .. } => Stage::Plan.as_str(),
		Error::Adapter { .. } | Error::RetrievalFailed { .. } => Stage::Retrieve.as_str(),
		Error::Evaluation { .. } => Stage::Evaluate.as_str(),
		Error::Synthesis { .. } => Stage::Synthesize.as_str(),
		Error::Cache { .. } => "cache",
	}
}
