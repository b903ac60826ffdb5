use std::{
	collections::HashSet,
	sync::{Arc, Mutex},
	time::Duration,
};

use juris_config::{Config, Strategy};
use juris_domain::{AdapterRegistry, BoxFuture, Hit, SourceAdapter};
use juris_service::{
	ChatRole, ChatTurn, Error, FailureReason, HistoryEntry, HistorySink, JurisService, Providers,
	QuickLookupRequest, SearchRequest, Stage,
};
use juris_testkit::{
	CompletionKind, EchoAdapter, FailingAdapter, PrefixAdapter, Reply, ScriptedCompletion,
	SlowAdapter, StaticAdapter, hit,
};

#[derive(Default)]
struct RecordingHistory {
	entries: Mutex<Vec<HistoryEntry>>,
}
impl RecordingHistory {
	fn entries(&self) -> Vec<HistoryEntry> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl HistorySink for RecordingHistory {
	fn record(&self, entry: HistoryEntry) -> BoxFuture<'_, color_eyre::Result<()>> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).push(entry);

		Box::pin(async { Ok(()) })
	}
}

struct BrokenHistory;
impl HistorySink for BrokenHistory {
	fn record(&self, _entry: HistoryEntry) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async { Err(color_eyre::eyre::eyre!("history store offline")) })
	}
}

fn config() -> Config {
	juris_testkit::test_config().expect("Test config should load.")
}

fn share<A>(adapter: &Arc<A>) -> Arc<dyn SourceAdapter>
where
	A: SourceAdapter + 'static,
{
	adapter.clone()
}

fn registry(adapters: Vec<Arc<dyn SourceAdapter>>) -> AdapterRegistry {
	let mut registry = AdapterRegistry::new();

	for adapter in adapters {
		registry.register(adapter).expect("Adapter should register.");
	}

	registry
}

fn service(cfg: Config, registry: AdapterRegistry, completion: &Arc<ScriptedCompletion>) -> JurisService {
	JurisService::with_providers(cfg, registry, Providers::new(completion.clone()))
}

fn hits(prefix: &str, count: usize) -> Vec<Hit> {
	(1..=count)
		.map(|idx| {
			hit(
				&format!("{prefix}-{idx}"),
				&format!("{prefix} document {idx}"),
				Some(&format!("20{:02}", idx % 25)),
				(idx % 7) as f32 + 1.0,
			)
		})
		.collect()
}

fn assert_unique(sources: impl Iterator<Item = (String, String)>) {
	let mut seen = HashSet::new();

	for key in sources {
		assert!(seen.insert(key.clone()), "Duplicate result {key:?}.");
	}
}

#[tokio::test]
async fn quick_search_respects_source_filter_and_skips_synthesis() {
	let jurisprudence = Arc::new(StaticAdapter::new("jurisprudence", hits("gr", 15)));
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 5)));
	let completion = Arc::new(ScriptedCompletion::new());
	let service =
		service(config(), registry(vec![share(&jurisprudence), share(&law)]), &completion);
	let mut req = SearchRequest::new("requirements for double jeopardy", Strategy::Quick);

	req.source_filter = vec!["jurisprudence".to_string()];

	let response = service.search(req).await.expect("Quick search should succeed.");

	assert!(!response.sources.is_empty());
	assert!(response.sources.len() <= 10);
	assert!(response.sources.iter().all(|source| source.adapter == "jurisprudence"));
	assert_eq!(response.answer, None);
	assert_eq!(response.sub_queries, vec!["requirements for double jeopardy".to_string()]);
	assert_eq!(response.iterations, 1);
	assert_eq!(law.calls(), 0);
	assert_eq!(completion.calls(CompletionKind::Decomposition), 0);
	assert_eq!(completion.calls(CompletionKind::Synthesis), 0);
}

#[tokio::test]
async fn research_search_decomposes_and_bounds_results() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 30)));
	let jurisprudence = Arc::new(StaticAdapter::new("jurisprudence", hits("gr", 30)));
	let completion = Arc::new(ScriptedCompletion::new().decomposition(Reply::Text(
		r#"["2004 Rules on Notarial Practice", "remote notarization during the COVID-19 pandemic", "Supreme Court rulings on electronic notarization"]"#
			.to_string(),
	)));
	let service =
		service(config(), registry(vec![share(&law), share(&jurisprudence)]), &completion);
	let query = "validity of online notarization during pandemic";
	let mut req = SearchRequest::new(query, Strategy::Research);

	req.max_results = Some(20);

	let response = service.search(req).await.expect("Research search should succeed.");

	assert!(response.sub_queries.len() > 1);
	assert!(response.sub_queries.len() <= 4);
	assert_eq!(response.sub_queries[0], query);
	assert!(response.sub_queries.iter().any(|sub_query| sub_query != query));
	assert!(response.sources.len() <= 20);
	assert_unique(response.sources.iter().map(|s| (s.adapter.clone(), s.id.clone())));
	assert_eq!(response.answer.as_deref(), Some("Scripted answer citing [1]."));
	assert!(response.steps.iter().any(|step| step.stage == Stage::Synthesize));

	let synthesis = completion
		.last_messages(CompletionKind::Synthesis)
		.expect("Synthesis should have been called.");
	let system = synthesis[0]["content"].as_str().expect("system prompt");

	assert!(system.contains("  2. 2004 Rules on Notarial Practice"));
	assert!(system.contains("[1] "));
	assert_eq!(synthesis[1]["content"], query);
}

#[tokio::test]
async fn results_are_ordered_by_score_then_date_then_title() {
	let law = Arc::new(StaticAdapter::new(
		"law",
		vec![
			hit("a", "Zeta Act", Some("2019"), 5.0),
			hit("b", "Alpha Act", Some("2019"), 5.0),
			hit("c", "Beta Act", Some("2021"), 5.0),
			hit("d", "Undated Act", None, 5.0),
			hit("e", "Top Act", None, 9.0),
		],
	));
	let completion = Arc::new(ScriptedCompletion::new());
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let response = service
		.search(SearchRequest::new("acts", Strategy::Quick))
		.await
		.expect("Quick search should succeed.");
	let titles: Vec<_> = response.sources.iter().map(|source| source.title.as_str()).collect();

	assert_eq!(titles, vec!["Top Act", "Beta Act", "Alpha Act", "Zeta Act", "Undated Act"]);
	assert_eq!(
		response.sources.iter().map(|source| source.rank).collect::<Vec<_>>(),
		vec![1, 2, 3, 4, 5]
	);

	for pair in response.sources.windows(2) {
		assert!(pair[0].score >= pair[1].score);
		assert!((0.0..=1.0).contains(&pair[0].score));
	}
}

#[tokio::test]
async fn quick_search_is_idempotent() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 20)));
	let jurisprudence = Arc::new(StaticAdapter::new("jurisprudence", hits("gr", 20)));
	let completion = Arc::new(ScriptedCompletion::new());
	let mut cfg = config();

	cfg.cache.enabled = false;

	let service = service(cfg, registry(vec![share(&law), share(&jurisprudence)]), &completion);
	let ids = |sources: &[juris_service::SearchSource]| {
		sources.iter().map(|s| (s.adapter.clone(), s.id.clone())).collect::<Vec<_>>()
	};
	let first = service
		.search(SearchRequest::new("estafa", Strategy::Quick))
		.await
		.expect("First search should succeed.");
	let second = service
		.search(SearchRequest::new("estafa", Strategy::Quick))
		.await
		.expect("Second search should succeed.");

	assert_eq!(ids(&first.sources), ids(&second.sources));
	assert_eq!(law.calls(), 2);
}

#[tokio::test]
async fn agentic_search_survives_a_failing_adapter() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 8)));
	let broken = Arc::new(FailingAdapter::new("broken"));
	let completion = Arc::new(ScriptedCompletion::new().evaluation(Reply::FreshFollowUps));
	let cfg = config();
	let cap = cfg.strategies.agentic.max_rounds;
	let service = service(cfg, registry(vec![share(&law), share(&broken)]), &completion);
	let mut req = SearchRequest::new("liability of a corporate officer for estafa", Strategy::Agentic);

	req.max_results = Some(10);

	let response = service.search(req).await.expect("Agentic search should not fail.");

	assert!(!response.sources.is_empty());
	assert!(response.sources.len() <= 10);
	assert!(response.sources.iter().all(|source| source.adapter == "law"));
	assert!(response.iterations <= cap);
	assert!(broken.calls() >= 1);
	assert!(response.answer.is_some());
}

#[tokio::test]
async fn agentic_loop_stops_at_the_round_cap() {
	let echo = Arc::new(EchoAdapter::new("law"));
	let completion = Arc::new(ScriptedCompletion::new().evaluation(Reply::FreshFollowUps));
	let service = service(config(), registry(vec![share(&echo)]), &completion);
	let outcome = service
		.retrieve(&SearchRequest::new("theft of electricity", Strategy::Agentic))
		.await
		.expect("Retrieval should succeed.");

	assert_eq!(outcome.iterations, 3);
	assert_eq!(outcome.sub_queries.len(), 3);
	assert_eq!(outcome.sub_queries[2].round, 3);
	assert_eq!(outcome.results.len(), 3);
	assert_eq!(completion.calls(CompletionKind::Evaluation), 2);
}

#[tokio::test]
async fn agentic_loop_stops_when_the_sub_query_budget_is_spent() {
	let echo = Arc::new(EchoAdapter::new("law"));
	let completion = Arc::new(ScriptedCompletion::new().evaluation(Reply::FreshFollowUps));
	let mut cfg = config();

	cfg.strategies.agentic.max_sub_queries = 2;

	let service = service(cfg, registry(vec![share(&echo)]), &completion);
	let outcome = service
		.retrieve(&SearchRequest::new("theft of electricity", Strategy::Agentic))
		.await
		.expect("Retrieval should succeed.");

	assert_eq!(outcome.sub_queries.len(), 2);
	assert_eq!(outcome.iterations, 2);
}

#[tokio::test]
async fn agentic_loop_stops_without_progress() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 4)));
	let completion = Arc::new(ScriptedCompletion::new().evaluation(Reply::FreshFollowUps));
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let outcome = service
		.retrieve(&SearchRequest::new("illegal dismissal", Strategy::Agentic))
		.await
		.expect("Retrieval should succeed.");

	assert_eq!(outcome.iterations, 2);
	assert_eq!(completion.calls(CompletionKind::Evaluation), 1);
}

#[tokio::test]
async fn agentic_loop_follows_up_when_the_first_round_finds_nothing() {
	let law = Arc::new(PrefixAdapter::new("law", "follow-up"));
	let completion = Arc::new(
		ScriptedCompletion::new()
			.evaluation(Reply::FreshFollowUps)
			.delayed(Duration::from_millis(5)),
	);
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let outcome = service
		.retrieve(&SearchRequest::new("theft of electricity", Strategy::Agentic))
		.await
		.expect("Retrieval should succeed.");

	assert_eq!(outcome.iterations, 3);
	assert_eq!(completion.calls(CompletionKind::Evaluation), 2);
	assert_eq!(outcome.sub_queries[1].text, "follow-up query 1");
	assert_eq!(outcome.results.len(), 2);
	assert!(outcome.results.iter().all(|result| result.hit.id.starts_with("prefix:follow-up")));
	assert_eq!(law.calls(), 3);
}

#[tokio::test]
async fn evaluation_failure_ends_the_loop_and_still_synthesizes() {
	let echo = Arc::new(EchoAdapter::new("law"));
	let completion = Arc::new(
		ScriptedCompletion::new().evaluation(Reply::Fail("evaluator unavailable".to_string())),
	);
	let service = service(config(), registry(vec![share(&echo)]), &completion);
	let response = service
		.search(SearchRequest::new("writ of amparo", Strategy::Agentic))
		.await
		.expect("Search should degrade, not fail.");

	assert_eq!(response.iterations, 1);
	assert_eq!(response.answer.as_deref(), Some("Scripted answer citing [1]."));
	assert!(
		response
			.steps
			.iter()
			.any(|step| step.stage == Stage::Evaluate && step.detail.contains("failed"))
	);
}

#[tokio::test]
async fn inline_answers_bypass_synthesis() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let completion = Arc::new(ScriptedCompletion::new().evaluation(Reply::Text(
		r#"{"sufficient": true, "gaps": [], "next_queries": [], "answer": "Inline answer [1]."}"#
			.to_string(),
	)));
	let mut cfg = config();

	cfg.agentic.synthesize_inline = true;

	let service = service(cfg, registry(vec![share(&law)]), &completion);
	let response = service
		.search(SearchRequest::new("bigamy elements", Strategy::Agentic))
		.await
		.expect("Search should succeed.");

	assert_eq!(response.answer.as_deref(), Some("Inline answer [1]."));
	assert_eq!(completion.calls(CompletionKind::Synthesis), 0);
}

#[tokio::test]
async fn decomposition_failure_falls_back_to_the_literal_query() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let completion = Arc::new(ScriptedCompletion::new());
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let response = service
		.search(SearchRequest::new("annulment grounds", Strategy::Research))
		.await
		.expect("Search should succeed.");

	assert_eq!(response.sub_queries, vec!["annulment grounds".to_string()]);
	assert_eq!(completion.calls(CompletionKind::Decomposition), 1);
	assert!(response.answer.is_some());
}

#[tokio::test]
async fn decomposition_caps_sub_queries() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let many: Vec<String> = (1..=12).map(|idx| format!("angle {idx}")).collect();
	let completion = Arc::new(
		ScriptedCompletion::new()
			.decomposition(Reply::Text(serde_json::to_string(&many).expect("encode"))),
	);
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let response = service
		.search(SearchRequest::new("labor only contracting", Strategy::Research))
		.await
		.expect("Search should succeed.");

	assert_eq!(response.sub_queries.len(), 4);
	assert_eq!(response.sub_queries[0], "labor only contracting");
}

#[tokio::test]
async fn total_retrieval_failure_surfaces_a_generic_error() {
	let broken = Arc::new(FailingAdapter::new("broken"));
	let completion = Arc::new(ScriptedCompletion::new());
	let service = service(config(), registry(vec![share(&broken)]), &completion);
	let err = service
		.search(SearchRequest::new("estafa", Strategy::Quick))
		.await
		.expect_err("Expected retrieval failure.");

	assert!(matches!(err, Error::RetrievalFailed { .. }));
	assert!(!err.public_message().contains("scripted failure"));
}

#[tokio::test]
async fn failing_adapters_with_usable_decomposition_do_not_fail_the_request() {
	let broken = Arc::new(FailingAdapter::new("broken"));
	let completion = Arc::new(
		ScriptedCompletion::new().decomposition(Reply::Text(r#"["estafa elements"]"#.to_string())),
	);
	let service = service(config(), registry(vec![share(&broken)]), &completion);
	let response = service
		.search(SearchRequest::new("estafa", Strategy::Research))
		.await
		.expect("Search should fall back to synthesis without sources.");

	assert!(response.sources.is_empty());
	assert!(response.answer.is_some());
}

#[tokio::test]
async fn synthesis_failure_is_fatal_and_generic() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let completion = Arc::new(
		ScriptedCompletion::new().synthesis(Reply::Fail("upstream 502 from provider".to_string())),
	);
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let err = service
		.search(SearchRequest::new("estafa", Strategy::Research))
		.await
		.expect_err("Expected synthesis failure.");

	assert!(matches!(err, Error::Synthesis { .. }));
	assert!(!err.public_message().contains("502"));
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_retrieval() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let completion = Arc::new(ScriptedCompletion::new());
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let mut unknown = SearchRequest::new("estafa", Strategy::Quick);

	unknown.source_filter = vec!["statutes".to_string()];

	let mut zero = SearchRequest::new("estafa", Strategy::Quick);

	zero.max_results = Some(0);

	for req in [SearchRequest::new("   ", Strategy::Quick), unknown, zero] {
		let err = service.search(req).await.expect_err("Expected validation error.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}

	assert_eq!(law.calls(), 0);
}

#[tokio::test]
async fn user_files_are_searched_only_on_request() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let mine = Arc::new(StaticAdapter::user_files("user_files", hits("upload", 3)));
	let completion = Arc::new(ScriptedCompletion::new());
	let service = service(config(), registry(vec![share(&law), share(&mine)]), &completion);
	let without = service
		.search(SearchRequest::new("lease contract", Strategy::Quick))
		.await
		.expect("Search should succeed.");

	assert_eq!(mine.calls(), 0);
	assert!(without.sources.iter().all(|source| source.adapter == "law"));

	let mut req = SearchRequest::new("lease contract", Strategy::Quick);

	req.include_user_files = true;

	let with = service.search(req).await.expect("Search should succeed.");

	assert_eq!(mine.calls(), 1);
	assert!(with.sources.iter().any(|source| source.adapter == "user_files"));
}

#[tokio::test]
async fn slow_adapters_time_out_without_failing_the_round() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let slow = Arc::new(SlowAdapter::new("slow", Duration::from_millis(500), hits("late", 3)));
	let completion = Arc::new(ScriptedCompletion::new());
	let mut cfg = config();

	cfg.retrieval.adapter_timeout_ms = 50;

	let service = service(cfg, registry(vec![share(&law), share(&slow)]), &completion);
	let outcome = service
		.retrieve(&SearchRequest::new("estafa", Strategy::Quick))
		.await
		.expect("Retrieval should succeed.");

	assert!(outcome.results.iter().all(|result| result.adapter == "law"));
	assert_eq!(outcome.failures.len(), 1);
	assert_eq!(outcome.failures[0].adapter, "slow");
	assert_eq!(outcome.failures[0].reason, FailureReason::Timeout);
}

#[tokio::test]
async fn round_deadline_keeps_partial_results() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let slow = Arc::new(SlowAdapter::new("slow", Duration::from_millis(800), hits("late", 3)));
	let completion = Arc::new(ScriptedCompletion::new());
	let mut cfg = config();

	cfg.strategies.quick.round_deadline_ms = 50;

	let service = service(cfg, registry(vec![share(&law), share(&slow)]), &completion);
	let outcome = service
		.retrieve(&SearchRequest::new("estafa", Strategy::Quick))
		.await
		.expect("Retrieval should succeed.");

	assert_eq!(outcome.results.len(), 3);
	assert!(
		outcome
			.failures
			.iter()
			.any(|failure| failure.adapter == "slow" && failure.reason == FailureReason::Timeout)
	);
}

#[tokio::test]
async fn identical_searches_are_served_from_cache() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let completion = Arc::new(
		ScriptedCompletion::new().decomposition(Reply::Text(r#"["estafa elements"]"#.to_string())),
	);
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let first = service
		.search(SearchRequest::new("estafa", Strategy::Research))
		.await
		.expect("First search should succeed.");
	let second = service
		.search(SearchRequest::new("estafa", Strategy::Research))
		.await
		.expect("Second search should succeed.");

	assert_ne!(first.trace_id, second.trace_id);
	assert_eq!(first.sources, second.sources);
	assert_eq!(completion.calls(CompletionKind::Synthesis), 1);
	assert_eq!(completion.calls(CompletionKind::Decomposition), 1);
}

#[tokio::test]
async fn searches_with_adapter_failures_are_not_cached() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let broken = Arc::new(FailingAdapter::new("broken"));
	let completion = Arc::new(ScriptedCompletion::new());
	let service = service(config(), registry(vec![share(&law), share(&broken)]), &completion);

	for _ in 0..2 {
		service
			.search(SearchRequest::new("estafa", Strategy::Research))
			.await
			.expect("Search should succeed.");
	}

	assert_eq!(completion.calls(CompletionKind::Synthesis), 2);
}

#[tokio::test]
async fn history_is_recorded_and_its_failures_are_ignored() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let completion = Arc::new(ScriptedCompletion::new());
	let history = Arc::new(RecordingHistory::default());
	let recorded = service(config(), registry(vec![share(&law)]), &completion)
		.with_history(history.clone());
	let mut req = SearchRequest::new("estafa", Strategy::Quick);

	req.source_filter = vec!["law".to_string()];

	recorded.search(req).await.expect("Search should succeed.");

	for _ in 0..100 {
		if !history.entries().is_empty() {
			break;
		}

		tokio::time::sleep(Duration::from_millis(10)).await;
	}

	let entries = history.entries();

	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].query, "estafa");
	assert_eq!(entries[0].source_filter, vec!["law".to_string()]);
	assert_eq!(entries[0].strategy, Strategy::Quick);
	assert_eq!(entries[0].result_count, 3);

	let broken = service(config(), registry(vec![share(&law)]), &completion)
		.with_history(Arc::new(BrokenHistory));

	broken
		.search(SearchRequest::new("estafa", Strategy::Quick))
		.await
		.expect("History failures must not fail the search.");
}

#[tokio::test]
async fn quick_lookup_clamps_its_limit() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 80)));
	let completion = Arc::new(ScriptedCompletion::new());
	let mut cfg = config();

	cfg.retrieval.max_hits_per_adapter = 100;

	let service = service(cfg, registry(vec![share(&law)]), &completion);
	let lookup = |limit| QuickLookupRequest { q: "estafa".to_string(), limit, source_filter: Vec::new() };
	let capped = service.quick_lookup(lookup(Some(500))).await.expect("Lookup should succeed.");
	let default = service.quick_lookup(lookup(None)).await.expect("Lookup should succeed.");
	let floor = service.quick_lookup(lookup(Some(0))).await.expect("Lookup should succeed.");

	assert_eq!(capped.total_results, 50);
	assert_eq!(default.total_results, 10);
	assert_eq!(floor.results.len(), 1);
	assert_eq!(completion.calls(CompletionKind::Synthesis), 0);

	let err = service
		.quick_lookup(QuickLookupRequest { q: " ".to_string(), limit: None, source_filter: Vec::new() })
		.await
		.expect_err("Expected validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn synthesis_runs_after_retrieval_spends_the_request_deadline() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let slow = Arc::new(SlowAdapter::new("slow", Duration::from_secs(2), hits("late", 3)));
	let completion = Arc::new(ScriptedCompletion::new().delayed(Duration::from_millis(5)));
	let mut cfg = config();

	cfg.service.request_timeout_ms = 200;

	let service = service(cfg, registry(vec![share(&law), share(&slow)]), &completion);
	let response = service
		.search(SearchRequest::new("estafa", Strategy::Research))
		.await
		.expect("Search should keep partial results and still answer.");

	assert_eq!(response.answer.as_deref(), Some("Scripted answer citing [1]."));
	assert_eq!(response.sources.len(), 3);
	assert!(response.sources.iter().all(|source| source.adapter == "law"));
	assert_eq!(completion.calls(CompletionKind::Synthesis), 1);
}

#[tokio::test]
async fn conversation_history_reaches_planning_and_synthesis() {
	let law = Arc::new(StaticAdapter::new("law", hits("ra", 3)));
	let completion = Arc::new(ScriptedCompletion::new());
	let service = service(config(), registry(vec![share(&law)]), &completion);
	let mut req = SearchRequest::new("what about qualified theft?", Strategy::Research);

	req.history = vec![
		ChatTurn::new(ChatRole::User, "what is the penalty for simple theft?"),
		ChatTurn::new(ChatRole::Assistant, "Article 309 as amended by RA 10951 [1]."),
	];

	service.search(req).await.expect("Search should succeed.");

	let synthesis = completion
		.last_messages(CompletionKind::Synthesis)
		.expect("Synthesis should have been called.");

	assert_eq!(synthesis.len(), 4);
	assert_eq!(synthesis[1]["role"], "user");
	assert_eq!(synthesis[1]["content"], "what is the penalty for simple theft?");
	assert_eq!(synthesis[2]["role"], "assistant");
	assert_eq!(synthesis[3]["content"], "what about qualified theft?");

	let decomposition = completion
		.last_messages(CompletionKind::Decomposition)
		.expect("Decomposition should have been called.");
	let prompt = decomposition[1]["content"].as_str().expect("Decomposition prompt.");

	assert!(prompt.contains("Conversation context:\nuser: what is the penalty for simple theft?"));

	service
		.search(SearchRequest::new("what about qualified theft?", Strategy::Research))
		.await
		.expect("Search without history should succeed.");

	let plain = completion
		.last_messages(CompletionKind::Synthesis)
		.expect("Second search should synthesize again.");

	assert_eq!(completion.calls(CompletionKind::Synthesis), 2);
	assert_eq!(plain.len(), 2);
}
