use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use juris_api::{routes, state::AppState};
use juris_domain::AdapterRegistry;
use juris_service::{JurisService, Providers};
use juris_testkit::{FailingAdapter, ScriptedCompletion, StaticAdapter, hit};

fn app_with(registry: AdapterRegistry) -> Router {
	let cfg = juris_testkit::test_config().expect("Test config should load.");
	let completion = Arc::new(ScriptedCompletion::new());
	let service = JurisService::with_providers(cfg, registry, Providers::new(completion));

	routes::router(AppState::from_service(service))
}

fn app() -> Router {
	let mut registry = AdapterRegistry::new();
	let hits = vec![
		hit("ra-10173", "Data Privacy Act of 2012", Some("2012-08-15"), 9.0),
		hit("ra-8792", "Electronic Commerce Act of 2000", Some("2000-06-14"), 6.0),
	];

	registry.register(Arc::new(StaticAdapter::new("laws", hits))).expect("Adapter should register.");

	app_with(registry)
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should read.");

	serde_json::from_slice(&bytes).expect("Body should be JSON.")
}

fn post_search(payload: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri("/v1/search")
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Request should build.")
}

#[tokio::test]
async fn health_returns_ok() {
	let response = app()
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Request should build."))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn research_search_returns_answer_and_sources() {
	let response = app()
		.oneshot(post_search(serde_json::json!({
			"query": "data privacy obligations",
			"strategy": "research",
		})))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["answer"], "Scripted answer citing [1].");
	assert_eq!(body["sources"][0]["title"], "Data Privacy Act of 2012");
	assert_eq!(body["sources"][0]["rank"], 1);
	assert!(body["traceId"].is_string());
}

#[tokio::test]
async fn blank_query_maps_to_bad_request() {
	let response = app()
		.oneshot(post_search(serde_json::json!({ "query": "   ", "strategy": "quick" })))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
	for payload in [
		serde_json::json!({ "query": "bail for estafa", "strategy": "deep" }),
		serde_json::json!({ "strategy": "quick" }),
		serde_json::json!({ "query": "bail", "history": [{ "role": "system", "content": "x" }] }),
	] {
		let response = app().oneshot(post_search(payload)).await.expect("Router should respond.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let body = json_body(response).await;

		assert_eq!(body["error_code"], "invalid_request");
		assert!(body["message"].is_string());
	}
}

#[tokio::test]
async fn history_is_accepted_in_the_search_body() {
	let response = app()
		.oneshot(post_search(serde_json::json!({
			"query": "and for sensitive personal information?",
			"strategy": "research",
			"history": [
				{ "role": "user", "content": "what does the Data Privacy Act cover?" },
				{ "role": "assistant", "content": "Personal information processing [1]." },
			],
		})))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn total_retrieval_failure_hides_adapter_detail() {
	let mut registry = AdapterRegistry::new();

	registry.register(Arc::new(FailingAdapter::new("laws"))).expect("Adapter should register.");

	let response = app_with(registry)
		.oneshot(post_search(serde_json::json!({ "query": "tax amnesty", "strategy": "quick" })))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], "retrieval_failed");
	assert!(!body["message"].as_str().unwrap_or_default().contains("scripted failure"));
}

#[tokio::test]
async fn quick_lookup_reads_query_string() {
	let response = app()
		.oneshot(
			Request::builder()
				.uri("/v1/search/quick?q=privacy&limit=1&sources=laws")
				.body(Body::empty())
				.expect("Request should build."),
		)
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["totalResults"], 1);
	assert_eq!(body["results"][0]["id"], "ra-10173");
}

#[tokio::test]
async fn quick_lookup_rejects_unknown_source() {
	let response = app()
		.oneshot(
			Request::builder()
				.uri("/v1/search/quick?q=privacy&sources=laws,nowhere")
				.body(Body::empty())
				.expect("Request should build."),
		)
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quick_lookup_rejects_a_malformed_limit() {
	let response = app()
		.oneshot(
			Request::builder()
				.uri("/v1/search/quick?q=privacy&limit=many")
				.body(Body::empty())
				.expect("Request should build."),
		)
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json_body(response).await["error_code"], "invalid_request");
}
