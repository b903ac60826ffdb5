use axum::{
	Json, Router,
	extract::{
		Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use juris_service::{
	Error as ServiceError, QuickLookupRequest, QuickLookupResponse, SearchRequest, SearchResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/search/quick", get(quick_lookup))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Json(payload) = payload?;
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

/// `sources` is a comma-separated adapter list.
#[derive(Debug, Deserialize)]
struct QuickLookupParams {
	#[serde(default)]
	q: String,
	#[serde(default)]
	limit: Option<u32>,
	#[serde(default)]
	sources: Option<String>,
}
impl From<QuickLookupParams> for QuickLookupRequest {
	fn from(params: QuickLookupParams) -> Self {
		let source_filter = params
			.sources
			.as_deref()
			.unwrap_or_default()
			.split(',')
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::to_string)
			.collect();

		Self { q: params.q, limit: params.limit, source_filter }
	}
}

async fn quick_lookup(
	State(state): State<AppState>,
	params: Result<Query<QuickLookupParams>, QueryRejection>,
) -> Result<Json<QuickLookupResponse>, ApiError> {
	let Query(params) = params?;
	let response = state.service.quick_lookup(params.into()).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.public_message();

		match err {
			ServiceError::InvalidRequest { .. } => {
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message)
			},
			ServiceError::RetrievalFailed { .. } => {
				tracing::error!(error = %err, "Search failed before any source answered.");

				json_error(StatusCode::SERVICE_UNAVAILABLE, "retrieval_failed", message)
			},
			ServiceError::Synthesis { .. } => {
				tracing::error!(error = %err, "Answer synthesis failed.");

				json_error(StatusCode::BAD_GATEWAY, "synthesis_failed", message)
			},
			other => {
				tracing::error!(error = %other, "Search failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
			},
		}
	}
}

impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
	}
}

impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
