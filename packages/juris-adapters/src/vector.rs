//! Client adapter for a vector-search sidecar exposing `POST /search`.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use juris_domain::{
	AdapterSearchOptions, BoxFuture, Error, Hit, Result, SourceAdapter, SubQuery, score,
};

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
	query: &'a str,
	top_k: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	score_threshold: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	category_filter: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
	#[serde(default)]
	results: Vec<SidecarChunk>,
}

#[derive(Debug, Deserialize)]
struct SidecarChunk {
	id: String,
	#[serde(default)]
	text: String,
	score: f32,
	#[serde(default)]
	category: String,
	#[serde(default)]
	subcategory: String,
	#[serde(default)]
	filepath: Option<String>,
	#[serde(default)]
	title: String,
	#[serde(default)]
	date: Option<String>,
}
impl SidecarChunk {
	fn into_hit(self) -> Hit {
		let title = if self.title.trim().is_empty() { self.id.clone() } else { self.title };

		Hit {
			id: self.id,
			title,
			category: self.category,
			subcategory: self.subcategory,
			number: None,
			date: self.date.filter(|d| !d.trim().is_empty()),
			score: self.score,
			relevant_text: self.text,
			path: self.filepath.filter(|p| !p.trim().is_empty()),
		}
	}
}

#[derive(Debug, Clone)]
pub struct VectorAdapter {
	name: String,
	url: String,
	client: Client,
	score_threshold: Option<f32>,
}
impl VectorAdapter {
	pub fn new(cfg: &juris_config::VectorCorpus) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()
			.map_err(|err| Error::adapter(&cfg.name, err))?;

		Ok(Self {
			name: cfg.name.trim().to_string(),
			url: cfg.url.trim_end_matches('/').to_string(),
			client,
			score_threshold: cfg.score_threshold,
		})
	}

	async fn post_search(&self, query: &str, options: &AdapterSearchOptions) -> Result<Vec<Hit>> {
		let body = SearchBody {
			query,
			top_k: options.limit,
			score_threshold: self.score_threshold,
			category_filter: options.category_filter.as_deref(),
		};
		let res = self
			.client
			.post(format!("{}/search", self.url))
			.json(&body)
			.send()
			.await
			.and_then(|res| res.error_for_status())
			.map_err(|err| Error::adapter(&self.name, err))?;
		let parsed: SearchResponse =
			res.json().await.map_err(|err| Error::adapter(&self.name, err))?;
		let mut hits: Vec<Hit> = parsed.results.into_iter().map(SidecarChunk::into_hit).collect();

		hits.truncate(options.limit as usize);

		Ok(hits)
	}
}
impl SourceAdapter for VectorAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	fn search<'a>(
		&'a self,
		query: &'a SubQuery,
		options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		Box::pin(self.post_search(&query.text, options))
	}

	/// Sidecar scores are cosine similarities already on a unit scale.
	fn normalize_score(&self, raw: f32) -> f32 {
		score::clamp_unit(raw)
	}
}
