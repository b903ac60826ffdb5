//! Scripted source adapters. Every adapter normalizes with `raw / 10`, clamped by the caller.

use std::{
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};

use juris_domain::{AdapterKind, AdapterSearchOptions, BoxFuture, Error, Hit, Result, SourceAdapter, SubQuery};

pub fn hit(id: &str, title: &str, date: Option<&str>, score: f32) -> Hit {
	Hit {
		id: id.to_string(),
		title: title.to_string(),
		category: "laws".to_string(),
		subcategory: "republic_acts".to_string(),
		number: None,
		date: date.map(str::to_string),
		score,
		relevant_text: format!("{title} excerpt."),
		path: None,
	}
}

/// Returns the same hits for every query, truncated to the requested limit.
pub struct StaticAdapter {
	name: String,
	kind: AdapterKind,
	hits: Vec<Hit>,
	calls: AtomicUsize,
}
impl StaticAdapter {
	pub fn new(name: &str, hits: Vec<Hit>) -> Self {
		Self { name: name.to_string(), kind: AdapterKind::Corpus, hits, calls: AtomicUsize::new(0) }
	}

	pub fn user_files(name: &str, hits: Vec<Hit>) -> Self {
		Self { kind: AdapterKind::UserFiles, ..Self::new(name, hits) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl SourceAdapter for StaticAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	fn kind(&self) -> AdapterKind {
		self.kind
	}

	fn search<'a>(
		&'a self,
		_query: &'a SubQuery,
		options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let hits = self.hits.iter().take(options.limit as usize).cloned().collect();

		Box::pin(async move { Ok(hits) })
	}

	fn normalize_score(&self, raw: f32) -> f32 {
		raw / 10.0
	}
}

/// Returns one document per distinct query text, so every new sub-query adds a document.
pub struct EchoAdapter {
	name: String,
}
impl EchoAdapter {
	pub fn new(name: &str) -> Self {
		Self { name: name.to_string() }
	}
}
impl SourceAdapter for EchoAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	fn search<'a>(
		&'a self,
		query: &'a SubQuery,
		_options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		let id = format!("echo:{}", query.text.to_lowercase());

		Box::pin(async move { Ok(vec![hit(&id, &format!("Echo of {}", query.text), None, 5.0)]) })
	}

	fn normalize_score(&self, raw: f32) -> f32 {
		raw / 10.0
	}
}

/// Answers only queries starting with `prefix`, one document per query; everything else finds nothing.
pub struct PrefixAdapter {
	name: String,
	prefix: String,
	calls: AtomicUsize,
}
impl PrefixAdapter {
	pub fn new(name: &str, prefix: &str) -> Self {
		Self { name: name.to_string(), prefix: prefix.to_lowercase(), calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl SourceAdapter for PrefixAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	fn search<'a>(
		&'a self,
		query: &'a SubQuery,
		_options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let text = query.text.to_lowercase();
		let hits = if text.starts_with(&self.prefix) {
			vec![hit(&format!("prefix:{text}"), &format!("Match for {}", query.text), None, 6.0)]
		} else {
			Vec::new()
		};

		Box::pin(async move { Ok(hits) })
	}

	fn normalize_score(&self, raw: f32) -> f32 {
		raw / 10.0
	}
}

pub struct FailingAdapter {
	name: String,
	calls: AtomicUsize,
}
impl FailingAdapter {
	pub fn new(name: &str) -> Self {
		Self { name: name.to_string(), calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl SourceAdapter for FailingAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	fn search<'a>(
		&'a self,
		_query: &'a SubQuery,
		_options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Err(Error::adapter(&self.name, "scripted failure")) })
	}

	fn normalize_score(&self, raw: f32) -> f32 {
		raw / 10.0
	}
}

/// Sleeps before answering; pair with short timeouts to exercise deadlines.
pub struct SlowAdapter {
	name: String,
	delay: Duration,
	hits: Vec<Hit>,
}
impl SlowAdapter {
	pub fn new(name: &str, delay: Duration, hits: Vec<Hit>) -> Self {
		Self { name: name.to_string(), delay, hits }
	}
}
impl SourceAdapter for SlowAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	fn search<'a>(
		&'a self,
		_query: &'a SubQuery,
		_options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			Ok(self.hits.clone())
		})
	}

	fn normalize_score(&self, raw: f32) -> f32 {
		raw / 10.0
	}
}
