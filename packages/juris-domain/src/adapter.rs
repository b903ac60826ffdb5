//! Retrieval contract shared by every corpus and the name-keyed registry that holds them.

use std::{
	collections::{BTreeMap, BTreeSet},
	future::Future,
	pin::Pin,
	sync::Arc,
};

use crate::{Error, Hit, Result, SubQuery};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
	/// A shared legal corpus.
	Corpus,
	/// Files uploaded by the requesting user; dispatched only on request.
	UserFiles,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterSearchOptions {
	pub category_filter: Option<String>,
	pub limit: u32,
}

pub trait SourceAdapter
where
	Self: Send + Sync,
{
	/// Fixed registry name, also the value callers put in a source filter.
	fn name(&self) -> &str;

	fn kind(&self) -> AdapterKind {
		AdapterKind::Corpus
	}

	fn search<'a>(
		&'a self,
		query: &'a SubQuery,
		options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>>;

	/// Maps a native score produced by this adapter onto `[0, 1]`.
	fn normalize_score(&self, raw: f32) -> f32;
}

#[derive(Clone, Default)]
pub struct AdapterRegistry {
	adapters: BTreeMap<String, Arc<dyn SourceAdapter>>,
}
impl AdapterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> Result<()> {
		let name = adapter.name().trim().to_string();

		if name.is_empty() {
			return Err(Error::EmptyAdapterName);
		}
		if self.adapters.contains_key(&name) {
			return Err(Error::DuplicateAdapter { name });
		}

		self.adapters.insert(name, adapter);

		Ok(())
	}

	pub fn with(mut self, adapter: Arc<dyn SourceAdapter>) -> Result<Self> {
		self.register(adapter)?;

		Ok(self)
	}

	pub fn get(&self, name: &str) -> Option<&Arc<dyn SourceAdapter>> {
		self.adapters.get(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.adapters.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}

	/// Resolves a source filter into adapters in name order.
	///
	/// An empty filter selects every registered adapter. Names that are not registered are
	/// rejected. User-file adapters are dropped unless `include_user_files` is set, even when
	/// named explicitly.
	pub fn select(
		&self,
		filter: &[String],
		include_user_files: bool,
	) -> Result<Vec<Arc<dyn SourceAdapter>>> {
		let allowed = |adapter: &Arc<dyn SourceAdapter>| {
			include_user_files || adapter.kind() != AdapterKind::UserFiles
		};

		if filter.iter().all(|name| name.trim().is_empty()) {
			return Ok(self.adapters.values().filter(|adapter| allowed(*adapter)).cloned().collect());
		}

		let mut wanted = BTreeSet::new();

		for name in filter {
			let name = name.trim();

			if name.is_empty() {
				continue;
			}
			if !self.adapters.contains_key(name) {
				return Err(Error::UnknownAdapter { name: name.to_string() });
			}

			wanted.insert(name);
		}

		Ok(wanted
			.into_iter()
			.filter_map(|name| self.adapters.get(name))
			.filter(|adapter| allowed(*adapter))
			.cloned()
			.collect())
	}
}
impl std::fmt::Debug for AdapterRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AdapterRegistry").field("adapters", &self.adapters.keys()).finish()
	}
}
