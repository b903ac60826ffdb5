//! Cache collaborator contract, the in-memory default, and the per-key generation guard.

use std::{
	collections::HashMap,
	future::Future,
	sync::{Arc, Mutex},
};

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use juris_domain::{BoxFuture, CacheKey};

use crate::Result;

pub trait Cache
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<Value>>>;

	fn set<'a>(&'a self, key: &'a CacheKey, value: Value, ttl: Duration)
	-> BoxFuture<'a, Result<()>>;
}

struct Entry {
	value: Value,
	expires_at: OffsetDateTime,
}

/// Process-local TTL cache. Expired entries are dropped on read.
#[derive(Default)]
pub struct MemoryCache {
	entries: Mutex<HashMap<String, Entry>>,
}
impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl Cache for MemoryCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<Value>>> {
		let now = OffsetDateTime::now_utc();
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
		let id = key.to_string();
		let value =
			entries.get(&id).filter(|entry| entry.expires_at > now).map(|entry| entry.value.clone());

		if value.is_none() {
			entries.remove(&id);
		}

		Box::pin(async move { Ok(value) })
	}

	fn set<'a>(
		&'a self,
		key: &'a CacheKey,
		value: Value,
		ttl: Duration,
	) -> BoxFuture<'a, Result<()>> {
		let expires_at = OffsetDateTime::now_utc() + ttl;

		self.entries
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(key.to_string(), Entry { value, expires_at });

		Box::pin(async { Ok(()) })
	}
}

/// Coalesces concurrent work on the same key: the first caller runs, later callers wait for it
/// and then run their own closure, which normally finds the freshly cached value.
#[derive(Default)]
pub struct SingleFlight {
	slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}
impl SingleFlight {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn run<T, F, Fut>(&self, key: &CacheKey, work: F) -> T
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = T>,
	{
		let id = key.to_string();
		let slot = {
			let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());

			slots.entry(id.clone()).or_default().clone()
		};
		let out = {
			let _guard = slot.lock().await;

			work().await
		};
		let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());

		// The map and this call hold the only references once no one else is queued.
		if Arc::strong_count(&slot) <= 2 {
			slots.remove(&id);
		}

		out
	}

	pub fn in_flight(&self) -> usize {
		self.slots.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}
