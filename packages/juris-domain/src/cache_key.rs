//! Typed cache keys.
//!
//! A key is the blake3 digest of a JSON document holding the entry kind, a schema version and
//! the caller's identifier, so two kinds can never collide even when their identifiers match.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bumped whenever the shape of a cached payload changes.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
	Decomposition,
	Search,
}
impl CacheKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Decomposition => "decomposition",
			Self::Search => "search",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
	kind: CacheKind,
	digest: String,
}
impl CacheKey {
	pub fn new<T>(kind: CacheKind, identifier: &T) -> Result<Self>
	where
		T: Serialize + ?Sized,
	{
		let payload = serde_json::json!({
			"kind": kind.as_str(),
			"schema_version": CACHE_SCHEMA_VERSION,
			"identifier": identifier,
		});
		let raw = serde_json::to_vec(&payload)
			.map_err(|err| Error::CacheKey { message: err.to_string() })?;

		Ok(Self { kind, digest: blake3::hash(&raw).to_hex().to_string() })
	}

	pub fn kind(&self) -> CacheKind {
		self.kind
	}

	pub fn digest(&self) -> &str {
		&self.digest
	}

	/// Short digest prefix for log lines.
	pub fn prefix(&self) -> &str {
		let len = self.digest.len().min(12);

		&self.digest[..len]
	}
}
impl fmt::Display for CacheKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.kind.as_str(), self.digest)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_identifier_hashes_the_same() {
		let a = CacheKey::new(CacheKind::Search, &("labor code", 20)).expect("key");
		let b = CacheKey::new(CacheKind::Search, &("labor code", 20)).expect("key");

		assert_eq!(a, b);
		assert_eq!(a.digest().len(), 64);
		assert_eq!(a.prefix(), &a.digest()[..12]);
	}

	#[test]
	fn kinds_do_not_collide() {
		let a = CacheKey::new(CacheKind::Search, "labor code").expect("key");
		let b = CacheKey::new(CacheKind::Decomposition, "labor code").expect("key");

		assert_ne!(a.digest(), b.digest());
		assert!(a.to_string().starts_with("search:"));
		assert!(b.to_string().starts_with("decomposition:"));
	}

	#[test]
	fn identifiers_change_the_digest() {
		let a = CacheKey::new(CacheKind::Search, &("labor code", 20)).expect("key");
		let b = CacheKey::new(CacheKind::Search, &("labor code", 10)).expect("key");

		assert_ne!(a, b);
	}
}
