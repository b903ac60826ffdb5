pub mod adapter;
pub mod cache_key;
pub mod score;

mod error;
mod types;

pub use adapter::{AdapterKind, AdapterRegistry, AdapterSearchOptions, BoxFuture, SourceAdapter};
pub use cache_key::{CacheKey, CacheKind};
pub use error::{Error, Result};
pub use types::{ChatMode, ChatRole, ChatTurn, DedupKey, Hit, RankedResult, SubQuery};
