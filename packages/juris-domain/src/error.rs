pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Adapter {adapter} failed: {message}")]
	Adapter { adapter: String, message: String },
	#[error("Adapter {name:?} is already registered.")]
	DuplicateAdapter { name: String },
	#[error("Adapter names must be non-empty.")]
	EmptyAdapterName,
	#[error("Unknown source {name:?}.")]
	UnknownAdapter { name: String },
	#[error("Invalid value: {message}")]
	InvalidValue { message: String },
	#[error("Failed to encode cache key: {message}")]
	CacheKey { message: String },
}
impl Error {
	pub fn adapter(adapter: &str, err: impl std::fmt::Display) -> Self {
		Self::Adapter { adapter: adapter.to_string(), message: err.to_string() }
	}
}
