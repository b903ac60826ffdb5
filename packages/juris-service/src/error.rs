pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Adapter {adapter} failed: {message}")]
	Adapter { adapter: String, message: String },
	#[error("Decomposition failed: {message}")]
	Decomposition { message: String },
	#[error("Evaluation failed: {message}")]
	Evaluation { message: String },
	#[error("Synthesis failed: {message}")]
	Synthesis { message: String },
	#[error("Retrieval failed: {message}")]
	RetrievalFailed { message: String },
	#[error("Cache error: {message}")]
	Cache { message: String },
}
impl Error {
	/// Text safe to show to callers. Only request validation errors carry detail.
	pub fn public_message(&self) -> String {
		match self {
			Self::InvalidRequest { message } => message.clone(),
			Self::RetrievalFailed { .. } => {
				"No source could be searched right now. Please try again later.".to_string()
			},
			_ => "The search could not be completed. Please try again later.".to_string(),
		}
	}
}

impl From<juris_domain::Error> for Error {
	fn from(err: juris_domain::Error) -> Self {
		match err {
			juris_domain::Error::Adapter { adapter, message } => Self::Adapter { adapter, message },
			juris_domain::Error::UnknownAdapter { name } => {
				Self::InvalidRequest { message: format!("Unknown source {name:?} in source filter.") }
			},
			juris_domain::Error::InvalidValue { message } => Self::InvalidRequest { message },
			juris_domain::Error::CacheKey { message } => Self::Cache { message },
			other => Self::InvalidRequest { message: other.to_string() },
		}
	}
}
