//! Concrete corpora behind the [`juris_domain::SourceAdapter`] contract.

pub mod legal_db;
pub mod text;
pub mod user_files;
pub mod vector;

pub use legal_db::LegalDatabaseAdapter;
pub use user_files::UserFilesAdapter;
pub use vector::VectorAdapter;

use std::{path::Path, sync::Arc};

use juris_domain::{AdapterRegistry, Result};

/// Registers every corpus the configuration enables.
pub fn build_registry(cfg: &juris_config::Corpus) -> Result<AdapterRegistry> {
	let mut registry = AdapterRegistry::new();

	if let Some(root) = cfg.legal_database_root.as_deref() {
		for adapter in LegalDatabaseAdapter::all(Path::new(root)) {
			registry.register(adapter)?;
		}
	}
	if let Some(root) = cfg.user_files_root.as_deref() {
		registry.register(Arc::new(UserFilesAdapter::new(root)))?;
	}
	if let Some(vector) = cfg.vector.as_ref() {
		registry.register(Arc::new(VectorAdapter::new(vector)?))?;
	}

	tracing::info!(adapters = ?registry.names().collect::<Vec<_>>(), "Source adapters registered.");

	Ok(registry)
}
