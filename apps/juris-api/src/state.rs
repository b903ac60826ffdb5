use std::sync::Arc;

use juris_config::Config;
use juris_service::JurisService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<JurisService>,
}
impl AppState {
	/// Builds the adapter registry from the configured corpora and wires the HTTP completion
	/// provider.
	pub fn new(config: Config) -> color_eyre::Result<Self> {
		let registry = juris_adapters::build_registry(&config.corpus)?;
		let service = JurisService::new(config, registry);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: JurisService) -> Self {
		Self { service: Arc::new(service) }
	}
}
