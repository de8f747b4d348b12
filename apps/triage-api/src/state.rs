use std::sync::Arc;

use triage_service::TriageService;
use triage_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TriageService>,
}
impl AppState {
	pub async fn new(config: triage_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.storage.vector_dim).await?;

		Ok(Self::from_service(TriageService::new(config, db)))
	}

	pub fn from_service(service: TriageService) -> Self {
		Self { service: Arc::new(service) }
	}
}
