use std::sync::Arc;

use engram_service::EngramService;
use engram_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<EngramService>,
	pub api_auth_token: Option<String>,
}
impl AppState {
	pub async fn new(config: engram_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.providers.embedding.dimensions).await?;

		let api_auth_token = config.security.api_auth_token.clone();
		let service = EngramService::new(config, db);

		Ok(Self { service: Arc::new(service), api_auth_token })
	}
}
