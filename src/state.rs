use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{OutPassService, SeaOrmOutPassService};

/// Core application state shared by the API layer and the CLI commands.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub outpass_service: Arc<dyn OutPassService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let config = Arc::new(RwLock::new(config));

        let outpass_service: Arc<dyn OutPassService> = Arc::new(SeaOrmOutPassService::new(
            store.clone(),
            Arc::clone(&config),
        ));

        Ok(Self {
            config,
            store,
            outpass_service,
        })
    }
}
