use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, HydroponicsService, Mailer, SeaOrmAccountService, SeaOrmHydroponicsService,
    build_mailer,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub account_service: Arc<dyn AccountService>,

    pub hydroponics_service: Arc<dyn HydroponicsService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = build_mailer(&config.email)?;
        Self::with_mailer(config, mailer).await
    }

    /// Builds the state around a caller-supplied mailer.
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::from_parts(config, store, mailer))
    }

    #[must_use]
    pub fn from_parts(config: Config, store: Store, mailer: Arc<dyn Mailer>) -> Self {
        let account_service = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            config.clone(),
            mailer.clone(),
        )) as Arc<dyn AccountService>;

        let hydroponics_service = Arc::new(SeaOrmHydroponicsService::new(
            store.clone(),
            config.sensors.clone(),
        )) as Arc<dyn HydroponicsService>;

        info!(mailer = mailer.backend(), "Shared state initialized");

        Self {
            config: Arc::new(config),
            store,
            account_service,
            hydroponics_service,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
