/// Application context and dependency injection
use crate::{
    account::{AccountManager, CredentialStore},
    config::ServerConfig,
    db,
    error::SakanResult,
    rate_limit::RateGovernor,
    verification::VerificationGateway,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub rate_governor: Arc<RateGovernor>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> SakanResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.account_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);
        let store = CredentialStore::new(db.clone());
        let verification = VerificationGateway::new(&config.verification)?;
        let account_manager = Arc::new(AccountManager::new(
            store,
            verification,
            Arc::clone(&config),
        ));
        let rate_governor = Arc::new(RateGovernor::from_config(&config.rate_limit));

        Ok(Self {
            config,
            db,
            account_manager,
            rate_governor,
        })
    }
}
