use crate::config::config::{AppConfig, StorageBackend};
use crate::error::Result;
use crate::models::account::{Account, AccountRepository};
use crate::models::profile_repository::create_profile_repository;
use crate::security::auth::{CombinedVerifier, IdentityVerifier};
use crate::services::picture_ingestion::{IngestionPolicy, PictureIngestion};
use crate::services::profile::{ProfileService, create_profile_service};
use crate::storage::factory::StorageFactory;
use crate::storage::{LocalAssetStore, StorageGateway};
use std::sync::Arc;

/// Application state containing all shared services and security components
#[derive(Clone)]
pub struct AppState {
    /// Storage gateway, used by readiness checks
    pub gateway: Arc<dyn StorageGateway>,
    /// Profile service for profile business logic
    pub profile_service: Arc<dyn ProfileService>,
    /// Identity verifier for API key and JWT validation
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &"Arc<dyn StorageGateway>")
            .field("profile_service", &"Arc<dyn ProfileService>")
            .field("verifier", &self.verifier.verifier_type())
            .field("environment", &self.config.environment)
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        gateway: Arc<dyn StorageGateway>,
        profile_service: Arc<dyn ProfileService>,
        verifier: Arc<dyn IdentityVerifier>,
        config: AppConfig,
    ) -> Self {
        Self {
            gateway,
            profile_service,
            verifier,
            config: Arc::new(config),
        }
    }

    /// Wire storage, services and verifier from configuration
    ///
    /// With the in-memory backend every account referenced by a configured
    /// API key is seeded, since nothing else can create accounts there.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let gateway = StorageFactory::create(&config.database).await?;

        if config.database.backend == StorageBackend::Memory {
            let accounts = AccountRepository::new(gateway.clone());
            for account_id in config.security.api_keys.values() {
                accounts
                    .seed(&Account::new(account_id, account_id))
                    .await?;
            }
            tracing::info!(
                count = config.security.api_keys.len(),
                "Seeded accounts for configured API keys"
            );
        }

        let repository = create_profile_repository(gateway.clone()).await?;
        let assets = Arc::new(LocalAssetStore::new(&config.assets.root));
        let ingestion = PictureIngestion::new(
            repository.clone(),
            assets,
            IngestionPolicy::from_config(&config.assets),
        );
        let profile_service = create_profile_service(repository, ingestion);
        let verifier = Arc::new(CombinedVerifier::from_settings(&config.security));

        Ok(Self::new(gateway, profile_service, verifier, config))
    }
}
