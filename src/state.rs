use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::{
        jwt::{SystemClock, TokenService},
        password::Argon2Hasher,
        repo::UserRepo,
        services::UserDirectory,
    },
    config::AppConfig,
    db::PgStore,
    import::{RecipeImportClient, SpoonacularClient},
    ingredients::{repo::IngredientRepo, services::IngredientReconciler},
    memory::MemoryStore,
    recipes::{repo::RecipeRepo, services::RecipeCatalog},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub users: UserDirectory,
    pub catalog: RecipeCatalog,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let importer = match &config.import {
            Some(import) => {
                info!(base_url = %import.base_url, "recipe import enabled");
                Some(Arc::new(SpoonacularClient::new(import)?) as Arc<dyn RecipeImportClient>)
            }
            None => None,
        };

        match config.database_url.clone() {
            Some(url) => {
                let store = Arc::new(PgStore::connect(&config, &url).await?);
                Ok(Self::from_store(config, store, importer))
            }
            None => {
                warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
                Ok(Self::from_store(config, Arc::new(MemoryStore::new()), importer))
            }
        }
    }

    /// Wires every service over one store that implements all three repositories.
    pub fn from_store<S>(
        config: AppConfig,
        store: Arc<S>,
        importer: Option<Arc<dyn RecipeImportClient>>,
    ) -> Self
    where
        S: UserRepo + RecipeRepo + IngredientRepo + 'static,
    {
        let tokens = TokenService::new(&config.jwt, Arc::new(SystemClock));
        let users = UserDirectory::new(store.clone(), Arc::new(Argon2Hasher), importer.clone());
        let reconciler = IngredientReconciler::new(store.clone());
        let catalog = RecipeCatalog::new(store, reconciler, importer);
        Self {
            config: Arc::new(config),
            tokens,
            users,
            catalog,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_store(config, Arc::new(MemoryStore::new()), None)
    }
}
