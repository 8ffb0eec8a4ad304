use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    config::ImportConfig,
    import::dto::{
        ImportedRecipe, SpoonacularConnectResponse, SpoonacularRecipeDetail,
        SpoonacularSearchResponse,
    },
    recipes::dto::RemoteRecipeSummary,
};

/// Third-party recipe source.
#[async_trait]
pub trait RecipeImportClient: Send + Sync {
    async fn fetch_recipe(&self, external_id: i64) -> anyhow::Result<ImportedRecipe>;
    async fn search(&self, query: &str, number: u32) -> anyhow::Result<Vec<RemoteRecipeSummary>>;
    /// Registers the user upstream and returns its correlation hash.
    async fn connect_user(&self, username: &str, email: &str) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct SpoonacularClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SpoonacularClient {
    pub fn new(config: &ImportConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RecipeImportClient for SpoonacularClient {
    #[instrument(skip(self))]
    async fn fetch_recipe(&self, external_id: i64) -> anyhow::Result<ImportedRecipe> {
        let url = format!("{}/recipes/{}/information", self.base_url, external_id);
        let detail = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .context("spoonacular recipe information")?
            .error_for_status()?
            .json::<SpoonacularRecipeDetail>()
            .await
            .context("decode spoonacular recipe")?;
        debug!(external_id = detail.id, title = %detail.title, "fetched upstream recipe");
        Ok(detail.into())
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, number: u32) -> anyhow::Result<Vec<RemoteRecipeSummary>> {
        let url = format!("{}/recipes/complexSearch", self.base_url);
        let number = number.to_string();
        let res = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("query", query),
                ("number", number.as_str()),
            ])
            .send()
            .await
            .context("spoonacular search")?
            .error_for_status()?
            .json::<SpoonacularSearchResponse>()
            .await
            .context("decode spoonacular search")?;
        Ok(res.results)
    }

    #[instrument(skip(self, email))]
    async fn connect_user(&self, username: &str, email: &str) -> anyhow::Result<String> {
        let url = format!("{}/users/connect", self.base_url);
        let res = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&json!({
                "username": username,
                "email": email,
                "firstName": "User",
                "lastName": "User",
            }))
            .send()
            .await
            .context("spoonacular connect user")?
            .error_for_status()?
            .json::<SpoonacularConnectResponse>()
            .await
            .context("decode spoonacular connect")?;
        Ok(res.hash)
    }
}
