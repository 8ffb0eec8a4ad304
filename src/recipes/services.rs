use std::{future::Future, sync::Arc};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    auth::identity::Identity,
    error::{AppError, AppResult},
    import::RecipeImportClient,
    ingredients::services::IngredientReconciler,
    recipes::{
        dto::{RecipeRequest, RemoteRecipeSummary},
        ownership::require_owner,
        repo::RecipeRepo,
        repo_types::{
            Category, NewRecipe, Page, PageRequest, Recipe, RecipeChanges, RecipeFilter,
            RecipeSource, Scope,
        },
        validation::{check_prep_time, validate_recipe},
    },
};

pub const DEFAULT_QUICK_MAX: i32 = 30;

/// Where a create stopped. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreateStage {
    Received,
    ValidatedPrepTime,
    CheckedDuplicate,
    OwnerAssigned,
}

#[derive(Clone)]
pub struct RecipeCatalog {
    recipes: Arc<dyn RecipeRepo>,
    ingredients: IngredientReconciler,
    importer: Option<Arc<dyn RecipeImportClient>>,
}

impl RecipeCatalog {
    pub fn new(
        recipes: Arc<dyn RecipeRepo>,
        ingredients: IngredientReconciler,
        importer: Option<Arc<dyn RecipeImportClient>>,
    ) -> Self {
        Self { recipes, ingredients, importer }
    }

    pub fn ingredients(&self) -> &IngredientReconciler {
        &self.ingredients
    }

    /// Runs `op` on its own tokio task. Errors come back unchanged.
    pub fn spawn<F, Fut, T>(&self, op: F) -> JoinHandle<AppResult<T>>
    where
        F: FnOnce(RecipeCatalog) -> Fut,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(op(self.clone()))
    }

    // reads

    pub async fn list(&self, identity: &Identity, page: PageRequest) -> AppResult<Page<Recipe>> {
        let viewer = identity.require_authenticated()?;
        let page = self.recipes.list(Scope::VisibleTo(Some(viewer.id)), page).await?;
        debug!(user_id = viewer.id, returned = page.content.len(), total = page.total_elements, "listed recipes");
        Ok(page)
    }

    pub async fn get(&self, identity: &Identity, id: i64) -> AppResult<Recipe> {
        self.recipes
            .find_by_id(id, visible_to(identity))
            .await?
            .ok_or(AppError::RecipeNotFound(id))
    }

    /// Name search wins when both terms are given. With neither, nothing matches.
    pub async fn search(
        &self,
        identity: &Identity,
        name: Option<&str>,
        ingredient: Option<&str>,
    ) -> AppResult<Vec<Recipe>> {
        let filter = match (non_blank(name), non_blank(ingredient)) {
            (Some(name), _) => RecipeFilter::NameContains(name.to_string()),
            (None, Some(ingredient)) => RecipeFilter::IngredientsContain(ingredient.to_string()),
            (None, None) => return Ok(Vec::new()),
        };
        self.filtered(identity, filter).await
    }

    pub async fn by_category(&self, identity: &Identity, category: Category) -> AppResult<Vec<Recipe>> {
        self.filtered(identity, RecipeFilter::Category(category)).await
    }

    /// Recipes with a prep time strictly below `max`.
    pub async fn quick(&self, identity: &Identity, max: Option<i32>) -> AppResult<Vec<Recipe>> {
        let max = max.unwrap_or(DEFAULT_QUICK_MAX);
        self.filtered(identity, RecipeFilter::PrepTimeBelow(max)).await
    }

    pub async fn by_servings(&self, identity: &Identity, count: i32) -> AppResult<Vec<Recipe>> {
        self.filtered(identity, RecipeFilter::Servings(count)).await
    }

    /// Inclusive on both ends.
    pub async fn by_prep_time_range(&self, identity: &Identity, min: i32, max: i32) -> AppResult<Vec<Recipe>> {
        self.filtered(identity, RecipeFilter::PrepTimeBetween(min, max)).await
    }

    async fn filtered(&self, identity: &Identity, filter: RecipeFilter) -> AppResult<Vec<Recipe>> {
        Ok(self.recipes.find(&filter, visible_to(identity)).await?)
    }

    // writes

    pub async fn create(&self, identity: &Identity, req: RecipeRequest) -> AppResult<Recipe> {
        self.create_from(identity, req, RecipeSource::UserCreated).await
    }

    async fn create_from(
        &self,
        identity: &Identity,
        req: RecipeRequest,
        source: RecipeSource,
    ) -> AppResult<Recipe> {
        let mut stage = CreateStage::Received;
        let result = self.run_create(identity, req, source, &mut stage).await;
        if let Err(e) = &result {
            warn!(after = ?stage, code = e.code(), "recipe create rejected");
        }
        result
    }

    async fn run_create(
        &self,
        identity: &Identity,
        req: RecipeRequest,
        source: RecipeSource,
        stage: &mut CreateStage,
    ) -> AppResult<Recipe> {
        validate_recipe(&req)?;
        check_prep_time(req.prep_time_minutes)?;
        *stage = CreateStage::ValidatedPrepTime;

        // Any existing name containing the new one counts, across all owners and sources.
        let clashing = self
            .recipes
            .find(&RecipeFilter::NameContains(req.name.clone()), Scope::Everything)
            .await?;
        if !clashing.is_empty() {
            return Err(AppError::DuplicateRecipe(req.name));
        }
        *stage = CreateStage::CheckedDuplicate;

        let owner = identity.require_authenticated()?;
        *stage = CreateStage::OwnerAssigned;

        let category = req.category();
        let mut tx = self.recipes.begin().await?;
        let mut recipe = tx
            .insert(NewRecipe {
                name: req.name,
                description: req.description,
                ingredients_text: req.ingredients_text,
                instructions: req.instructions,
                prep_time_minutes: req.prep_time_minutes,
                servings: req.servings,
                category,
                source,
                owner_id: owner.id,
            })
            .await?;
        recipe.ingredients = self
            .ingredients
            .reconcile(tx.ingredients(), recipe.id, &req.ingredients)
            .await?;
        tx.commit().await?;

        info!(recipe_id = recipe.id, user_id = owner.id, source = source.as_str(), "recipe created");
        Ok(recipe)
    }

    /// Overwrites the owner-editable columns and the ingredient set in one transaction.
    /// Prep time and the duplicate check are only enforced on create.
    pub async fn update(&self, identity: &Identity, id: i64, req: RecipeRequest) -> AppResult<Recipe> {
        validate_recipe(&req)?;

        let existing = self
            .recipes
            .find_by_id(id, Scope::Everything)
            .await?
            .ok_or(AppError::RecipeNotFound(id))?;
        require_owner(&existing, identity)?;

        let changes = RecipeChanges {
            category: req.category(),
            name: req.name,
            description: req.description,
            instructions: req.instructions,
            prep_time_minutes: req.prep_time_minutes,
            servings: req.servings,
        };
        let mut tx = self.recipes.begin().await?;
        let mut recipe = tx
            .update(id, changes)
            .await?
            .ok_or(AppError::RecipeNotFound(id))?;
        recipe.ingredients = self
            .ingredients
            .replace(tx.ingredients(), id, &req.ingredients)
            .await?;
        tx.commit().await?;

        info!(recipe_id = id, "recipe updated");
        Ok(recipe)
    }

    pub async fn delete(&self, identity: &Identity, id: i64) -> AppResult<()> {
        let existing = self
            .recipes
            .find_by_id(id, Scope::Everything)
            .await?
            .ok_or(AppError::RecipeNotFound(id))?;
        require_owner(&existing, identity)?;

        let mut tx = self.recipes.begin().await?;
        if !tx.delete(id).await? {
            return Err(AppError::RecipeNotFound(id));
        }
        self.ingredients.detach_recipe(tx.ingredients(), id).await?;
        tx.commit().await?;

        info!(recipe_id = id, "recipe deleted");
        Ok(())
    }

    // import

    /// Pulls an upstream recipe and stores it as an IMPORTED recipe owned by the caller.
    pub async fn import(&self, identity: &Identity, external_id: i64) -> AppResult<Recipe> {
        identity.require_authenticated()?;
        let importer = self.importer()?;

        let fetched = importer
            .fetch_recipe(external_id)
            .await
            .map_err(|e| AppError::Import(format!("{e:#}")))?;

        let req = RecipeRequest {
            name: fetched.title,
            description: None,
            ingredients_text: fetched.ingredients_text,
            instructions: fetched.instructions,
            prep_time_minutes: fetched.ready_in_minutes,
            servings: fetched.servings,
            category: None,
            ingredients: Vec::new(),
        };
        let recipe = self.create_from(identity, req, RecipeSource::Imported).await?;
        info!(recipe_id = recipe.id, external_id, "recipe imported");
        Ok(recipe)
    }

    pub async fn search_remote(
        &self,
        identity: &Identity,
        query: &str,
        number: u32,
    ) -> AppResult<Vec<RemoteRecipeSummary>> {
        identity.require_authenticated()?;
        self.importer()?
            .search(query, number)
            .await
            .map_err(|e| AppError::Import(format!("{e:#}")))
    }

    fn importer(&self) -> AppResult<&Arc<dyn RecipeImportClient>> {
        self.importer
            .as_ref()
            .ok_or_else(|| AppError::Import("no import client configured".into()))
    }
}

/// Awaits a task started with [`RecipeCatalog::spawn`].
pub async fn join<T>(handle: JoinHandle<AppResult<T>>) -> AppResult<T> {
    handle.await.map_err(|e| AppError::Internal(anyhow::Error::new(e)))?
}

fn visible_to(identity: &Identity) -> Scope {
    Scope::VisibleTo(identity.user_id())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
