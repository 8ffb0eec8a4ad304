use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    db::{Conflict, StoreError, StoreResult},
    ingredients::{
        repo::{IngredientRepo, IngredientWrites},
        repo_types::{Ingredient, RecipeIngredientRow},
    },
    recipes::{
        repo::{RecipeRepo, RecipeTx},
        repo_types::{
            NewRecipe, Page, PageRequest, Recipe, RecipeChanges, RecipeFilter, RecipeSource, Scope,
        },
    },
};

#[derive(Default, Clone)]
struct Tables {
    users: Vec<User>,
    recipes: BTreeMap<i64, Recipe>,
    ingredients: Vec<Ingredient>,
    /// (recipe_id, ingredient_id)
    links: BTreeSet<(i64, i64)>,
    next_user_id: i64,
    next_recipe_id: i64,
}

impl Tables {
    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        let lowered = name.to_lowercase();
        self.recipes
            .values()
            .any(|r| Some(r.id) != except && r.name.to_lowercase() == lowered)
    }

    fn hydrate(&self, recipe: &Recipe) -> Recipe {
        let mut out = recipe.clone();
        out.ingredients = self
            .links
            .range((recipe.id, i64::MIN)..=(recipe.id, i64::MAX))
            .filter_map(|(_, ingredient_id)| self.ingredient(*ingredient_id).cloned())
            .collect();
        out
    }

    fn ingredient(&self, id: i64) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.id == id)
    }
}

/// Process-local store used when no database is configured, and by tests.
/// Every operation runs under one lock, so check-then-insert sequences cannot interleave.
/// A write transaction holds that lock until it is committed or dropped.
#[derive(Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

/// Writes go straight to the locked tables; `rollback` holds the state from `begin`
/// and is put back on drop unless the transaction committed.
pub struct MemoryTx {
    tables: OwnedMutexGuard<Tables>,
    rollback: Option<Tables>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.rollback.take() {
            *self.tables = snapshot;
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn visible(recipe: &Recipe, scope: Scope) -> bool {
    match scope {
        Scope::Everything => true,
        Scope::VisibleTo(viewer) => match recipe.source {
            RecipeSource::UserCreated => true,
            RecipeSource::Imported => viewer == Some(recipe.owner_id),
        },
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(recipe: &Recipe, filter: &RecipeFilter) -> bool {
    match filter {
        RecipeFilter::NameContains(needle) => contains_ci(&recipe.name, needle),
        RecipeFilter::IngredientsContain(needle) => contains_ci(&recipe.ingredients_text, needle),
        RecipeFilter::Category(category) => recipe.category == Some(*category),
        RecipeFilter::PrepTimeBelow(max) => recipe.prep_time_minutes.is_some_and(|t| t < *max),
        RecipeFilter::PrepTimeBetween(min, max) => recipe
            .prep_time_minutes
            .is_some_and(|t| (*min..=*max).contains(&t)),
        RecipeFilter::Servings(count) => recipe.servings == Some(*count),
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().any(|u| u.email == email))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(Conflict::Username));
        }
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(Conflict::Email));
        }
        t.next_user_id += 1;
        let created = User {
            id: t.next_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            external_ref: None,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn set_external_ref(&self, id: i64, external_ref: &str) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            user.external_ref = Some(external_ref.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn find_by_id(&self, id: i64, scope: Scope) -> StoreResult<Option<Recipe>> {
        let t = self.tables.lock().await;
        Ok(t.recipes
            .get(&id)
            .filter(|r| visible(r, scope))
            .map(|r| t.hydrate(r)))
    }

    async fn list(&self, scope: Scope, page: PageRequest) -> StoreResult<Page<Recipe>> {
        let t = self.tables.lock().await;
        let visible_rows: Vec<&Recipe> = t.recipes.values().filter(|r| visible(r, scope)).collect();
        let total = visible_rows.len() as i64;
        let content = visible_rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .map(|r| t.hydrate(r))
            .collect();
        Ok(Page::new(content, page, total))
    }

    async fn find(&self, filter: &RecipeFilter, scope: Scope) -> StoreResult<Vec<Recipe>> {
        let t = self.tables.lock().await;
        Ok(t.recipes
            .values()
            .filter(|r| visible(r, scope) && matches(r, filter))
            .map(|r| t.hydrate(r))
            .collect())
    }

    async fn begin(&self) -> StoreResult<Box<dyn RecipeTx>> {
        let tables = self.tables.clone().lock_owned().await;
        let rollback = Some(tables.clone());
        Ok(Box::new(MemoryTx { tables, rollback }))
    }
}

#[async_trait]
impl IngredientRepo for MemoryStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Ingredient>> {
        let t = self.tables.lock().await;
        Ok(t.ingredients.iter().find(|i| i.name == name).cloned())
    }

    async fn recipes_using(&self, ingredient_id: i64) -> StoreResult<Vec<i64>> {
        let t = self.tables.lock().await;
        Ok(t.links
            .iter()
            .filter(|(_, i)| *i == ingredient_id)
            .map(|(r, _)| *r)
            .collect())
    }

    async fn ingredients_of(&self, recipe_ids: &[i64]) -> StoreResult<Vec<RecipeIngredientRow>> {
        let t = self.tables.lock().await;
        Ok(t.links
            .iter()
            .filter(|(r, _)| recipe_ids.contains(r))
            .filter_map(|(recipe_id, ingredient_id)| {
                t.ingredient(*ingredient_id).map(|i| RecipeIngredientRow {
                    recipe_id: *recipe_id,
                    id: i.id,
                    name: i.name.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl RecipeTx for MemoryTx {
    async fn insert(&mut self, recipe: NewRecipe) -> StoreResult<Recipe> {
        let t = &mut *self.tables;
        if t.name_taken(&recipe.name, None) {
            return Err(StoreError::Conflict(Conflict::RecipeName(recipe.name)));
        }
        t.next_recipe_id += 1;
        let stored = Recipe {
            id: t.next_recipe_id,
            name: recipe.name,
            description: recipe.description,
            ingredients_text: recipe.ingredients_text,
            instructions: recipe.instructions,
            prep_time_minutes: recipe.prep_time_minutes,
            servings: recipe.servings,
            category: recipe.category,
            source: recipe.source,
            owner_id: recipe.owner_id,
            ingredients: Vec::new(),
        };
        t.recipes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&mut self, id: i64, changes: RecipeChanges) -> StoreResult<Option<Recipe>> {
        let t = &mut *self.tables;
        if t.name_taken(&changes.name, Some(id)) {
            return Err(StoreError::Conflict(Conflict::RecipeName(changes.name)));
        }
        let Some(recipe) = t.recipes.get_mut(&id) else {
            return Ok(None);
        };
        recipe.name = changes.name;
        recipe.description = changes.description;
        recipe.instructions = changes.instructions;
        recipe.prep_time_minutes = changes.prep_time_minutes;
        recipe.servings = changes.servings;
        recipe.category = changes.category;
        Ok(Some(recipe.clone()))
    }

    async fn delete(&mut self, id: i64) -> StoreResult<bool> {
        let t = &mut *self.tables;
        let removed = t.recipes.remove(&id).is_some();
        // Same as the ON DELETE CASCADE on recipe_ingredients.
        t.links.retain(|(recipe_id, _)| *recipe_id != id);
        Ok(removed)
    }

    fn ingredients(&mut self) -> &mut dyn IngredientWrites {
        self
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.rollback = None;
        Ok(())
    }
}

#[async_trait]
impl IngredientWrites for MemoryTx {
    async fn find_by_name(&mut self, name: &str) -> StoreResult<Option<Ingredient>> {
        Ok(self.tables.ingredients.iter().find(|i| i.name == name).cloned())
    }

    async fn get_or_create(&mut self, name: &str) -> StoreResult<Ingredient> {
        let t = &mut *self.tables;
        if let Some(existing) = t.ingredients.iter().find(|i| i.name == name) {
            return Ok(existing.clone());
        }
        let created = Ingredient {
            id: t.ingredients.len() as i64 + 1,
            name: name.to_string(),
        };
        t.ingredients.push(created.clone());
        Ok(created)
    }

    async fn attach(&mut self, recipe_id: i64, ingredient_id: i64) -> StoreResult<()> {
        self.tables.links.insert((recipe_id, ingredient_id));
        Ok(())
    }

    async fn detach_recipe(&mut self, recipe_id: i64) -> StoreResult<()> {
        self.tables.links.retain(|(r, _)| *r != recipe_id);
        Ok(())
    }
}
