use std::{collections::HashSet, sync::Arc};

use tracing::debug;

use crate::{
    error::AppResult,
    ingredients::{
        repo::{IngredientRepo, IngredientWrites},
        repo_types::Ingredient,
    },
};

/// Dedup-or-create for ingredient names attached by a recipe write. Writes run inside
/// the caller's transaction; lookups outside one go through the repository.
#[derive(Clone)]
pub struct IngredientReconciler {
    repo: Arc<dyn IngredientRepo>,
}

impl IngredientReconciler {
    pub fn new(repo: Arc<dyn IngredientRepo>) -> Self {
        Self { repo }
    }

    /// Attaches `recipe_id` to one row per distinct name, creating missing rows.
    /// Names match exactly: "Flour" and "flour" are different ingredients.
    pub async fn reconcile(
        &self,
        tx: &mut dyn IngredientWrites,
        recipe_id: i64,
        names: &[String],
    ) -> AppResult<Vec<Ingredient>> {
        let mut seen = HashSet::new();
        let mut attached = Vec::with_capacity(names.len());
        for name in names.iter().filter(|n| seen.insert(n.as_str())) {
            let ingredient = match tx.find_by_name(name).await? {
                Some(existing) => existing,
                None => {
                    let created = tx.get_or_create(name).await?;
                    debug!(ingredient_id = created.id, name = %created.name, "ingredient created");
                    created
                }
            };
            tx.attach(recipe_id, ingredient.id).await?;
            attached.push(ingredient);
        }
        Ok(attached)
    }

    /// Swaps the recipe's whole ingredient set for `names`.
    pub async fn replace(
        &self,
        tx: &mut dyn IngredientWrites,
        recipe_id: i64,
        names: &[String],
    ) -> AppResult<Vec<Ingredient>> {
        tx.detach_recipe(recipe_id).await?;
        self.reconcile(tx, recipe_id, names).await
    }

    /// Drops every join pair for the recipe. Ingredient rows stay.
    pub async fn detach_recipe(&self, tx: &mut dyn IngredientWrites, recipe_id: i64) -> AppResult<()> {
        tx.detach_recipe(recipe_id).await?;
        Ok(())
    }

    pub async fn recipes_using(&self, ingredient_id: i64) -> AppResult<Vec<i64>> {
        Ok(self.repo.recipes_using(ingredient_id).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Ingredient>> {
        Ok(self.repo.find_by_name(name).await?)
    }
}
