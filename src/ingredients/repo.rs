use async_trait::async_trait;

use crate::db::{PgStore, PgTx, StoreResult};
use crate::ingredients::repo_types::{Ingredient, RecipeIngredientRow};

/// Read side of the ingredient table and its join set.
#[async_trait]
pub trait IngredientRepo: Send + Sync {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Ingredient>>;
    async fn recipes_using(&self, ingredient_id: i64) -> StoreResult<Vec<i64>>;
    async fn ingredients_of(&self, recipe_ids: &[i64]) -> StoreResult<Vec<RecipeIngredientRow>>;
}

/// Ingredient writes. Only reachable through an open write transaction.
#[async_trait]
pub trait IngredientWrites: Send {
    async fn find_by_name(&mut self, name: &str) -> StoreResult<Option<Ingredient>>;
    /// Inserts the name or returns the row that already holds it.
    async fn get_or_create(&mut self, name: &str) -> StoreResult<Ingredient>;
    /// Idempotent.
    async fn attach(&mut self, recipe_id: i64, ingredient_id: i64) -> StoreResult<()>;
    async fn detach_recipe(&mut self, recipe_id: i64) -> StoreResult<()>;
}

#[async_trait]
impl IngredientRepo for PgStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Ingredient>> {
        let row = sqlx::query_as::<_, Ingredient>("SELECT id, name FROM ingredients WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn recipes_using(&self, ingredient_id: i64) -> StoreResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT recipe_id FROM recipe_ingredients WHERE ingredient_id = $1 ORDER BY recipe_id",
        )
        .bind(ingredient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn ingredients_of(&self, recipe_ids: &[i64]) -> StoreResult<Vec<RecipeIngredientRow>> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, RecipeIngredientRow>(
            r#"
            SELECT ri.recipe_id, i.id, i.name
              FROM recipe_ingredients ri
              JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = ANY($1)
             ORDER BY ri.recipe_id, i.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl IngredientWrites for PgTx {
    async fn find_by_name(&mut self, name: &str) -> StoreResult<Option<Ingredient>> {
        let row = sqlx::query_as::<_, Ingredient>("SELECT id, name FROM ingredients WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn get_or_create(&mut self, name: &str) -> StoreResult<Ingredient> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn attach(&mut self, recipe_id: i64, ingredient_id: i64) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(recipe_id)
        .bind(ingredient_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn detach_recipe(&mut self, recipe_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}
