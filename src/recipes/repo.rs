use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    db::{classify, Conflict, PgStore, PgTx, StoreResult},
    ingredients::{
        repo::{IngredientRepo, IngredientWrites},
        repo_types::Ingredient,
    },
    recipes::repo_types::{
        NewRecipe, Page, PageRequest, Recipe, RecipeChanges, RecipeFilter, RecipeRow, RecipeSource,
        Scope,
    },
};

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    async fn find_by_id(&self, id: i64, scope: Scope) -> StoreResult<Option<Recipe>>;
    /// One page of recipes in `scope`, ordered by id; the total respects the same scope.
    async fn list(&self, scope: Scope, page: PageRequest) -> StoreResult<Page<Recipe>>;
    async fn find(&self, filter: &RecipeFilter, scope: Scope) -> StoreResult<Vec<Recipe>>;
    /// Opens a write transaction. Nothing it wrote is kept unless it is committed.
    async fn begin(&self) -> StoreResult<Box<dyn RecipeTx>>;
}

/// Recipe and ingredient-link writes that commit or roll back together.
/// Recipes returned from here carry no ingredients.
#[async_trait]
pub trait RecipeTx: IngredientWrites {
    async fn insert(&mut self, recipe: NewRecipe) -> StoreResult<Recipe>;
    async fn update(&mut self, id: i64, changes: RecipeChanges) -> StoreResult<Option<Recipe>>;
    /// Returns whether a row was removed.
    async fn delete(&mut self, id: i64) -> StoreResult<bool>;
    fn ingredients(&mut self) -> &mut dyn IngredientWrites;
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

const RECIPE_COLUMNS: &str = "id, name, description, ingredients_text, instructions, \
     prep_time_minutes, servings, category, source, owner_id";

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: Scope) {
    if let Scope::VisibleTo(viewer) = scope {
        qb.push(" AND (source = ")
            .push_bind(RecipeSource::UserCreated.as_str())
            .push(" OR (source = ")
            .push_bind(RecipeSource::Imported.as_str())
            .push(" AND owner_id = ")
            .push_bind(viewer)
            .push("))");
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    match filter {
        RecipeFilter::NameContains(needle) => {
            qb.push(" AND name ILIKE ").push_bind(crate::db::like_pattern(needle));
        }
        RecipeFilter::IngredientsContain(needle) => {
            qb.push(" AND ingredients_text ILIKE ")
                .push_bind(crate::db::like_pattern(needle));
        }
        RecipeFilter::Category(category) => {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        RecipeFilter::PrepTimeBelow(max) => {
            qb.push(" AND prep_time_minutes < ").push_bind(*max);
        }
        RecipeFilter::PrepTimeBetween(min, max) => {
            qb.push(" AND prep_time_minutes BETWEEN ")
                .push_bind(*min)
                .push(" AND ")
                .push_bind(*max);
        }
        RecipeFilter::Servings(count) => {
            qb.push(" AND servings = ").push_bind(*count);
        }
    }
}

fn recipe_name_conflict(name: &str) -> impl FnOnce(&str) -> Option<Conflict> + '_ {
    move |constraint: &str| {
        (constraint == "recipes_name_lower_key").then(|| Conflict::RecipeName(name.to_string()))
    }
}

impl PgStore {
    /// Converts rows and fills each recipe's ingredient list from the join table.
    async fn hydrate(&self, rows: Vec<RecipeRow>) -> StoreResult<Vec<Recipe>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut by_recipe: HashMap<i64, Vec<Ingredient>> = HashMap::new();
        for link in self.ingredients_of(&ids).await? {
            by_recipe.entry(link.recipe_id).or_default().push(Ingredient {
                id: link.id,
                name: link.name,
            });
        }

        rows.into_iter()
            .map(|row| -> StoreResult<Recipe> {
                let mut recipe = Recipe::try_from(row)?;
                recipe.ingredients = by_recipe.remove(&recipe.id).unwrap_or_default();
                Ok(recipe)
            })
            .collect()
    }

    async fn hydrate_one(&self, row: Option<RecipeRow>) -> StoreResult<Option<Recipe>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RecipeRepo for PgStore {
    async fn find_by_id(&self, id: i64, scope: Scope) -> StoreResult<Option<Recipe>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = "
        ));
        qb.push_bind(id);
        push_scope(&mut qb, scope);
        let row = qb.build_query_as::<RecipeRow>().fetch_optional(&self.pool).await?;
        self.hydrate_one(row).await
    }

    async fn list(&self, scope: Scope, page: PageRequest) -> StoreResult<Page<Recipe>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes WHERE TRUE");
        push_scope(&mut count, scope);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE TRUE"
        ));
        push_scope(&mut qb, scope);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(i64::from(page.size))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<RecipeRow>().fetch_all(&self.pool).await?;

        Ok(Page::new(self.hydrate(rows).await?, page, total))
    }

    async fn find(&self, filter: &RecipeFilter, scope: Scope) -> StoreResult<Vec<Recipe>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE TRUE"
        ));
        push_filter(&mut qb, filter);
        push_scope(&mut qb, scope);
        qb.push(" ORDER BY id");
        let rows = qb.build_query_as::<RecipeRow>().fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn RecipeTx>> {
        Ok(Box::new(self.begin_tx().await?))
    }
}

#[async_trait]
impl RecipeTx for PgTx {
    async fn insert(&mut self, recipe: NewRecipe) -> StoreResult<Recipe> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            INSERT INTO recipes (name, description, ingredients_text, instructions,
                                 prep_time_minutes, servings, category, source, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(&recipe.ingredients_text)
        .bind(&recipe.instructions)
        .bind(recipe.prep_time_minutes)
        .bind(recipe.servings)
        .bind(recipe.category.map(|c| c.as_str()))
        .bind(recipe.source.as_str())
        .bind(recipe.owner_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| classify(e, recipe_name_conflict(&recipe.name)))?;

        Recipe::try_from(row)
    }

    async fn update(&mut self, id: i64, changes: RecipeChanges) -> StoreResult<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            UPDATE recipes
               SET name = $2, description = $3, instructions = $4,
                   prep_time_minutes = $5, servings = $6, category = $7
             WHERE id = $1
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.instructions)
        .bind(changes.prep_time_minutes)
        .bind(changes.servings)
        .bind(changes.category.map(|c| c.as_str()))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| classify(e, recipe_name_conflict(&changes.name)))?;

        row.map(Recipe::try_from).transpose()
    }

    async fn delete(&mut self, id: i64) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    fn ingredients(&mut self) -> &mut dyn IngredientWrites {
        self
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        PgTx::commit(*self).await
    }
}
