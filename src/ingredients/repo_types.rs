use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Shared ingredient row. `name` is the identity key, compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

/// One (recipe, ingredient) pair from the join table.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeIngredientRow {
    pub recipe_id: i64,
    pub id: i64,
    pub name: String,
}
