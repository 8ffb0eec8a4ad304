use tracing::warn;

use crate::{
    auth::identity::Identity,
    error::{AppError, AppResult},
    recipes::repo_types::Recipe,
};

/// Only the recorded owner may change a recipe.
pub fn require_owner(recipe: &Recipe, identity: &Identity) -> AppResult<()> {
    let principal = identity.require_authenticated()?;
    if recipe.owner_id != principal.id {
        warn!(recipe_id = recipe.id, user_id = principal.id, "not the recipe owner");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::identity::Principal, recipes::repo_types::RecipeSource};

    fn recipe_owned_by(owner_id: i64) -> Recipe {
        Recipe {
            id: 1,
            name: "Stew".into(),
            description: None,
            ingredients_text: "beef".into(),
            instructions: "simmer".into(),
            prep_time_minutes: Some(30),
            servings: Some(4),
            category: None,
            source: RecipeSource::UserCreated,
            owner_id,
            ingredients: Vec::new(),
        }
    }

    fn user(id: i64) -> Identity {
        Identity::User(Principal { id, username: format!("user{id}") })
    }

    #[test]
    fn owner_passes() {
        assert!(require_owner(&recipe_owned_by(1), &user(1)).is_ok());
    }

    #[test]
    fn other_user_is_forbidden() {
        let err = require_owner(&recipe_owned_by(1), &user(2)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        let err = require_owner(&recipe_owned_by(1), &Identity::Anonymous).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
