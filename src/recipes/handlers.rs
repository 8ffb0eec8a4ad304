use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentIdentity,
    error::{AppError, AppResult, FieldErrors},
    extract::{AppJson, AppPath, AppQuery},
    recipes::{
        dto::{
            Pagination, PrepTimeRange, QuickParams, RecipeRequest, RemoteRecipeSummary,
            RemoteSearchParams, SearchParams,
        },
        repo_types::{Category, Page, Recipe},
    },
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/search", get(search_recipes))
        .route("/recipes/category/:category", get(recipes_by_category))
        .route("/recipes/quick", get(quick_recipes))
        .route("/recipes/servings/:count", get(recipes_by_servings))
        .route("/recipes/prep-time", get(recipes_by_prep_time))
        .route("/recipes/import/search", get(search_remote))
        .route("/recipes/import/:external_id", post(import_recipe))
}

/// Path segments are matched case-insensitively; unknown names are a field error.
pub(crate) fn parse_category(raw: &str) -> AppResult<Category> {
    raw.parse::<Category>().map_err(|_| {
        let mut errors = FieldErrors::new();
        errors.push("category", format!("Unknown category: {raw}"));
        AppError::ValidationFailed(errors)
    })
}

#[instrument(skip(state, identity))]
pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(p): AppQuery<Pagination>,
) -> AppResult<Json<Page<Recipe>>> {
    Ok(Json(state.catalog.list(&identity, p.into()).await?))
}

#[instrument(skip(state, identity))]
pub async fn get_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Recipe>> {
    Ok(Json(state.catalog.get(&identity, id).await?))
}

#[instrument(skip(state, identity, payload), fields(name = %payload.name))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppJson(payload): AppJson<RecipeRequest>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let recipe = state.catalog.create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state, identity, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<RecipeRequest>,
) -> AppResult<Json<Recipe>> {
    Ok(Json(state.catalog.update(&identity, id, payload).await?))
}

#[instrument(skip(state, identity))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    state.catalog.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, identity))]
pub async fn search_recipes(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(q): AppQuery<SearchParams>,
) -> AppResult<Json<Vec<Recipe>>> {
    let found = state
        .catalog
        .search(&identity, q.name.as_deref(), q.ingredient.as_deref())
        .await?;
    Ok(Json(found))
}

#[instrument(skip(state, identity))]
pub async fn recipes_by_category(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(category): AppPath<String>,
) -> AppResult<Json<Vec<Recipe>>> {
    let category = parse_category(&category)?;
    Ok(Json(state.catalog.by_category(&identity, category).await?))
}

#[instrument(skip(state, identity))]
pub async fn quick_recipes(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(q): AppQuery<QuickParams>,
) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(state.catalog.quick(&identity, q.max).await?))
}

#[instrument(skip(state, identity))]
pub async fn recipes_by_servings(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(count): AppPath<i32>,
) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(state.catalog.by_servings(&identity, count).await?))
}

#[instrument(skip(state, identity))]
pub async fn recipes_by_prep_time(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(range): AppQuery<PrepTimeRange>,
) -> AppResult<Json<Vec<Recipe>>> {
    let found = state
        .catalog
        .by_prep_time_range(&identity, range.min, range.max)
        .await?;
    Ok(Json(found))
}

#[instrument(skip(state, identity))]
pub async fn search_remote(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(q): AppQuery<RemoteSearchParams>,
) -> AppResult<Json<Vec<RemoteRecipeSummary>>> {
    let hits = state
        .catalog
        .search_remote(&identity, &q.query, q.number)
        .await?;
    Ok(Json(hits))
}

#[instrument(skip(state, identity))]
pub async fn import_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(external_id): AppPath<i64>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let recipe = state.catalog.import(&identity, external_id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::identity::{Identity, Principal},
        config::AppConfig,
    };

    fn state() -> AppState {
        AppState::in_memory(AppConfig::local("dev-secret"))
    }

    fn alice() -> CurrentIdentity {
        CurrentIdentity(Identity::User(Principal { id: 1, username: "alice".into() }))
    }

    fn soup() -> RecipeRequest {
        RecipeRequest {
            name: "Soup".into(),
            ingredients_text: "water, salt".into(),
            instructions: "Boil".into(),
            ..Default::default()
        }
    }

    #[test]
    fn category_segment_is_case_insensitive() {
        assert_eq!(parse_category("dinner").unwrap(), Category::Dinner);
        let err = parse_category("brunch").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn create_returns_201_and_delete_204() {
        let state = state();
        let (status, Json(created)) = create_recipe(State(state.clone()), alice(), AppJson(soup()))
            .await
            .expect("create");
        assert_eq!(status, StatusCode::CREATED);

        let Json(fetched) = get_recipe(State(state.clone()), alice(), AppPath(created.id))
            .await
            .expect("get");
        assert_eq!(fetched.name, "Soup");

        let status = delete_recipe(State(state.clone()), alice(), AppPath(created.id))
            .await
            .expect("delete");
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn quick_without_max_uses_the_catalog_default() {
        let state = state();
        for (name, minutes) in [("Toast", 5), ("Stew", 30)] {
            let mut req = soup();
            req.name = name.into();
            req.prep_time_minutes = Some(minutes);
            create_recipe(State(state.clone()), alice(), AppJson(req)).await.expect("create");
        }

        let Json(quick) = quick_recipes(State(state.clone()), alice(), AppQuery(QuickParams { max: None }))
            .await
            .expect("quick");
        assert_eq!(quick.len(), 1);
        assert_eq!(quick[0].name, "Toast");

        let Json(quick) = quick_recipes(State(state), alice(), AppQuery(QuickParams { max: Some(31) }))
            .await
            .expect("quick");
        assert_eq!(quick.len(), 2);
    }

    #[tokio::test]
    async fn anonymous_listing_is_unauthenticated() {
        let err = list_recipes(
            State(state()),
            CurrentIdentity(Identity::Anonymous),
            AppQuery(Pagination { page: 0, size: 20 }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
