//! `/async/recipes...`: the same catalog operations, each run on its own tokio task.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentIdentity,
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    recipes::{
        dto::{Pagination, PrepTimeRange, QuickParams, RecipeRequest, SearchParams},
        handlers::parse_category,
        repo_types::{Page, Recipe},
        services::join,
    },
    state::AppState,
};

pub fn async_recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/async/recipes", get(list_recipes).post(create_recipe))
        .route("/async/recipes/:id", get(get_recipe).put(update_recipe))
        .route("/async/recipes/search", get(search_recipes))
        .route("/async/recipes/category/:category", get(recipes_by_category))
        .route("/async/recipes/quick", get(quick_recipes))
        .route("/async/recipes/servings/:count", get(recipes_by_servings))
        .route("/async/recipes/prep-time", get(recipes_by_prep_time))
}

#[instrument(skip(state, identity))]
async fn list_recipes(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(p): AppQuery<Pagination>,
) -> AppResult<Json<Page<Recipe>>> {
    let page = p.into();
    let task = state
        .catalog
        .spawn(move |c| async move { c.list(&identity, page).await });
    Ok(Json(join(task).await?))
}

#[instrument(skip(state, identity))]
async fn get_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Recipe>> {
    let task = state
        .catalog
        .spawn(move |c| async move { c.get(&identity, id).await });
    Ok(Json(join(task).await?))
}

#[instrument(skip(state, identity, payload))]
async fn create_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppJson(payload): AppJson<RecipeRequest>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let task = state
        .catalog
        .spawn(move |c| async move { c.create(&identity, payload).await });
    Ok((StatusCode::CREATED, Json(join(task).await?)))
}

#[instrument(skip(state, identity, payload))]
async fn update_recipe(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<RecipeRequest>,
) -> AppResult<Json<Recipe>> {
    let task = state
        .catalog
        .spawn(move |c| async move { c.update(&identity, id, payload).await });
    Ok(Json(join(task).await?))
}

#[instrument(skip(state, identity))]
async fn search_recipes(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(q): AppQuery<SearchParams>,
) -> AppResult<Json<Vec<Recipe>>> {
    let task = state.catalog.spawn(move |c| async move {
        c.search(&identity, q.name.as_deref(), q.ingredient.as_deref())
            .await
    });
    Ok(Json(join(task).await?))
}

#[instrument(skip(state, identity))]
async fn recipes_by_category(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(category): AppPath<String>,
) -> AppResult<Json<Vec<Recipe>>> {
    let category = parse_category(&category)?;
    let task = state
        .catalog
        .spawn(move |c| async move { c.by_category(&identity, category).await });
    Ok(Json(join(task).await?))
}

#[instrument(skip(state, identity))]
async fn quick_recipes(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(q): AppQuery<QuickParams>,
) -> AppResult<Json<Vec<Recipe>>> {
    let task = state
        .catalog
        .spawn(move |c| async move { c.quick(&identity, q.max).await });
    Ok(Json(join(task).await?))
}

#[instrument(skip(state, identity))]
async fn recipes_by_servings(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppPath(count): AppPath<i32>,
) -> AppResult<Json<Vec<Recipe>>> {
    let task = state
        .catalog
        .spawn(move |c| async move { c.by_servings(&identity, count).await });
    Ok(Json(join(task).await?))
}

#[instrument(skip(state, identity))]
async fn recipes_by_prep_time(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    AppQuery(range): AppQuery<PrepTimeRange>,
) -> AppResult<Json<Vec<Recipe>>> {
    let task = state.catalog.spawn(move |c| async move {
        c.by_prep_time_range(&identity, range.min, range.max).await
    });
    Ok(Json(join(task).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::identity::{Identity, Principal},
        config::AppConfig,
        error::AppError,
    };

    fn bob() -> CurrentIdentity {
        CurrentIdentity(Identity::User(Principal { id: 2, username: "bob".into() }))
    }

    #[tokio::test]
    async fn async_routes_share_state_and_error_kinds() {
        let state = AppState::in_memory(AppConfig::local("dev-secret"));
        let req = RecipeRequest {
            name: "Curry".into(),
            ingredients_text: "rice, lentils".into(),
            instructions: "Simmer".into(),
            prep_time_minutes: Some(40),
            ..Default::default()
        };
        let (_, Json(created)) = create_recipe(State(state.clone()), bob(), AppJson(req.clone()))
            .await
            .expect("create");

        let Json(found) = crate::recipes::handlers::get_recipe(
            State(state.clone()),
            bob(),
            AppPath(created.id),
        )
        .await
        .expect("visible through the sync route");
        assert_eq!(found.name, "Curry");

        let err = create_recipe(State(state.clone()), bob(), AppJson(req))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateRecipe(_)));

        let err = get_recipe(State(state), CurrentIdentity(Identity::Anonymous), AppPath(999))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RecipeNotFound(999)));
    }
}
