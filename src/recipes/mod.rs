use crate::state::AppState;
use axum::Router;

pub mod async_handlers;
pub mod dto;
pub mod handlers;
pub mod ownership;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

pub fn router() -> Router<AppState> {
    handlers::recipe_routes().merge(async_handlers::async_recipe_routes())
}
