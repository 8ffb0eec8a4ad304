use axum::{extract::State, routing::{get, post}, Json, Router};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        extractors::CurrentIdentity,
    },
    error::AppResult,
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/test", get(test_protected))
}

fn issue_for(state: &AppState, username: &str) -> AppResult<String> {
    state.tokens.issue(username).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        e.into()
    })
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state.users.register(payload).await?;
    let token = issue_for(&state, &user.username)?;
    Ok(Json(AuthResponse {
        username: user.username,
        message: "User registered successfully".into(),
        token,
    }))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state.users.login(&payload.username, &payload.password).await?;
    let token = issue_for(&state, &user.username)?;
    Ok(Json(AuthResponse {
        username: user.username,
        message: "Login successful".into(),
        token,
    }))
}

#[instrument(skip_all)]
pub async fn test_protected(CurrentIdentity(identity): CurrentIdentity) -> AppResult<String> {
    let principal = identity.require_authenticated()?;
    Ok(format!("If you see this, your JWT is valid, {}!", principal.username))
}
