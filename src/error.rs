use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::error;

use crate::db::{Conflict, StoreError};

/// Which unique user field collided on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Username,
    Email,
}

impl std::fmt::Display for UserField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserField::Username => f.write_str("Username"),
            UserField::Email => f.write_str("Email"),
        }
    }
}

/// Field-level validation failures, collected before any store call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|(f, _)| *f == field)
    }

    /// Turns the collected failures into `Err(ValidationFailed)`, or `Ok` when there are none.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(self))
        }
    }

    fn to_map(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        for (field, message) in &self.0 {
            map.entry(*field).or_insert_with(|| message.clone());
        }
        map
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Recipe not found with Id: {0}")]
    RecipeNotFound(i64),

    #[error("Recipe with name {0} already exists")]
    DuplicateRecipe(String),

    #[error("Invalid prep time: {0} minutes")]
    InvalidPrepTime(i32),

    #[error("Request validation failed")]
    ValidationFailed(FieldErrors),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("You can only modify your own recipes")]
    Forbidden,

    #[error("{0} already exists")]
    DuplicateUser(UserField),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authenticated user no longer exists")]
    AuthenticationRejected,

    #[error("Recipe import failed: {0}")]
    Import(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::RecipeNotFound(_) => "RECIPE_NOT_FOUND",
            AppError::DuplicateRecipe(_) => "DUPLICATE_RECIPE",
            AppError::InvalidPrepTime(_) => "INVALID_PREP_TIME",
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::DuplicateUser(_) => "DUPLICATE_USER",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::AuthenticationRejected => "AUTHENTICATION_REJECTED",
            AppError::Import(_) => "IMPORT_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RecipeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateRecipe(_) | AppError::DuplicateUser(_) => StatusCode::CONFLICT,
            AppError::InvalidPrepTime(_) | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated
            | AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::AuthenticationRejected => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Import(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(Conflict::RecipeName(name)) => AppError::DuplicateRecipe(name),
            StoreError::Conflict(Conflict::Username) => AppError::DuplicateUser(UserField::Username),
            StoreError::Conflict(Conflict::Email) => AppError::DuplicateUser(UserField::Email),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: &'static str,
    error: String,
    status: u16,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_errors: Option<BTreeMap<&'static str, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            AppError::Import(e) => {
                error!(error = %e, "recipe import failed");
                "Recipe import failed".to_string()
            }
            other => other.to_string(),
        };
        let field_errors = match &self {
            AppError::ValidationFailed(fields) => Some(fields.to_map()),
            _ => None,
        };

        let body = ErrorBody {
            error_code: self.code(),
            error,
            status: status.as_u16(),
            timestamp: OffsetDateTime::now_utc(),
            field_errors,
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn not_found_maps_to_404_with_stable_code() {
        let (status, json) = body_json(AppError::RecipeNotFound(7)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["errorCode"], "RECIPE_NOT_FOUND");
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "Recipe not found with Id: 7");
        assert!(json["timestamp"].is_string());
        assert!(json.get("fieldErrors").is_none());
    }

    #[tokio::test]
    async fn validation_failure_lists_every_field() {
        let mut fields = FieldErrors::new();
        fields.push("name", "Recipe name cannot be left empty");
        fields.push("instructions", "Instructions cannot be left empty");
        let (status, json) = body_json(AppError::ValidationFailed(fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errorCode"], "VALIDATION_FAILED");
        assert_eq!(json["fieldErrors"]["name"], "Recipe name cannot be left empty");
        assert_eq!(json["fieldErrors"]["instructions"], "Instructions cannot be left empty");
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let (status, json) = body_json(AppError::Internal(anyhow::anyhow!("pool timed out"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["errorCode"], "INTERNAL_ERROR");
        assert_eq!(json["error"], "Internal server error");
    }

    #[test]
    fn store_conflicts_translate_to_domain_kinds() {
        let e: AppError = StoreError::Conflict(Conflict::RecipeName("Stew".into())).into();
        assert!(matches!(e, AppError::DuplicateRecipe(ref n) if n == "Stew"));
        let e: AppError = StoreError::Conflict(Conflict::Email).into();
        assert!(matches!(e, AppError::DuplicateUser(UserField::Email)));
        assert_eq!(e.to_string(), "Email already exists");
        let e: AppError = StoreError::Corrupt("unknown source".into()).into();
        assert_eq!(e.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(AppError::DuplicateRecipe("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidPrepTime(0).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::DuplicateUser(UserField::Username).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
        assert_eq!(AppError::InvalidToken.code(), "INVALID_TOKEN");
        assert_eq!(AppError::AuthenticationRejected.code(), "AUTHENTICATION_REJECTED");
    }
}
