use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::{
    auth::{
        claims::Claims,
        identity::{Identity, Principal},
        jwt::TokenService,
        services::UserDirectory,
    },
    error::AppError,
    state::AppState,
};

/// What the request carried in its `Authorization` header.
#[derive(Debug)]
pub enum Credential {
    Absent,
    Invalid,
    Valid(Claims),
}

/// Classifies the bearer credential. A non-bearer scheme counts as absent.
pub fn inspect(headers: &HeaderMap, tokens: &TokenService) -> Credential {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return Credential::Absent;
    };

    match tokens.verify(token.trim()) {
        Ok(claims) => Credential::Valid(claims),
        Err(_) => Credential::Invalid,
    }
}

/// Resolves the request identity. Invalid or expired tokens fall back to anonymous;
/// a valid token whose subject no longer exists is rejected.
pub async fn resolve(
    headers: &HeaderMap,
    tokens: &TokenService,
    users: &UserDirectory,
) -> Result<Identity, AppError> {
    match inspect(headers, tokens) {
        Credential::Absent => Ok(Identity::Anonymous),
        Credential::Invalid => {
            debug!("invalid or expired token, continuing as anonymous");
            Ok(Identity::Anonymous)
        }
        Credential::Valid(claims) => match users.find_by_username(&claims.sub).await? {
            Some(user) => Ok(Identity::User(Principal::from(&user))),
            None => {
                warn!(subject = %claims.sub, "token subject no longer exists");
                Err(AppError::AuthenticationRejected)
            }
        },
    }
}

/// Per-request identity extractor shared by public and protected routes.
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolve(&parts.headers, &state.tokens, &state.users).await?;
        Ok(CurrentIdentity(identity))
    }
}
