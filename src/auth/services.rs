use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        password::PasswordHasher,
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult, FieldErrors, UserField},
    import::RecipeImportClient,
};

const MAX_USERNAME_LEN: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if req.username.trim().is_empty() {
        errors.push("username", "Username cannot be left empty");
    } else if req.username.chars().count() > MAX_USERNAME_LEN {
        errors.push("username", "Username must be at most 50 characters");
    }
    if !is_valid_email(&req.email) {
        errors.push("email", "Email must be a valid address");
    }
    if req.password.is_empty() {
        errors.push("password", "Password cannot be left empty");
    }
    errors.into_result()
}

/// Identity storage: registration, login and subject lookup.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn PasswordHasher>,
    importer: Option<Arc<dyn RecipeImportClient>>,
}

impl UserDirectory {
    pub fn new(
        users: Arc<dyn UserRepo>,
        hasher: Arc<dyn PasswordHasher>,
        importer: Option<Arc<dyn RecipeImportClient>>,
    ) -> Self {
        Self { users, hasher, importer }
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        validate_registration(&req)?;

        if self.users.exists_by_username(&req.username).await? {
            warn!(username = %req.username, "username already registered");
            return Err(AppError::DuplicateUser(UserField::Username));
        }
        if self.users.exists_by_email(&req.email).await? {
            warn!(username = %req.username, "email already registered");
            return Err(AppError::DuplicateUser(UserField::Email));
        }

        let password_hash = self.hasher.hash(&req.password)?;

        let mut user = self
            .users
            .create(NewUser {
                username: req.username,
                email: req.email,
                password_hash,
            })
            .await?;

        // Linked only after the local row exists. A failed connect leaves external_ref empty.
        if let Some(importer) = &self.importer {
            match importer.connect_user(&user.username, &user.email).await {
                Ok(hash) => {
                    self.users.set_external_ref(user.id, &hash).await?;
                    user.external_ref = Some(hash);
                }
                Err(e) => warn!(user_id = user.id, error = ?e, "upstream connect failed"),
            }
        }

        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        // TODO: unknown usernames return before any argon2 work, so response timing
        // still tells them apart from wrong passwords.
        let Some(user) = self.users.find_by_username(username).await? else {
            warn!(%username, "login unknown username");
            return Err(AppError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.users.find_by_username(username).await?)
    }
}
