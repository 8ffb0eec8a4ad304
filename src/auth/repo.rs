use async_trait::async_trait;

use crate::auth::repo_types::{NewUser, User};
use crate::db::{classify, Conflict, PgStore, StoreResult};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn exists_by_username(&self, username: &str) -> StoreResult<bool>;
    async fn exists_by_email(&self, email: &str) -> StoreResult<bool>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Inserts a user; a username or email collision surfaces as a [`Conflict`].
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    async fn set_external_ref(&self, id: i64, external_ref: &str) -> StoreResult<()>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, external_ref, created_at";

#[async_trait]
impl UserRepo for PgStore {
    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(e, |constraint| match constraint {
                "users_username_key" => Some(Conflict::Username),
                "users_email_key" => Some(Conflict::Email),
                _ => None,
            })
        })
    }

    async fn set_external_ref(&self, id: i64, external_ref: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET external_ref = $2 WHERE id = $1")
            .bind(id)
            .bind(external_ref)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
