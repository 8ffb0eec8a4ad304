use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use thiserror::Error;

use crate::config::AppConfig;

/// Unique constraint that a write ran into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    RecipeName(String),
    Username,
    Email,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0:?}")]
    Conflict(Conflict),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row is invalid: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Postgres-backed store. Implements the user, recipe and ingredient repositories.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &AppConfig, database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;

        Ok(Self::new(pool))
    }

    pub(crate) async fn begin_tx(&self) -> StoreResult<PgTx> {
        Ok(PgTx { tx: self.pool.begin().await? })
    }
}

/// An open write transaction. Dropped without commit, it rolls back.
pub struct PgTx {
    pub(crate) tx: Transaction<'static, Postgres>,
}

impl PgTx {
    pub(crate) async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

const UNIQUE_VIOLATION: &str = "23505";

/// Maps a unique violation on a known constraint to a [`Conflict`]; everything else is
/// passed through as a database error.
pub(crate) fn classify(err: sqlx::Error, on_conflict: impl FnOnce(&str) -> Option<Conflict>) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            if let Some(conflict) = db.constraint().and_then(on_conflict) {
                return StoreError::Conflict(conflict);
            }
        }
    }
    StoreError::Database(err)
}

/// Escapes `%`, `_` and `\` so user input is matched literally inside `ILIKE`.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}
