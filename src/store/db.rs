//! PostgreSQL-backed store for the OAuth credential record.
//!
//! One table, one row per configured record id:
//! - `google_tokens`: the access/refresh token pair plus expiry for a mailbox.

use sqlx::{PgPool, Row};
use tracing::warn;

use crate::error::RelayError;

/// Durable representation of the OAuth token triple.
///
/// `refresh_token` is the durable anchor: without it no access token can be
/// minted. `expires_at` is epoch milliseconds.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}

/// Token store backed by PostgreSQL, or a no-op when unconfigured.
pub struct TokenStore {
    pool: Option<PgPool>,
}

impl TokenStore {
    /// Build the store. A missing URL or failed connection is not fatal:
    /// the service keeps running with in-memory tokens only.
    pub async fn connect(database_url: Option<&str>) -> Self {
        let url = match database_url {
            Some(u) => u,
            None => {
                warn!("No DATABASE_URL configured; token store disabled (in-memory only)");
                return Self { pool: None };
            }
        };

        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
        {
            Ok(pool) => Self { pool: Some(pool) },
            Err(e) => {
                warn!("Failed to connect to PostgreSQL ({e}); token store disabled");
                Self { pool: None }
            }
        }
    }

    /// A store with no backing database. Used in tests and degraded mode.
    pub fn disconnected() -> Self {
        Self { pool: None }
    }

    /// Run schema migrations. No-op when disconnected.
    pub async fn migrate(&self) -> Result<(), RelayError> {
        let pool = match &self.pool {
            Some(p) => p,
            None => return Ok(()),
        };

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS google_tokens (
                id            TEXT PRIMARY KEY,
                access_token  TEXT,
                refresh_token TEXT,
                expires_at    BIGINT
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Fetch the credential record for `id`, if one exists.
    pub async fn get(&self, id: &str) -> Result<Option<CredentialRecord>, RelayError> {
        let pool = match &self.pool {
            Some(p) => p,
            None => return Ok(None),
        };

        let row = sqlx::query(
            "SELECT id, access_token, refresh_token, expires_at FROM google_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|row| CredentialRecord {
            id: row.get(0),
            access_token: row.try_get(1).ok(),
            refresh_token: row.try_get(2).ok(),
            expires_at: row.try_get(3).ok(),
        }))
    }

    /// Insert or update the credential record.
    pub async fn upsert(&self, record: &CredentialRecord) -> Result<(), RelayError> {
        let pool = match &self.pool {
            Some(p) => p,
            None => {
                warn!("Token store disconnected; skipping credential save");
                return Ok(());
            }
        };

        sqlx::query(
            r#"
            INSERT INTO google_tokens (id, access_token, refresh_token, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .bind(record.expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }
}
