//! Postgres-backed account repository.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` (field taken from the constraint name) |
//! | Anything else | N/A | `Unavailable` |

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use async_trait::async_trait;
use tracing::instrument;

use warden_auth::Role;
use warden_core::UserId;

use super::{Account, AccountRepository, NewAccount, RepositoryError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS person (
    id          BIGSERIAL PRIMARY KEY,
    username    VARCHAR(100) NOT NULL CONSTRAINT person_username_key UNIQUE,
    password    VARCHAR(100) NOT NULL,
    email       VARCHAR(50)  NOT NULL CONSTRAINT person_email_key UNIQUE,
    role        VARCHAR(100) NOT NULL,
    last_login  TIMESTAMPTZ
)
"#;

const COLUMNS: &str = "id, username, password, email, role, last_login";

/// Account repository over the `person` table.
#[derive(Debug, Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the `person` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = PgPool::connect(database_url).await.map_err(map_sqlx_error)?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM person WHERE {clause} = $1");
        sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .as_ref()
            .map(account_from_row)
            .transpose()
    }
}

fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let field = match db.constraint() {
                Some(c) if c.contains("email") => "email",
                _ => "username",
            };
            RepositoryError::Conflict { field }
        }
        _ => RepositoryError::Unavailable(err.to_string()),
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Unavailable(format!("decode person row: {e}"));

    let role: String = row.try_get("role").map_err(decode)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

    Ok(Account {
        id: UserId::new(row.try_get::<i64, _>("id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        password_hash: row.try_get("password").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        role,
        last_login: row.try_get::<Option<DateTime<Utc>>, _>("last_login").map_err(decode)?,
    })
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[instrument(skip(self), fields(id = %id))]
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM person WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .as_ref()
            .map(account_from_row)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        self.fetch_one_where("username", username).await
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        self.fetch_one_where("email", email).await
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM person ORDER BY id");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .iter()
            .map(account_from_row)
            .collect()
    }

    #[instrument(skip(self, account), fields(username = %account.username))]
    async fn insert(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let sql = format!(
            "INSERT INTO person (username, password, email, role) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(&account.email)
            .bind(account.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        account_from_row(&row)
    }

    #[instrument(skip(self, account), fields(id = %account.id))]
    async fn update(&self, account: &Account) -> Result<Account, RepositoryError> {
        let sql = format!(
            "UPDATE person SET username = $2, password = $3, email = $4, role = $5 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(account.id.value())
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(&account.email)
            .bind(account.role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepositoryError::Missing(account.id))?;
        account_from_row(&row)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM person WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE person SET last_login = $2 WHERE id = $1")
            .bind(id.value())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing(id));
        }
        Ok(())
    }
}
