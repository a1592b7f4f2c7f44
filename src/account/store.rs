/// Credential store: point lookups and writes for accounts and refresh
/// tokens, keyed by their unique fields.
use crate::{
    account::{Account, RefreshToken, UserRole},
    error::{SakanError, SakanResult},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// Persistence collaborator for the credential lifecycle
#[derive(Clone)]
pub struct CredentialStore {
    db: SqlitePool,
}

impl CredentialStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new account
    pub async fn insert_account(&self, account: &Account) -> SakanResult<()> {
        sqlx::query(
            "INSERT INTO account (id, email, full_name, phone_number, password_hash, national_id, role, is_verified, created_at, verified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.full_name)
        .bind(&account.phone_number)
        .bind(&account.password_hash)
        .bind(&account.national_id)
        .bind(account.role.as_str())
        .bind(account.is_verified)
        .bind(account.created_at)
        .bind(account.verified_at)
        .execute(&self.db)
        .await
        .map_err(SakanError::Database)?;

        Ok(())
    }

    /// Find an account by email
    pub async fn find_account_by_email(&self, email: &str) -> SakanResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, email, full_name, phone_number, password_hash, national_id, role, is_verified, created_at, verified_at
             FROM account WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(SakanError::Database)?;

        row.map(Self::account_from_row).transpose()
    }

    /// Find an account by national id
    pub async fn find_account_by_national_id(
        &self,
        national_id: &str,
    ) -> SakanResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, email, full_name, phone_number, password_hash, national_id, role, is_verified, created_at, verified_at
             FROM account WHERE national_id = ?1",
        )
        .bind(national_id)
        .fetch_optional(&self.db)
        .await
        .map_err(SakanError::Database)?;

        row.map(Self::account_from_row).transpose()
    }

    /// Find an account by id
    pub async fn find_account_by_id(&self, id: &str) -> SakanResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, email, full_name, phone_number, password_hash, national_id, role, is_verified, created_at, verified_at
             FROM account WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(SakanError::Database)?;

        row.map(Self::account_from_row).transpose()
    }

    /// Mark an account as verified
    ///
    /// Returns false if the account does not exist. Idempotent.
    pub async fn mark_account_verified(&self, id: &str, at: DateTime<Utc>) -> SakanResult<bool> {
        let result = sqlx::query(
            "UPDATE account SET is_verified = 1, verified_at = ?1 WHERE id = ?2",
        )
        .bind(at)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(SakanError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a refresh token record
    pub async fn insert_refresh_token(&self, token: &RefreshToken) -> SakanResult<()> {
        sqlx::query(
            "INSERT INTO refresh_token (id, account_id, token, expires_at, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&token.id)
        .bind(&token.account_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.is_active)
        .bind(token.created_at)
        .execute(&self.db)
        .await
        .map_err(SakanError::Database)?;

        Ok(())
    }

    /// Find a refresh token by its opaque value
    pub async fn find_refresh_token(&self, value: &str) -> SakanResult<Option<RefreshToken>> {
        let row = sqlx::query(
            "SELECT id, account_id, token, expires_at, is_active, created_at
             FROM refresh_token WHERE token = ?1",
        )
        .bind(value)
        .fetch_optional(&self.db)
        .await
        .map_err(SakanError::Database)?;

        Ok(row.map(|row| RefreshToken {
            id: row.get("id"),
            account_id: row.get("account_id"),
            token: row.get("token"),
            expires_at: row.get("expires_at"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }))
    }

    /// Find an active refresh token by its opaque value
    pub async fn find_active_refresh_token(
        &self,
        value: &str,
    ) -> SakanResult<Option<RefreshToken>> {
        Ok(self
            .find_refresh_token(value)
            .await?
            .filter(|token| token.is_active))
    }

    /// Deactivate a refresh token if it is still active
    ///
    /// Compare-and-swap on the active flag: the single-row UPDATE is atomic,
    /// so concurrent rotations of the same token succeed at most once.
    /// Returns true iff this call performed the deactivation.
    pub async fn deactivate_refresh_token(&self, id: &str) -> SakanResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_token SET is_active = 0 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(SakanError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Deactivate every active refresh token owned by an account
    ///
    /// Returns the number of tokens superseded.
    pub async fn deactivate_account_refresh_tokens(&self, account_id: &str) -> SakanResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_token SET is_active = 0 WHERE account_id = ?1 AND is_active = 1",
        )
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(SakanError::Database)?;

        Ok(result.rows_affected())
    }

    /// Count active refresh tokens for an account
    pub async fn count_active_refresh_tokens(&self, account_id: &str) -> SakanResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_token WHERE account_id = ?1 AND is_active = 1",
        )
        .bind(account_id)
        .fetch_one(&self.db)
        .await
        .map_err(SakanError::Database)?;

        Ok(count)
    }

    fn account_from_row(row: sqlx::sqlite::SqliteRow) -> SakanResult<Account> {
        let role_str: String = row.get("role");
        let role = UserRole::from_str(&role_str)
            .map_err(|e| SakanError::Internal(format!("Corrupt role column: {}", e)))?;

        Ok(Account {
            id: row.get("id"),
            email: row.get("email"),
            full_name: row.get("full_name"),
            phone_number: row.get("phone_number"),
            password_hash: row.get("password_hash"),
            national_id: row.get("national_id"),
            role,
            is_verified: row.get("is_verified"),
            created_at: row.get("created_at"),
            verified_at: row.get("verified_at"),
        })
    }
}
