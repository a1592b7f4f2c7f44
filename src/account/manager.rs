/// Credential lifecycle: registration, login, refresh rotation, revocation
use crate::{
    account::{
        Account, AuthResponse, CredentialStore, LoginRequest, RefreshToken, RegisterRequest,
        UserInfo, UserRole,
    },
    config::ServerConfig,
    error::{SakanError, SakanResult},
    national_id,
    verification::VerificationGateway,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Claims carried by an access token
///
/// The token is stateless: validity is purely a function of the signature
/// and these claims, with zero clock-skew leeway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_verified: bool,
    pub national_id: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Account manager service
pub struct AccountManager {
    store: CredentialStore,
    verification: VerificationGateway,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(
        store: CredentialStore,
        verification: VerificationGateway,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            store,
            verification,
            config,
        }
    }

    /// Register a new account
    ///
    /// Non-Admin roles must pass national-id verification before the account
    /// is created. Admin accounts are verified automatically.
    pub async fn register(&self, request: RegisterRequest) -> SakanResult<AuthResponse> {
        request
            .validate()
            .map_err(|e| SakanError::Validation(e.to_string()))?;

        // Structural check applies to every role, including Admin accounts
        // that skip remote verification.
        if national_id::decode(&request.national_id).is_err() {
            return Err(SakanError::Validation(
                "Invalid national id".to_string(),
            ));
        }

        if self
            .store
            .find_account_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(SakanError::Conflict("Email already registered".to_string()));
        }

        if self
            .store
            .find_account_by_national_id(&request.national_id)
            .await?
            .is_some()
        {
            return Err(SakanError::Conflict(
                "National id already registered".to_string(),
            ));
        }

        if request.role != UserRole::Admin {
            let outcome = self
                .verification
                .verify(&request.national_id, &request.full_name)
                .await;

            if !outcome.is_valid {
                return Err(SakanError::Validation(format!(
                    "National id rejected: {}",
                    outcome.message
                )));
            }

            if !outcome.name_matches {
                return Err(SakanError::Validation(
                    "Full name does not match identity records".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let is_admin = request.role == UserRole::Admin;
        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: request.email,
            full_name: request.full_name,
            phone_number: request.phone_number,
            password_hash: Self::hash_password(&request.password)?,
            national_id: request.national_id,
            role: request.role,
            is_verified: is_admin, // Admin accounts skip external verification
            created_at: now,
            verified_at: if is_admin { Some(now) } else { None },
        };

        self.store.insert_account(&account).await?;
        tracing::info!(account_id = %account.id, role = account.role.as_str(), "account registered");

        // A failed token write leaves a tokenless account; the caller must
        // see the registration as failed, so the error propagates.
        self.issue_tokens(&account).await
    }

    /// Authenticate by email and password
    ///
    /// Invalidates every previously active refresh token for the account
    /// before issuing a fresh pair.
    pub async fn login(&self, request: &LoginRequest) -> SakanResult<AuthResponse> {
        let account = self
            .store
            .find_account_by_email(&request.email)
            .await?
            .ok_or_else(|| {
                SakanError::Authentication("Invalid email or password".to_string())
            })?;

        if !Self::verify_password(&request.password, &account.password_hash)? {
            return Err(SakanError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let superseded = self
            .store
            .deactivate_account_refresh_tokens(&account.id)
            .await?;
        if superseded > 0 {
            tracing::debug!(account_id = %account.id, superseded, "superseded refresh tokens on login");
        }

        self.issue_tokens(&account).await
    }

    /// Exchange a refresh token for a new credential pair
    ///
    /// Single-use rotation: the presented token is deactivated before the
    /// new pair is issued, and a reused token always fails.
    pub async fn refresh(&self, refresh_token: &str) -> SakanResult<AuthResponse> {
        let record = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| {
                SakanError::Authentication("Invalid or expired refresh token".to_string())
            })?;

        if !record.is_active || record.expires_at <= Utc::now() {
            return Err(SakanError::Authentication(
                "Invalid or expired refresh token".to_string(),
            ));
        }

        // CAS on the active flag; a concurrent rotation of the same value
        // wins here at most once.
        if !self.store.deactivate_refresh_token(&record.id).await? {
            return Err(SakanError::Authentication(
                "Invalid or expired refresh token".to_string(),
            ));
        }

        let account = self
            .store
            .find_account_by_id(&record.account_id)
            .await?
            .ok_or_else(|| {
                SakanError::Internal("Refresh token references missing account".to_string())
            })?;

        self.issue_tokens(&account).await
    }

    /// Deactivate a refresh token
    ///
    /// Returns false when no active record matches; idempotent no-op signal,
    /// not an error.
    pub async fn revoke(&self, refresh_token: &str) -> SakanResult<bool> {
        let record = match self.store.find_active_refresh_token(refresh_token).await? {
            Some(record) => record,
            None => return Ok(false),
        };

        self.store.deactivate_refresh_token(&record.id).await
    }

    /// Mark an account as verified
    ///
    /// Returns false if the account does not exist. Idempotent.
    pub async fn mark_verified(&self, account_id: &str) -> SakanResult<bool> {
        let updated = self
            .store
            .mark_account_verified(account_id, Utc::now())
            .await?;
        if updated {
            tracing::info!(account_id, "account marked verified");
        }
        Ok(updated)
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(&self, token: &str) -> SakanResult<AccessClaims> {
        let auth = &self.config.authentication;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0; // No clock-skew tolerance
        validation.set_issuer(&[&auth.jwt_issuer]);
        validation.set_audience(&[&auth.jwt_audience]);

        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                SakanError::Authentication("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                SakanError::Authentication("Invalid token signature".to_string())
            }
            _ => SakanError::Authentication(format!("Invalid token: {}", e)),
        })?;

        Ok(data.claims)
    }

    /// Issue an access/refresh pair for an account and persist the refresh
    /// token record
    async fn issue_tokens(&self, account: &Account) -> SakanResult<AuthResponse> {
        let access_token = self.generate_access_token(account)?;
        let refresh_value = Self::generate_refresh_token();

        let now = Utc::now();
        let record = RefreshToken {
            id: Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            token: refresh_value.clone(),
            expires_at: now + Duration::seconds(self.config.authentication.refresh_token_ttl),
            is_active: true,
            created_at: now,
        };

        self.store.insert_refresh_token(&record).await?;

        Ok(AuthResponse {
            access_token,
            refresh_token: refresh_value,
            user: UserInfo::from(account),
        })
    }

    /// Generate a signed access token
    fn generate_access_token(&self, account: &Account) -> SakanResult<String> {
        let auth = &self.config.authentication;
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            name: account.full_name.clone(),
            role: account.role,
            is_verified: account.is_verified,
            national_id: account.national_id.clone(),
            iat: now,
            exp: now + auth.access_token_ttl,
            iss: auth.jwt_issuer.clone(),
            aud: auth.jwt_audience.clone(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| SakanError::Jwt(format!("Failed to generate token: {}", e)))
    }

    /// Generate an opaque refresh token value: 32 random bytes, base64
    fn generate_refresh_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    /// Hash a password with argon2id
    fn hash_password(password: &str) -> SakanResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SakanError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored argon2id hash
    fn verify_password(password: &str, hash: &str) -> SakanResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| SakanError::Internal(format!("Corrupt password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
