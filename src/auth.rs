/// Authentication extractors
use crate::{
    account::{AccessClaims, UserRole},
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::SakanError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: AccessClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = SakanError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| SakanError::Authentication("Missing authorization header".to_string()))?;

        let claims = state.account_manager.validate_access_token(&token)?;

        Ok(AuthContext { claims })
    }
}

/// Admin authentication context - requires the Admin role
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub claims: AccessClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = SakanError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext { claims } = AuthContext::from_request_parts(parts, state).await?;

        if claims.role != UserRole::Admin {
            tracing::warn!(account_id = %claims.sub, "admin endpoint denied");
            return Err(SakanError::Authorization("Admin role required".to_string()));
        }

        Ok(AdminAuthContext { claims })
    }
}
