/// /api/auth/* endpoints
use crate::{
    account::{AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, UserInfo},
    auth::{AdminAuthContext, AuthContext},
    context::AppContext,
    error::SakanResult,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

/// Boolean outcome body for revoke/verify
#[derive(Debug, Serialize)]
struct OutcomeResponse {
    success: bool,
    message: String,
}

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/revoke", post(revoke))
        .route("/api/auth/verify/:account_id", post(verify_account))
        .route("/api/auth/profile", get(profile))
}

/// Register endpoint
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> SakanResult<Json<AuthResponse>> {
    tracing::debug!(email = %req.email, role = req.role.as_str(), "register request");
    let response = ctx.account_manager.register(req).await?;
    Ok(Json(response))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> SakanResult<Json<AuthResponse>> {
    let response = ctx.account_manager.login(&req).await?;
    Ok(Json(response))
}

/// Refresh endpoint - exchanges a refresh token for a new pair
async fn refresh(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshTokenRequest>,
) -> SakanResult<Json<AuthResponse>> {
    let response = ctx.account_manager.refresh(&req.refresh_token).await?;
    Ok(Json(response))
}

/// Revoke endpoint - deactivates a refresh token
async fn revoke(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Json(req): Json<RefreshTokenRequest>,
) -> SakanResult<Json<OutcomeResponse>> {
    let revoked = ctx.account_manager.revoke(&req.refresh_token).await?;

    Ok(Json(OutcomeResponse {
        success: revoked,
        message: if revoked {
            "Token revoked".to_string()
        } else {
            "No active token matched".to_string()
        },
    }))
}

/// Admin verify endpoint - marks an account as verified
async fn verify_account(
    State(ctx): State<AppContext>,
    admin: AdminAuthContext,
    Path(account_id): Path<String>,
) -> SakanResult<Json<OutcomeResponse>> {
    let verified = ctx.account_manager.mark_verified(&account_id).await?;

    if verified {
        tracing::info!(account_id = %account_id, admin = %admin.claims.sub, "account verified by admin");
    }

    Ok(Json(OutcomeResponse {
        success: verified,
        message: if verified {
            "Account verified".to_string()
        } else {
            "Account not found".to_string()
        },
    }))
}

/// Profile endpoint - returns the claim set of the presented token
async fn profile(auth: AuthContext) -> Json<UserInfo> {
    let claims = auth.claims;
    Json(UserInfo {
        id: claims.sub,
        email: claims.email,
        full_name: claims.name,
        role: claims.role,
        is_verified: claims.is_verified,
    })
}
