//! Admin authentication.
//!
//! Identities are issued by the external auth provider as HS256 JWTs. A valid
//! token only proves who the caller is; admin access additionally requires a
//! row in `admin_users` keyed by the token subject.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{AdminRole, AdminUser};
use crate::AppState;

/// Claims we read from provider tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

/// Verifies bearer tokens against the provider's shared secret.
pub struct JwtVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtVerifier {
    /// Without a secret every token is rejected.
    pub fn new(secret: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self {
            key: secret.map(|s| DecodingKey::from_secret(s.as_bytes())),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let Some(key) = &self.key else {
            return Err(AppError::Unauthorized(
                "Authentication is not configured".to_string(),
            ));
        };

        decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

/// Caller with a valid identity token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.jwt.verify(token)?;
        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// Authenticated caller present in the admin table.
#[derive(Debug, Clone)]
pub struct AdminCaller {
    pub admin: AdminUser,
}

impl AdminCaller {
    pub fn id(&self) -> &str {
        &self.admin.id
    }

    pub fn require_super_admin(&self) -> Result<(), AppError> {
        if self.admin.role == AdminRole::SuperAdmin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "This action requires a super admin".to_string(),
            ))
        }
    }
}

impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        match state.repo.get_admin(&user.id).await? {
            Some(admin) => Ok(AdminCaller { admin }),
            None => {
                tracing::info!(
                    "Non-admin user {} ({}) denied admin access",
                    user.id,
                    user.email.as_deref().unwrap_or("no email")
                );
                Err(AppError::Forbidden("Admin access required".to_string()))
            }
        }
    }
}
