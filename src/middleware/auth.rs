use crate::{auth::verify_jwt, error::AppError, state::AppState};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The authenticated caller, inserted into request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: String,
    pub is_admin: bool,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = if let Some(auth_header) = auth_header {
        auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized("Invalid credentials".to_string()))?
    } else {
        // EventSource cannot set headers, so the stream accepts ?token=
        let query = req.uri().query().unwrap_or("");
        let token_param = query
            .split('&')
            .find_map(|p| p.strip_prefix("token="));

        token_param.ok_or(AppError::Unauthorized("Invalid credentials".to_string()))?
    };

    let claims = verify_jwt(token, &state.config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized("User not found".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        is_admin: user.is_admin(),
        role: user.role,
    });

    Ok(next.run(req).await)
}

// Extractor for getting the caller's id from request extensions
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .map(|user| AuthUser(user.id))
            .ok_or(AppError::Unauthorized("Invalid credentials".to_string()))
    }
}

/// Like `AuthUser`, but rejects callers without the `admin` or `super_admin` role.
pub struct AdminUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .ok_or(AppError::Unauthorized("Invalid credentials".to_string()))?;

        if !user.is_admin {
            tracing::warn!(user_id = %user.id, role = %user.role, "admin route refused");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user.id))
    }
}
