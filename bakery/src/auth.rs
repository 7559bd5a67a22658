//! Bearer-token authentication and role checks.
//!
//! [`authenticate`] resolves the token to a [`CurrentUser`] and stores it in the
//! request extensions. The role layers ([`require_staff_for_writes`],
//! [`require_admin`]) and handlers read it back from there.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Method, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::errors::{MSG_FORBIDDEN, MSG_UNAUTHORIZED};
use crate::{ApiError, state::AppState};

pub const ADMIN_PRINCIPAL_NAME: &str = "مدير النظام";

/// The authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// The principal behind `BAKERY_ADMIN_TOKEN`. It has no users row; its id is nil.
    #[must_use]
    pub fn built_in_admin() -> Self {
        Self {
            id: Uuid::nil(),
            name: ADMIN_PRINCIPAL_NAME.to_string(),
            role: UserRole::Admin,
        }
    }

    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// # Errors
    ///
    /// `Forbidden` unless the caller is an admin or a manager.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::forbidden(MSG_FORBIDDEN))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(MSG_UNAUTHORIZED))
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer token against the configured admin token and the active users.
///
/// # Errors
///
/// `Unauthorized` for a missing or unknown token, `Database` when the lookup fails.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or_else(|| ApiError::unauthorized(MSG_UNAUTHORIZED))?;

    let principal = if state.config.admin_token.as_deref() == Some(token) {
        CurrentUser::built_in_admin()
    } else {
        let user = user::Entity::find()
            .filter(user::Column::ApiToken.eq(token))
            .filter(user::Column::IsActive.eq(true))
            .one(&state.db)
            .await
            .map_err(ApiError::database)?
            .ok_or_else(|| {
                tracing::debug!(path = %req.uri().path(), "Rejected unknown bearer token");
                ApiError::unauthorized(MSG_UNAUTHORIZED)
            })?;
        CurrentUser {
            id: user.id,
            name: user.name,
            role: user.role,
        }
    };

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

fn principal(req: &Request<Body>) -> Result<&CurrentUser, ApiError> {
    req.extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized(MSG_UNAUTHORIZED))
}

/// Reads pass, everything else needs a staff role.
///
/// # Errors
///
/// `Forbidden` for a distributor attempting a write.
pub async fn require_staff_for_writes(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    if !matches!(*req.method(), Method::GET | Method::HEAD) {
        principal(&req)?.require_staff()?;
    }
    Ok(next.run(req).await)
}

/// # Errors
///
/// `Forbidden` for anyone but an admin.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    if !principal(&req)?.is_admin() {
        return Err(ApiError::forbidden(MSG_FORBIDDEN));
    }
    Ok(next.run(req).await)
}

/// # Errors
///
/// `Forbidden` for a distributor.
pub async fn require_staff(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    principal(&req)?.require_staff()?;
    Ok(next.run(req).await)
}
