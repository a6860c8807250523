use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    auth::{claims::UserRole, jwt::JwtKeys},
    error::AppError,
};

/// Identity resolved from the request's bearer token, threaded into handlers
/// instead of living on ambient request state.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// The single ownership predicate: admins may mutate anything, everyone
    /// else only their own rows.
    pub fn can_mutate(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn resolve<S>(parts: &Parts, state: &S) -> Result<AuthContext, AppError>
where
    JwtKeys: FromRef<S>,
{
    let keys = JwtKeys::from_ref(state);
    let token = bearer_token(parts)
        .ok_or_else(|| AppError::Unauthenticated("Access token required".into()))?;
    let claims = keys.verify(token)?;
    Ok(AuthContext {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Required authentication: missing or bad token rejects with 401.
pub struct AuthUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts, state).map(AuthUser)
    }
}

/// Optional authentication: never rejects, a missing or invalid token just
/// yields no identity.
pub struct OptionalAuthUser(pub Option<AuthContext>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(resolve(parts, state).ok()))
    }
}

/// Required authentication plus the admin role; non-admins get 403.
pub struct AdminUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = resolve(parts, state)?;
        if !ctx.is_admin() {
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            role,
        }
    }

    #[test]
    fn owner_can_mutate_own_rows() {
        let c = ctx(UserRole::User);
        assert!(c.can_mutate(c.id));
    }

    #[test]
    fn non_owner_cannot_mutate() {
        let c = ctx(UserRole::User);
        assert!(!c.can_mutate(Uuid::new_v4()));
    }

    #[test]
    fn admin_can_mutate_anything() {
        let c = ctx(UserRole::Admin);
        assert!(c.can_mutate(Uuid::new_v4()));
    }
}
