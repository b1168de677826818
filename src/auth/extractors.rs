//! Axum extractors for authentication.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::bearer::bearer_token;
use super::errors::AuthError;
use super::state::HasAuthBackend;
use super::types::{Identity, RequiredRole};

/// Role requirement attached to an [`Auth`] extractor at the type level.
pub trait RoleConstraint {
    const REQUIRED: RequiredRole;
}

/// Only athletes may call the endpoint.
pub struct AthleteOnly;

/// Only trainers may call the endpoint.
pub struct TrainerOnly;

/// Any authenticated account may call the endpoint.
pub struct AnyRole;

impl RoleConstraint for AthleteOnly {
    const REQUIRED: RequiredRole = RequiredRole::Athlete;
}

impl RoleConstraint for TrainerOnly {
    const REQUIRED: RequiredRole = RequiredRole::Trainer;
}

impl RoleConstraint for AnyRole {
    const REQUIRED: RequiredRole = RequiredRole::Either;
}

/// Extractor for endpoints that require a session.
/// Reads the bearer token and runs it through the authorization gate.
/// A missing header is rejected like any other bad token.
///
/// ```ignore
/// async fn handler(Auth(identity, ..): Auth<TrainerOnly>) { /* ... */ }
/// ```
pub struct Auth<R: RoleConstraint = AnyRole>(pub Identity, pub PhantomData<R>);

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint + Send,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::Unauthorized)?;
        let identity = state.authorize(token, R::REQUIRED).await?;
        Ok(Auth(identity, PhantomData))
    }
}
