//! Token to account resolution and the role gate built on it.

use std::future::Future;

use tracing::{debug, error};

use super::errors::AuthError;
use super::types::{Identity, RequiredRole, Role};
use crate::db::Database;
use crate::jwt::JwtConfig;

/// Read-only account lookups needed to resolve a session.
pub trait AccountDirectory {
    type Error: std::fmt::Display;

    /// ID of the athlete currently holding `subject_token`.
    fn athlete_by_subject_token(
        &self,
        subject_token: &str,
    ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send;

    /// ID of the trainer currently holding `subject_token`.
    fn trainer_by_subject_token(
        &self,
        subject_token: &str,
    ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send;
}

impl AccountDirectory for Database {
    type Error = sqlx::Error;

    async fn athlete_by_subject_token(
        &self,
        subject_token: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let athlete = self.athletes().get_by_subject_token(subject_token).await?;
        Ok(athlete.map(|a| a.id))
    }

    async fn trainer_by_subject_token(
        &self,
        subject_token: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let trainer = self.trainers().get_by_subject_token(subject_token).await?;
        Ok(trainer.map(|t| t.id))
    }
}

/// Resolve a raw session token to the account it belongs to.
///
/// Token failures and missing accounts both surface as
/// [`AuthError::Unauthorized`]; the reason is only logged.
pub async fn resolve<D>(
    jwt: &JwtConfig,
    directory: &D,
    raw_token: &str,
) -> Result<Identity, AuthError>
where
    D: AccountDirectory + Sync,
{
    let subject = jwt.decode(raw_token).map_err(|e| {
        debug!(error = %e, "Rejected session token");
        AuthError::Unauthorized
    })?;

    let role = Role::from_normal_user_flag(subject.is_normal_user);
    let lookup = match role {
        Role::Athlete => directory
            .athlete_by_subject_token(&subject.subject_token)
            .await
            .map(|id| id.map(|id| Identity::Athlete { id })),
        Role::Trainer => directory
            .trainer_by_subject_token(&subject.subject_token)
            .await
            .map(|id| id.map(|id| Identity::Trainer { id })),
    };

    match lookup {
        Ok(Some(identity)) => Ok(identity),
        Ok(None) => {
            debug!(role = role.as_str(), "No account holds session subject");
            Err(AuthError::Unauthorized)
        }
        Err(e) => {
            error!(error = %e, "Failed to look up session account");
            Err(AuthError::Backend)
        }
    }
}

/// Resolve a session token and require the account to have the given role.
///
/// A role mismatch is reported exactly like an invalid token.
pub async fn authorize<D>(
    jwt: &JwtConfig,
    directory: &D,
    raw_token: &str,
    required: RequiredRole,
) -> Result<Identity, AuthError>
where
    D: AccountDirectory + Sync,
{
    let identity = resolve(jwt, directory, raw_token).await?;

    if !required.admits(identity.role()) {
        debug!(
            role = identity.role().as_str(),
            required = ?required,
            "Session role does not match endpoint"
        );
        return Err(AuthError::Unauthorized);
    }

    Ok(identity)
}
