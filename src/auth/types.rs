//! Authentication identity types.

use serde::Serialize;

/// Account role. Decides which repository family holds the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Athlete,
    Trainer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Athlete => "athlete",
            Role::Trainer => "trainer",
        }
    }

    /// Role encoded in a session token's `isNormalUser` flag.
    pub fn from_normal_user_flag(is_normal_user: bool) -> Self {
        if is_normal_user {
            Role::Athlete
        } else {
            Role::Trainer
        }
    }

    pub fn is_normal_user(&self) -> bool {
        matches!(self, Role::Athlete)
    }
}

/// A resolved account. Built per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Athlete { id: i64 },
    Trainer { id: i64 },
}

impl Identity {
    pub fn account_id(&self) -> i64 {
        match *self {
            Identity::Athlete { id } | Identity::Trainer { id } => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Athlete { .. } => Role::Athlete,
            Identity::Trainer { .. } => Role::Trainer,
        }
    }
}

/// Role demanded by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    Athlete,
    Trainer,
    Either,
}

impl RequiredRole {
    pub fn admits(&self, role: Role) -> bool {
        match self {
            RequiredRole::Athlete => role == Role::Athlete,
            RequiredRole::Trainer => role == Role::Trainer,
            RequiredRole::Either => true,
        }
    }
}
