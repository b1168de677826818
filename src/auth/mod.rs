//! Session authentication with a two-role gate.
//!
//! A session token resolves to exactly one athlete or trainer. Endpoints ask
//! for a role (`Athlete`, `Trainer` or either) and get back the account
//! identity, or a single undifferentiated "Unauthorized" rejection.

mod bearer;
mod errors;
mod extractors;
mod ip;
mod resolver;
mod state;
mod types;

pub use bearer::bearer_token;
pub use errors::{AuthError, UNAUTHORIZED_MESSAGE};
pub use extractors::{AnyRole, AthleteOnly, Auth, RoleConstraint, TrainerOnly};
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use resolver::{AccountDirectory, authorize, resolve};
pub use state::HasAuthBackend;
pub use types::{Identity, RequiredRole, Role};
