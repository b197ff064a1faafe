//! Accounts, password digests, sessions and role checks.
//! Keep the public surface thin and split implementation across sub-modules.

mod account;
mod session;
mod credentials;
pub mod digest;
pub mod ids;
pub mod authorizer;
pub mod strength;

pub use account::{Account, Role};
pub use session::{SessionSlot, SessionState};
pub use credentials::{CredentialMap, CredentialStore};
pub use digest::{Argon2Digest, PasswordDigest, Sha256Digest};
pub use ids::{CounterIds, IdAllocator, UuidIds};
pub use authorizer::{is_allowed, Action};
pub use strength::{assess as assess_password, Strength};

pub(crate) use account::now_rfc3339;
