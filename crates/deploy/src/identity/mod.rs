//! Signing identities able to submit a contract creation.

mod local_key;
mod transaction;
mod unlocked;

pub use local_key::LocalKeyIdentity;
pub use transaction::{LegacyCreation, SignedTransaction};
pub use unlocked::UnlockedIdentity;
