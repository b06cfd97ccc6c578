//! In-memory stand-ins for the key stores the crypto core depends on.

mod keystore;
mod vault;

pub use crate::keystore::MemoryKeyStore;
pub use crate::vault::PlatformVault;
