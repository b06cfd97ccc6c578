//! # Subtle Crypto
//!
//! The algorithm-provider layer: key and algorithm descriptors, the [`Provider`] contract every
//! cryptographic engine implements, and the [`ProviderRegistry`] that resolves an algorithm name
//! and scope to an engine. Software and hardware-backed providers sit behind the same contract.

mod algorithm;
mod jwk;
mod key;
mod provider;
mod registry;

pub use self::algorithm::*;
pub use self::jwk::*;
pub use self::key::*;
pub use self::provider::*;
pub use self::registry::*;
