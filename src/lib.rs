//! # Wallet Crypto
//!
//! The cryptographic core of a DID and Verifiable Credential wallet.
//!
//! * [`subtle`] defines the algorithm provider contract and the [`ProviderRegistry`] that maps
//!   an algorithm name and key scope to a provider, letting software and platform-backed keys
//!   coexist.
//! * [`providers`] holds the concrete providers: SHA-2 digests and HMAC, ECDSA over secp256k1,
//!   AES-CBC-HMAC-SHA2, PBKDF2 and a provider backed by an OS key store.
//! * [`jose`] signs and verifies JWS tokens through the registry.
//! * [`sidetree`] builds Sidetree create operations and long-form DIDs.
//! * [`keys`] and [`operations`] address stored keys by deterministic reference.
//!
//! Every operation is synchronous and CPU bound. The registry is populated once and then shared
//! read-only.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use vercre_wallet_crypto::sidetree::SidetreeProcessor;
//! use vercre_wallet_crypto::ProviderRegistry;
//!
//! let registry = Arc::new(ProviderRegistry::with_defaults());
//! let payload = SidetreeProcessor::new(registry).generate_create_payload(&[])?;
//! assert!(payload.did.starts_with("did:ion:"));
//! # Ok::<(), vercre_wallet_crypto::Error>(())
//! ```

pub mod codec;
pub mod error;
pub mod jose;
pub mod keys;
pub mod operations;
pub mod providers;
pub mod sidetree;
pub mod subtle;

pub use crate::error::Error;
pub use crate::jose::{JwsToken, SigningAlgorithm};
pub use crate::operations::{CryptoOperations, KeyStore};
pub use crate::providers::{PlatformKeyKind, PlatformKeyStore, PlatformKeyStoreProvider};
pub use crate::sidetree::{LongFormDid, SidetreeProcessor};
pub use crate::subtle::{
    Algorithm, CryptoKey, CryptoKeyPair, Jwk, KeyUsage, Provider, ProviderRegistry, Registration,
    Scope,
};

/// Result type for the crypto core.
pub type Result<T, E = Error> = std::result::Result<T, E>;
