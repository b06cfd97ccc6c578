//! # Provider Registry
//!
//! Maps an algorithm name and a usage scope to the [`Provider`] that serves it, per operation
//! category. Every category holds a `"*"` entry seeded with the registry's default provider so
//! that a consumer can register only the algorithms it cares about and inherit the default for
//! everything else.
//!
//! Resolution for `get_*(name, scope)`:
//!
//! 1. the entry registered under `name` with exactly `scope`;
//! 2. the entry registered under `name` with [`Scope::All`];
//! 3. when `name` has no entry at all, the same two steps against the `"*"` list;
//! 4. the default provider.
//!
//! The registry is populated once, through `&mut self`, and then shared read-only behind an
//! `Arc`. Registration after it has been shared is not supported.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::error::Err;
use crate::providers::{AesCbcHmacProvider, AesStrength, Pbkdf2Provider, Secp256k1Provider};
use crate::providers::SoftwareProvider;
use crate::subtle::{names, Provider};
use crate::{tracerr, Result};

/// Name of the wildcard entry present in every category.
pub const WILDCARD: &str = "*";

/// The key class a registration serves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Any key class. Satisfies any specific scope request.
    #[default]
    All,
    /// Public key operations (verify, encrypt to a recipient).
    Public,
    /// Private key operations (sign, decrypt).
    Private,
}

/// Operation categories, in best-match search order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Asymmetric key encryption.
    KeyEncrypter,
    /// Asymmetric message signing.
    MessageSigner,
    /// Symmetric content encryption.
    SymmetricEncrypter,
    /// Digests.
    Digest,
    /// Shared-key (key agreement) encryption.
    SharedKeyEncrypter,
    /// MAC signing.
    MacSigner,
}

impl Category {
    /// All categories in the order `get_best_match` searches them.
    pub const SEARCH_ORDER: [Self; 6] = [
        Self::KeyEncrypter,
        Self::MessageSigner,
        Self::SymmetricEncrypter,
        Self::Digest,
        Self::SharedKeyEncrypter,
        Self::MacSigner,
    ];
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::KeyEncrypter => "key encrypter",
            Self::MessageSigner => "message signer",
            Self::SymmetricEncrypter => "symmetric encrypter",
            Self::Digest => "digest",
            Self::SharedKeyEncrypter => "shared key encrypter",
            Self::MacSigner => "MAC signer",
        };
        write!(f, "{s}")
    }
}

/// A provider registered for a scope.
#[derive(Clone)]
pub struct Registration {
    /// The provider.
    pub provider: Arc<dyn Provider>,

    /// Key class the provider serves under this registration.
    pub scope: Scope,
}

impl Registration {
    /// Register `provider` for `scope`.
    pub fn new(provider: Arc<dyn Provider>, scope: Scope) -> Self {
        Self { provider, scope }
    }

    /// Register `provider` for every scope.
    pub fn all(provider: Arc<dyn Provider>) -> Self {
        Self::new(provider, Scope::All)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("provider", &self.provider.name())
            .field("scope", &self.scope)
            .finish()
    }
}

type Entries = HashMap<String, Vec<Registration>>;

/// Algorithm provider registry.
pub struct ProviderRegistry {
    default: Arc<dyn Provider>,
    categories: HashMap<Category, Entries>,
}

impl ProviderRegistry {
    /// Create a registry whose every category falls back to `default`.
    pub fn new(default: Arc<dyn Provider>) -> Self {
        let categories = Category::SEARCH_ORDER
            .iter()
            .map(|category| {
                let mut entries = Entries::new();
                entries
                    .insert(WILDCARD.to_string(), vec![Registration::all(Arc::clone(&default))]);
                (*category, entries)
            })
            .collect();
        Self { default, categories }
    }

    /// The standard composition: SHA digests and HMAC as the default provider, ECDSA over
    /// secp256k1, the three AES-CBC-HMAC strengths and PBKDF2.
    #[must_use]
    pub fn with_defaults() -> Self {
        let software: Arc<dyn Provider> = Arc::new(SoftwareProvider);
        let mut registry = Self::new(Arc::clone(&software));

        for name in [names::SHA_256, names::SHA_384, names::SHA_512] {
            registry.add_digest(name, Registration::all(Arc::clone(&software)));
        }
        registry.add_mac_signer(names::HMAC, Registration::all(Arc::clone(&software)));

        // ECDSA prehashes with whatever the registry resolves for SHA-256
        let digest = registry
            .get_digest(names::SHA_256, Scope::All)
            .unwrap_or_else(|_| Arc::clone(&software));
        let secp256k1: Arc<dyn Provider> = Arc::new(Secp256k1Provider::new(digest));
        registry.add_message_signer(names::ECDSA, Registration::all(secp256k1));

        for strength in [AesStrength::A128, AesStrength::A192, AesStrength::A256] {
            let provider: Arc<dyn Provider> = Arc::new(AesCbcHmacProvider::new(strength));
            registry.add_symmetric_encrypter(strength.name(), Registration::all(provider));
        }

        let pbkdf2: Arc<dyn Provider> = Arc::new(Pbkdf2Provider);
        registry.add_shared_key_encrypter(names::PBKDF2, Registration::all(pbkdf2));

        registry
    }

    /// The default provider supplied at construction.
    #[must_use]
    pub fn default_provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.default)
    }

    /// Append a registration to `name` within `category`.
    pub fn add(&mut self, category: Category, name: impl Into<String>, registration: Registration) {
        let entries = self.categories.entry(category).or_default();
        entries.entry(name.into()).or_default().push(registration);
    }

    /// Register a key encrypter.
    pub fn add_key_encrypter(&mut self, name: impl Into<String>, registration: Registration) {
        self.add(Category::KeyEncrypter, name, registration);
    }

    /// Register a shared-key encrypter.
    pub fn add_shared_key_encrypter(
        &mut self, name: impl Into<String>, registration: Registration,
    ) {
        self.add(Category::SharedKeyEncrypter, name, registration);
    }

    /// Register a symmetric encrypter.
    pub fn add_symmetric_encrypter(&mut self, name: impl Into<String>, registration: Registration) {
        self.add(Category::SymmetricEncrypter, name, registration);
    }

    /// Register a message signer.
    pub fn add_message_signer(&mut self, name: impl Into<String>, registration: Registration) {
        self.add(Category::MessageSigner, name, registration);
    }

    /// Register a MAC signer.
    pub fn add_mac_signer(&mut self, name: impl Into<String>, registration: Registration) {
        self.add(Category::MacSigner, name, registration);
    }

    /// Register a digest.
    pub fn add_digest(&mut self, name: impl Into<String>, registration: Registration) {
        self.add(Category::Digest, name, registration);
    }

    /// Resolve the provider for `name` and `scope` within `category`.
    ///
    /// # Errors
    ///
    /// * `NoProvider` - Nothing resolved. Unreachable while the wildcard entry is seeded.
    pub fn get(&self, category: Category, name: &str, scope: Scope) -> Result<Arc<dyn Provider>> {
        let Some(entries) = self.categories.get(&category) else {
            tracerr!(Err::NoProvider, "no {} category", category);
        };

        // the wildcard only stands in for names with no registration at all
        let (list, label) = match entries.get(name) {
            Some(list) => (Some(list), "entry"),
            None => (entries.get(WILDCARD), "wildcard"),
        };
        if let Some(provider) = list.and_then(|list| select(list, scope)) {
            tracing::debug!("{category} '{name}' resolved to {label} '{}'", provider.name());
            return Ok(provider);
        }

        tracing::debug!("{category} '{name}' resolved to default provider");
        Ok(self.default_provider())
    }

    /// Resolve a key encrypter.
    ///
    /// # Errors
    ///
    /// * `NoProvider` - Nothing resolved.
    pub fn get_key_encrypter(&self, name: &str, scope: Scope) -> Result<Arc<dyn Provider>> {
        self.get(Category::KeyEncrypter, name, scope)
    }

    /// Resolve a shared-key encrypter.
    ///
    /// # Errors
    ///
    /// * `NoProvider` - Nothing resolved.
    pub fn get_shared_key_encrypter(&self, name: &str, scope: Scope) -> Result<Arc<dyn Provider>> {
        self.get(Category::SharedKeyEncrypter, name, scope)
    }

    /// Resolve a symmetric encrypter.
    ///
    /// # Errors
    ///
    /// * `NoProvider` - Nothing resolved.
    pub fn get_symmetric_encrypter(&self, name: &str, scope: Scope) -> Result<Arc<dyn Provider>> {
        self.get(Category::SymmetricEncrypter, name, scope)
    }

    /// Resolve a message signer.
    ///
    /// # Errors
    ///
    /// * `NoProvider` - Nothing resolved.
    pub fn get_message_signer(&self, name: &str, scope: Scope) -> Result<Arc<dyn Provider>> {
        self.get(Category::MessageSigner, name, scope)
    }

    /// Resolve a MAC signer.
    ///
    /// # Errors
    ///
    /// * `NoProvider` - Nothing resolved.
    pub fn get_mac_signer(&self, name: &str, scope: Scope) -> Result<Arc<dyn Provider>> {
        self.get(Category::MacSigner, name, scope)
    }

    /// Resolve a digest.
    ///
    /// # Errors
    ///
    /// * `NoProvider` - Nothing resolved.
    pub fn get_digest(&self, name: &str, scope: Scope) -> Result<Arc<dyn Provider>> {
        self.get(Category::Digest, name, scope)
    }

    /// Search every category's named entries for `name` and `scope`, returning the first hit or
    /// the default provider. Wildcard entries are not consulted.
    #[must_use]
    pub fn get_best_match(&self, name: &str, scope: Scope) -> Arc<dyn Provider> {
        for category in Category::SEARCH_ORDER {
            let hit = self
                .categories
                .get(&category)
                .and_then(|entries| entries.get(name))
                .and_then(|list| select(list, scope));
            if let Some(provider) = hit {
                tracing::debug!("best match for '{name}' is {category} '{}'", provider.name());
                return provider;
            }
        }
        tracing::debug!("no best match for '{name}', using default provider");
        self.default_provider()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// Exact scope first, then an `All` registration.
fn select(list: &[Registration], scope: Scope) -> Option<Arc<dyn Provider>> {
    list.iter()
        .find(|r| r.scope == scope)
        .or_else(|| list.iter().find(|r| r.scope == Scope::All))
        .map(|r| Arc::clone(&r.provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Provider for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn named(name: &'static str) -> Arc<dyn Provider> {
        Arc::new(Named(name))
    }

    #[test]
    fn exact_scope_hit() {
        let mut registry = ProviderRegistry::new(named("default"));
        registry.add_message_signer("X", Registration::all(named("x-all")));
        registry.add_message_signer("X", Registration::new(named("x-private"), Scope::Private));

        let provider = registry.get_message_signer("X", Scope::Private).expect("should resolve");
        assert_eq!(provider.name(), "x-private");
    }

    #[test]
    fn all_scope_fallback() {
        let mut registry = ProviderRegistry::new(named("default"));
        registry.add_message_signer("X", Registration::all(named("x-all")));

        let provider = registry.get_message_signer("X", Scope::Public).expect("should resolve");
        assert_eq!(provider.name(), "x-all");
    }

    #[test]
    fn wildcard_fallback() {
        let mut registry = ProviderRegistry::new(named("default"));
        registry.add_digest(WILDCARD, Registration::new(named("star-public"), Scope::Public));

        // the public wildcard registration is appended after the seeded default
        let provider = registry.get_digest("absent", Scope::Public).expect("should resolve");
        assert_eq!(provider.name(), "star-public");

        let provider = registry.get_digest("absent", Scope::Private).expect("should resolve");
        assert_eq!(provider.name(), "default");
    }

    #[test]
    fn registered_name_skips_wildcard() {
        let mut registry = ProviderRegistry::new(named("default"));
        let star = Registration::new(named("star-private"), Scope::Private);
        registry.add_message_signer(WILDCARD, star);
        registry.add_message_signer("X", Registration::new(named("x-public"), Scope::Public));

        let provider = registry.get_message_signer("X", Scope::Private).expect("should resolve");
        assert_eq!(provider.name(), "default");
        let provider = registry.get_message_signer("Y", Scope::Private).expect("should resolve");
        assert_eq!(provider.name(), "star-private");
    }

    #[test]
    fn default_fallback() {
        let registry = ProviderRegistry::new(named("default"));
        assert_eq!(registry.get_best_match("unknown-algorithm", Scope::All).name(), "default");
        assert_eq!(registry.get_best_match("unknown-algorithm", Scope::Private).name(), "default");
    }

    #[test]
    fn specific_scope_does_not_satisfy_all() {
        let mut registry = ProviderRegistry::new(named("default"));
        registry.add_key_encrypter("X", Registration::new(named("x-public"), Scope::Public));

        assert_eq!(registry.get_best_match("X", Scope::Public).name(), "x-public");
        assert_eq!(registry.get_best_match("X", Scope::All).name(), "default");
    }

    #[test]
    fn best_match_order() {
        let mut registry = ProviderRegistry::new(named("default"));
        registry.add_mac_signer("X", Registration::all(named("mac")));
        registry.add_symmetric_encrypter("X", Registration::all(named("symmetric")));

        assert_eq!(registry.get_best_match("X", Scope::All).name(), "symmetric");
        assert_eq!(registry.get_mac_signer("X", Scope::All).expect("should resolve").name(), "mac");
    }

    #[test]
    fn standard_composition() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.get_best_match("ECDSA", Scope::Private).name(), "ECDSA");
        assert_eq!(registry.get_best_match("A256CBC-HS512", Scope::All).name(), "A256CBC-HS512");
        assert_eq!(registry.get_best_match("PBKDF2", Scope::All).name(), "PBKDF2");
        let digest = registry.get_digest("SHA-384", Scope::All).expect("should resolve");
        assert!(digest.supports("SHA-384"));
    }
}
