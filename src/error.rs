//! # Errors
//!
//! This module defines the error types used by the crypto core, including for traits that may be
//! implemented in other crates (key stores, platform vaults).
//!
//! All failures are terminal for the requested operation. Nothing here retries or substitutes a
//! different algorithm.

use std::fmt::Display;

use thiserror::Error;

/// Simplify creation of errors with tracing.
///
/// # Example
/// ```
/// use vercre_wallet_crypto::error::Err;
/// use vercre_wallet_crypto::{tracerr, Result};
///
/// fn with_msg() -> Result<()> {
///     tracerr!(Err::KeyError, "message: {}", "some message")
/// }
///
/// fn no_msg() -> Result<()> {
///     tracerr!(Err::KeyError)
/// }
/// ```
#[macro_export]
macro_rules! tracerr {
    // with context
    ($code:expr, $($msg:tt)*) => {
        {
        use $crate::error::Context as _;
        tracing::error!($($msg)*);
        return Err($code).context(format!($($msg)*));
        }
    };
    // no context
    ($code:expr) => {
        {
        tracing::error!("{}", $code);
        return Err($code.into());
        }
    }
}

/// Public error type for the crypto core.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] anyhow::Error);

impl Error {
    /// Transfer the error to `OAuth2` compatible format.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.0.root_cause().to_string(),
            "error_description": self.to_string(),
        })
    }

    /// Returns true if `err` is the code held by this error object.
    #[must_use]
    pub fn is(&self, err: Err) -> bool {
        self.0.downcast_ref::<Err>().is_some_and(|e| e == &err)
    }

    /// The typed error code carried by this error, if any.
    #[must_use]
    pub fn code(&self) -> Option<Err> {
        self.0.downcast_ref::<Err>().copied()
    }
}

/// Typed error codes.
#[derive(Clone, Copy, Error, Debug, PartialEq, Eq)]
pub enum Err {
    /// The algorithm or its parameters are unsupported or misconfigured.
    #[error("algorithm_error")]
    AlgorithmError,

    /// Invalid key material or the wrong type of key for the operation.
    #[error("key_error")]
    KeyError,

    /// Key encoding could not be interpreted (malformed JWK, unsupported point encoding).
    #[error("key_format_error")]
    KeyFormatError,

    /// Signing or verification preconditions were violated.
    #[error("signature_error")]
    SignatureError,

    /// Authenticated decryption failed. Tag mismatch and padding failure are not distinguished.
    #[error("authentication_error")]
    AuthenticationError,

    /// The key does not permit the requested usage.
    #[error("unsupported_usage")]
    UnsupportedUsage,

    /// The registry could not resolve any provider, including the default.
    #[error("no_provider")]
    NoProvider,

    /// Hash is not a valid SHA-256 multihash, or does not match the data it commits to.
    #[error("invalid_hash")]
    InvalidHash,

    /// Invalid format. (See context for details)
    #[error("invalid_format")]
    InvalidFormat,

    /// Key not found in a key store.
    #[error("key_not_found")]
    KeyNotFound,

    /// An error occurred trying to serialize data.
    #[error("serialization_error")]
    SerializationError,

    /// An error occurred trying to deserialize data.
    #[error("deserialization_error")]
    DeserializationError,
}

/// Context is used to decorate errors with useful context information.
pub trait Context<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Adds context to the error.
    ///
    /// # Errors
    ///
    /// * Original error with context appended.
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static;
}

impl<T, E> Context<T, E> for core::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(e) => Err(Error(anyhow::Error::from(e).context(context))),
        }
    }
}

impl From<Err> for Error {
    fn from(error: Err) -> Self {
        Self(error.into())
    }
}

impl From<base64ct::Error> for Error {
    fn from(err: base64ct::Error) -> Self {
        Self(anyhow::Error::from(Err::InvalidFormat).context(err.to_string()))
    }
}

impl From<multihash::Error> for Error {
    fn from(err: multihash::Error) -> Self {
        Self(anyhow::Error::from(Err::InvalidHash).context(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        let code = if err.is_data() || err.is_syntax() || err.is_eof() {
            Err::DeserializationError
        } else {
            Err::SerializationError
        };
        Self(anyhow::Error::from(code).context(err.to_string()))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self(anyhow::Error::from(Err::InvalidFormat).context(err.to_string()))
    }
}
