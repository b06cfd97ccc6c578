//! # JOSE
//!
//! JSON Object Signing and Encryption on top of the provider registry. JWS tokens are signed
//! and verified by whichever provider the registry resolves for the token's `alg`, so platform
//! keys and software keys go through the same code path.

mod jwa;
mod jws;

pub use self::jwa::*;
pub use self::jws::*;
