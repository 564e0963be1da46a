//! Key set loading, token parsing and the verification pipeline.

mod config;
mod error;
mod key;
mod selector;
mod signature;
mod token;
mod validation;
mod verifier;

pub use error::*;

pub use config::*;
pub use key::*;
pub use token::JwtHeader;
pub use verifier::*;
