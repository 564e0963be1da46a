//! # actix-jwks-auth
//!
//! This crate verifies JWT bearer tokens against a JSON Web Key Set that is
//! configured up front, and plugs the result into `actix-web` as an extractor.
//!
//! The key set may be given as JSON, as base64url-encoded JSON, or as a
//! single bare JWK, inline or through a location read once at startup. Each
//! token is matched to exactly one configured RSA key by its `kid`, its
//! signature is checked over the bytes as received, and its `iss` and `exp`
//! claims are validated. Rejected tokens never reveal why to the client.
//!
//! ## Example
//!
//! ```no_run
//! use actix_web::{web, App, HttpServer, HttpResponse};
//! use actix_jwks_auth::{AuthenticatedToken, JwtAuth, VerifierConfig};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = VerifierConfig::from_env().unwrap(); // Don't forget to handle this error
//!     let auth = JwtAuth::new(config).await.unwrap();
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .app_data(web::Data::new(auth.clone()))
//!             .route("/secured-endpoint", web::get().to(secured))
//!     })
//!     .bind(("127.0.0.1", 8080))?
//!     .run()
//!     .await
//! }
//!
//! async fn secured(token: AuthenticatedToken) -> HttpResponse {
//!     HttpResponse::Ok().body(token.raw().to_owned())
//! }
//! ```

mod claims;
mod client;
mod error;
mod impls;
pub mod jwk;

#[cfg(test)]
mod fixtures;

pub use claims::*;
pub use client::*;
pub use error::*;
pub use jwk::{
    ConfigError, JwkVerifier, KeyRegistry, PublicKeySource, RejectReason, VerificationResult,
    VerifierConfig, VerifierSettings,
};
