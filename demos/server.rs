//! Minimal Actix Web example demonstrating the [`AuthenticatedToken`] extractor.
//!
//! This server exposes two endpoints:
//! - `/secured-endpoint`: Requires a valid bearer token and echoes it back.
//! - `/whoami`: Returns the caller's principal name, or `"Anonymous"` otherwise.
//!
//! Configuration is read from the environment, e.g.
//! `MP_JWT_VERIFY_PUBLICKEY='{"keys":[...]}' MP_JWT_VERIFY_ISSUER=issuer`.

use actix_jwks_auth::{AuthenticatedToken, JwtAuth, VerifierConfig};
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match VerifierConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Refuse to start without the trusted keys
    let auth = match JwtAuth::new(config).await {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("Failed to load public keys: {e}");
            std::process::exit(1);
        }
    };

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(auth.clone()))
            .service(secured_endpoint)
            .service(whoami)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}

// Protected route, returns the raw token it was called with
#[get("/secured-endpoint")]
async fn secured_endpoint(token: AuthenticatedToken) -> impl Responder {
    HttpResponse::Ok().body(token.raw().to_owned())
}

#[get("/whoami")]
async fn whoami(token: Option<AuthenticatedToken>) -> impl Responder {
    let name = token
        .as_ref()
        .and_then(|t| t.claims().principal_name())
        .unwrap_or("Anonymous")
        .to_owned();
    HttpResponse::Ok().body(name)
}
