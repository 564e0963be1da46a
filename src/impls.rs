use actix_web::error::InternalError;
use actix_web::http::{header, StatusCode};
use actix_web::{dev, http::header::Header, web, FromRequest, HttpRequest};
use actix_web::{HttpResponse, ResponseError};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use futures::future::{err, ok, Ready};

use crate::jwk::PublicKeysError;
use crate::{AuthenticatedToken, Error, JwtAuth};

const REALM: &str = "jwt";

fn status_code_from_http_err(err: &reqwest::Error) -> StatusCode {
    err.status()
        .and_then(|s| StatusCode::from_u16(s.as_u16()).ok())
        .unwrap_or(StatusCode::BAD_GATEWAY) // Use BAD_GATEWAY for upstream fetch failures
}

impl ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        match self {
            // The rejection reason is for logs only
            Error::Rejected(_) => invalid_token_response(),
            _ => HttpResponse::build(self.status_code()).json(self.to_string()),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,

            Error::PublicKeysError(err) => match err {
                PublicKeysError::FetchPublicKeys { source, .. } => {
                    status_code_from_http_err(source)
                }
                PublicKeysError::ReadPublicKeys { .. }
                | PublicKeysError::UnsupportedLocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            Error::Rejected(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl FromRequest for AuthenticatedToken {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let Some(auth) = req.app_data::<web::Data<JwtAuth>>() else {
            tracing::error!("JwtAuth is not registered as application data");
            return err(internal_token_verification_error());
        };

        let bearer = match Authorization::<Bearer>::parse(req) {
            Ok(header) => header.into_scheme(),
            Err(_) => {
                // Per RFC 7235, a 401 Unauthorized response MUST be returned when the
                // Authorization header is missing, malformed, or uses an unsupported scheme.
                //
                // Actix defaults to 400 Bad Request for parsing failures, which is incorrect
                // in the context of authentication.
                return err(missing_or_malformed_auth_header());
            }
        };

        match auth.authenticate(bearer.token()) {
            Ok(token) => ok(token),
            Err(other) => err(other.into()),
        }
    }
}

fn internal_token_verification_error() -> actix_web::Error {
    let response =
        HttpResponse::InternalServerError().body("Internal error during token verification");

    InternalError::from_response("token_verification_failure", response).into()
}

fn missing_or_malformed_auth_header() -> actix_web::Error {
    let response = unauthorized_with_www_authenticate(
        "invalid_request",
        "Authorization header missing or not using Bearer scheme",
    );

    InternalError::from_response("auth_error", response).into()
}

fn invalid_token_response() -> HttpResponse {
    unauthorized_with_www_authenticate("invalid_token", "The access token is invalid")
}

/// A 401 response carrying a Bearer challenge.
fn unauthorized_with_www_authenticate(
    www_error_code: &str,
    www_error_description: &str,
) -> HttpResponse {
    let header_value = format!(
        r#"Bearer realm="{REALM}", error="{www_error_code}", error_description="{www_error_description}""#
    );

    HttpResponse::Unauthorized()
        .insert_header((header::WWW_AUTHENTICATE, header_value))
        .body(www_error_description.to_owned())
}
