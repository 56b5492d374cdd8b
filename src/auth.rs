use std::future::{ready, Ready};

use actix_identity::IdentityExt;
use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::errors::AppError;

/// The logged-in user, taken from the identity cookie.
///
/// Extracting it on an anonymous request fails with `AppError::Unauthorized`,
/// which renders as a redirect to `/login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .get_identity()
            .ok()
            .and_then(|identity| identity.id().ok())
            .and_then(|id| id.parse::<i64>().ok())
            .map(|id| AuthUser { id })
            .ok_or(AppError::Unauthorized);
        ready(user)
    }
}
