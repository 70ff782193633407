//! Owner identity extraction.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in [`OWNER_HEADER`]. Every task route requires it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::ApiError;

/// Header carrying the authenticated owner id.
pub const OWNER_HEADER: &str = "x-owner-id";

/// The authenticated owner of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl OwnerId {
    /// Borrow the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized {
                message: format!("missing {OWNER_HEADER} header"),
            })?;
        let owner = raw
            .to_str()
            .map_err(|_| ApiError::Unauthorized {
                message: format!("malformed {OWNER_HEADER} header"),
            })?
            .trim();
        if owner.is_empty() {
            return Err(ApiError::Unauthorized {
                message: format!("empty {OWNER_HEADER} header"),
            });
        }
        Ok(Self(owner.to_string()))
    }
}
