//! # Caller Identity
//!
//! Authentication happens upstream. The gateway in front of this service
//! forwards the authenticated principal as two headers:
//!
//! - `x-actor-id`: opaque principal id, recorded on transitions
//! - `x-actor-role`: `taxpayer`, `chartered_accountant`, `admin` or `system`
//!
//! [`Caller`] extracts them into an [`Actor`]; the registry's role guard
//! decides what that actor may do. Callbacks from the e-filing gateway
//! instead present a shared token and act as [`Actor::system`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use itr_state::{Actor, Role};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(&parts.headers, ACTOR_ID_HEADER)?
            .ok_or_else(|| AppError::Unauthorized(format!("missing {ACTOR_ID_HEADER} header")))?;
        let role: Role = header(&parts.headers, ACTOR_ROLE_HEADER)?
            .ok_or_else(|| AppError::Unauthorized(format!("missing {ACTOR_ROLE_HEADER} header")))?
            .parse()
            .map_err(AppError::BadRequest)?;
        if role == Role::System {
            // System identity is reserved for the callback endpoints.
            return Err(AppError::Forbidden("system role cannot be asserted by header".into()));
        }
        Ok(Self(Actor::new(id, role)))
    }
}

/// The e-filing gateway calling back with a processing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCaller(pub Actor);

impl FromRequestParts<AppState> for GatewayCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(expected) = &state.config.callback_token {
            let presented = header(&parts.headers, CALLBACK_TOKEN_HEADER)?;
            let accepted = presented
                .as_deref()
                .is_some_and(|token| constant_time_token_eq(token, expected));
            if !accepted {
                tracing::warn!("callback rejected: bad or missing callback token");
                return Err(AppError::Unauthorized("invalid callback token".into()));
            }
        }
        Ok(Self(Actor::system()))
    }
}

/// Compare callback tokens without leaking a matching prefix or length.
fn constant_time_token_eq(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    if presented.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    presented.ct_eq(expected).into()
}

fn header(headers: &HeaderMap, name: &str) -> Result<Option<String>, AppError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::BadRequest(format!("{name} is not valid ASCII")))?
                .trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<Caller, AppError> {
        let (mut parts, _) = req.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn headers_become_an_actor() {
        let req = Request::builder()
            .header(ACTOR_ID_HEADER, "ca-42")
            .header(ACTOR_ROLE_HEADER, "chartered_accountant")
            .body(())
            .unwrap();
        let Caller(actor) = extract(req).await.unwrap();
        assert_eq!(actor, Actor::new("ca-42", Role::CharteredAccountant));
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        assert!(matches!(extract(req).await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn unknown_role_is_a_bad_request() {
        let req = Request::builder()
            .header(ACTOR_ID_HEADER, "u1")
            .header(ACTOR_ROLE_HEADER, "auditor")
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn token_comparison() {
        assert!(constant_time_token_eq("s3cret-token", "s3cret-token"));
        assert!(!constant_time_token_eq("s3cret-tokex", "s3cret-token"));
        assert!(!constant_time_token_eq("s3cret", "s3cret-token"));
        assert!(!constant_time_token_eq("", "s3cret-token"));
    }

    #[tokio::test]
    async fn system_cannot_be_claimed() {
        let req = Request::builder()
            .header(ACTOR_ID_HEADER, "u1")
            .header(ACTOR_ROLE_HEADER, "system")
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(AppError::Forbidden(_))));
    }
}
