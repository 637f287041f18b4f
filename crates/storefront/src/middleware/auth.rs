//! Caller identity extractor.
//!
//! Authentication happens in the upstream gateway, which forwards the caller
//! as headers. This module only parses them.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::Span;

use pazar_core::{Actor, Role, StoreId, UserId};

use crate::error::{AppError, set_sentry_user};

/// Authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// `customer`, `store_operator` or `admin`.
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// Store bound to a store operator.
pub const STORE_ID_HEADER: &str = "x-store-id";

/// Extractor for the calling [`Actor`].
///
/// Rejects with 401 when the identity headers are missing or malformed.
/// A missing role header means `customer`.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Identity(actor): Identity) -> impl IntoResponse {
///     format!("Hello, user {}!", actor.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_actor(parts: &Parts) -> Result<Actor, AppError> {
    let user_id: UserId = header(parts, USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?
        .parse()
        .map_err(|_| AppError::Unauthenticated(format!("invalid {USER_ID_HEADER} header")))?;

    let role: Role = header(parts, USER_ROLE_HEADER)
        .map_or(Ok(Role::Customer), str::parse)
        .map_err(AppError::Unauthenticated)?;

    match role {
        Role::Customer => Ok(Actor::customer(user_id)),
        Role::Admin => Ok(Actor::admin(user_id)),
        Role::StoreOperator => {
            let store_id: StoreId = header(parts, STORE_ID_HEADER)
                .ok_or_else(|| {
                    AppError::Unauthenticated(format!(
                        "store operators must send {STORE_ID_HEADER}"
                    ))
                })?
                .parse()
                .map_err(|_| {
                    AppError::Unauthenticated(format!("invalid {STORE_ID_HEADER} header"))
                })?;
            Ok(Actor::operator(user_id, store_id))
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parse_actor(parts)?;

        Span::current().record("user_id", actor.user_id.as_i32());
        set_sentry_user(&actor.user_id, &actor.role.to_string());

        Ok(Self(actor))
    }
}
