//! Request Identity
//!
//! The session layer in front of this service authenticates the user and
//! forwards who they are as headers. Handlers that need an identity take a
//! `RequestContext` argument; nothing reads the current user from ambient
//! state.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::handlers::ErrorResponse;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

/// Identity resolved once per request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

fn header_uuid(parts: &Parts, name: &str) -> Option<Uuid> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_uuid(parts, USER_ID_HEADER);
        let organization_id = header_uuid(parts, ORGANIZATION_ID_HEADER);

        match (user_id, organization_id) {
            (Some(user_id), Some(organization_id)) => Ok(Self { user_id, organization_id }),
            _ => {
                tracing::debug!(path = %parts.uri.path(), "Request without identity headers");
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Authentication required".into(),
                        code: "UNAUTHENTICATED".into(),
                    }),
                ))
            }
        }
    }
}
