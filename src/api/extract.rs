//! Request extractors: the authenticated viewer and the write-time actor

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    Json,
};

use super::auth::{AuthError, Claims, PERMISSION_MODERATE};
use super::rest::{ApiError, ApiRejection};
use super::state::AppState;
use crate::log_store::{ContributionError, ContributionResult};
use crate::types::{Actor, ActorSource, Visibility};

/// Caller identity from an optional bearer token
///
/// Requests without an `Authorization` header are anonymous viewers. A header
/// carrying an invalid or expired token is rejected.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub claims: Option<Claims>,
}

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.claims.as_ref().map(|c| c.uid)
    }

    pub fn visibility(&self) -> Visibility {
        match self.claims {
            Some(ref claims) if claims.has_permission(PERMISSION_MODERATE) => {
                Visibility::Privileged
            }
            _ => Visibility::Public,
        }
    }

    /// Claims of an authenticated viewer holding `permission`
    pub fn require(&self, permission: &str) -> Result<&Claims, ApiRejection> {
        let claims = self.claims.as_ref().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::unauthorized("Missing authentication token")),
            )
        })?;

        if claims.has_permission(permission) {
            Ok(claims)
        } else {
            Err((
                StatusCode::FORBIDDEN,
                Json(ApiError::forbidden(AuthError::InsufficientPermissions.to_string())),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Viewer {
    type Rejection = ApiRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Viewer::default());
        };

        let header = header.to_str().map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::unauthorized("Malformed Authorization header")),
            )
        })?;

        let claims = state
            .auth
            .validate_authorization(header)
            .map_err(|e| (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(e.to_string()))))?;

        Ok(Viewer {
            claims: Some(claims),
        })
    }
}

/// Actor behind an HTTP write: the viewer's user id and the client IP
#[derive(Debug, Clone)]
pub struct RequestActor {
    user_id: Option<i64>,
    ip: Option<IpAddr>,
}

impl RequestActor {
    pub fn new(viewer: &Viewer, headers: &HeaderMap) -> Self {
        Self {
            user_id: viewer.user_id(),
            ip: client_ip(headers),
        }
    }
}

impl ActorSource for RequestActor {
    fn resolve_actor(&self) -> ContributionResult<Actor> {
        let ip = self.ip.ok_or_else(|| {
            ContributionError::ActorUnresolved("request origin IP unknown".to_string())
        })?;
        Ok(Actor::new(self.user_id, ip))
    }
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        assert_eq!(client_ip(&headers), Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(client_ip(&headers), Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_actor_without_ip_is_unresolved() {
        let actor = RequestActor::new(&Viewer::default(), &HeaderMap::new());
        assert!(matches!(
            actor.resolve_actor(),
            Err(ContributionError::ActorUnresolved(_))
        ));
    }
}
