//! services/api/src/web/middleware.rs
//!
//! The authentication guard and the visitor-tracking middleware.

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use inkpost_core::analytics::{classify_browser, classify_device};
use inkpost_core::domain::Role;
use inkpost_core::ports::{DatabaseService, NewVisitorEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::web::state::AppState;

//=========================================================================================
// Authenticated Caller Identity
//=========================================================================================

/// The authenticated caller. Extracted from the session cookie by every
/// handler that needs an identity; extraction failing is a 401 before the
/// handler body runs.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    /// The single authorization guard for admin-only operations. Applied at
    /// the top of every admin handler, before any mutation.
    pub fn require_admin(&self) -> Result<(), (StatusCode, String)> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err((
                StatusCode::FORBIDDEN,
                "Admin privileges required".to_string(),
            ))
        }
    }
}

/// Pulls the session id out of the `Cookie` header, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
}

//=========================================================================================
// Auth Guard (Extractor)
//=========================================================================================

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // 1. Parse the session id from the cookie header
        let session_id = session_id_from_headers(&parts.headers).ok_or((
            StatusCode::UNAUTHORIZED,
            "Authentication required".to_string(),
        ))?;

        // 2. Validate the session in the database and load the user with their role
        let user = state
            .db
            .validate_auth_session(session_id)
            .await
            .map_err(|e| {
                error!("Failed to validate auth session: {:?}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired session".to_string(),
                )
            })?;

        Ok(CurrentUser {
            user_id: user.user_id,
            email: user.email,
            role: user.role,
        })
    }
}

//=========================================================================================
// Visitor Tracking Middleware
//=========================================================================================

/// Client IP resolution for requests that may have passed through a proxy.
///
/// Priority:
/// 1. X-Forwarded-For header (comma-separated list, take the first entry)
/// 2. X-Real-IP header (for Nginx)
/// 3. ConnectInfo socket address (direct connection)
pub fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        return forwarded.to_string();
    }
    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        return real_ip.to_string();
    }
    addr.ip().to_string()
}

/// Middleware that appends one visitor event per page view on public content
/// routes. The insert is fire-and-forget: a failed write is logged and never
/// delays or fails the response it is attached to.
pub async fn track_visitor(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    // Only reads are page views; submissions on the same routes are not.
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let headers = req.headers();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let event = NewVisitorEvent {
        ip: client_ip(headers, addr),
        referer: headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        path: req.uri().path().to_string(),
        session_id: session_id_from_headers(headers).map(str::to_string),
        device: classify_device(&user_agent),
        browser: classify_browser(&user_agent),
        user_agent,
    };

    let db = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = db.record_visitor_event(event).await {
            warn!("Failed to record visitor event: {}", e);
        }
    });

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn addr() -> SocketAddr {
        "192.0.2.9:4242".parse().unwrap()
    }

    #[test]
    fn forwarded_for_wins_over_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers, addr()), "203.0.113.5");
    }

    #[test]
    fn real_ip_beats_the_socket_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers, addr()), "10.0.0.2");
    }

    #[test]
    fn socket_address_is_the_fallback() {
        assert_eq!(client_ip(&HeaderMap::new(), addr()), "192.0.2.9");
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; lang=en"),
        );
        assert_eq!(session_id_from_headers(&headers), Some("abc-123"));
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }
}
