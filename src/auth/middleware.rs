//! Authentication extractors.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::db as auth_db;
use crate::config;
use crate::db::{try_lock, LogOnError};
use crate::domain::Role;
use crate::response::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "hoctu_token";

/// Authenticated request context.
/// Add this as a handler parameter to require authentication.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
    /// The token this request was authenticated with
    pub token: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Token from the session cookie, or from `Authorization: Bearer`
fn extract_token(parts: &Parts, jar: &CookieJar) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = extract_token(parts, &jar)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let conn = try_lock(&state.db)?;

        // Clean up expired sessions occasionally (~10% chance)
        if rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD {
            auth_db::cleanup_expired_sessions(&conn).log_warn("Failed to clean up expired sessions");
        }

        let user_id = auth_db::get_session_user(&conn, &token)?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;
        let user = auth_db::get_user(&conn, user_id)?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;

        Ok(AuthContext {
            user_id,
            role: user.role,
            token,
        })
    }
}

/// Authenticated admin. Rejects other users with 403.
#[derive(Debug, Clone)]
pub struct AdminContext(pub AuthContext);

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        if !auth.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(AdminContext(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        let p = parts(&[("authorization", "Bearer abc123")]);
        let jar = CookieJar::from_headers(&p.headers);
        assert_eq!(extract_token(&p, &jar).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_cookie_takes_precedence() {
        let p = parts(&[("authorization", "Bearer header"), ("cookie", "hoctu_token=cookie")]);
        let jar = CookieJar::from_headers(&p.headers);
        assert_eq!(extract_token(&p, &jar).as_deref(), Some("cookie"));
    }

    #[test]
    fn test_rejects_other_schemes() {
        let p = parts(&[("authorization", "Basic dXNlcjpwYXNz")]);
        let jar = CookieJar::from_headers(&p.headers);
        assert_eq!(extract_token(&p, &jar), None);

        let p = parts(&[("authorization", "Bearer ")]);
        let jar = CookieJar::from_headers(&p.headers);
        assert_eq!(extract_token(&p, &jar), None);
    }
}
