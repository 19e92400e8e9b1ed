/// Session cookie handling and the gate in front of editor routes
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info};

use crate::api::ApiError;
use crate::models::{LoginRequest, LoginResponse};
use crate::AppState;

pub const SESSION_COOKIE: &str = "studio_session";

/// Session token from the cookie, or from an `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
        .next();
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        SESSION_COOKIE,
        token,
        max_age_secs.max(0),
        if secure { "; Secure" } else { "" }
    )
}

/// Middleware: rejects requests without a live session and exposes the user to handlers.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers()).ok_or(ApiError::Unauthenticated)?;
    let user = state
        .db
        .lock()
        .session_user(&token)?
        .ok_or(ApiError::Unauthenticated)?;
    debug!(user = %user.username, path = %req.uri().path(), "session accepted");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let db = state.db.lock();
    let user = db
        .verify_user(&req.username, &req.password)?
        .ok_or(ApiError::Unauthenticated)?;
    let session = db.create_session(user.id, state.session_ttl)?;
    drop(db);

    info!(user = %user.username, "logged in");
    let cookie = session_cookie(
        &session.token,
        state.session_ttl.num_seconds(),
        state.secure_cookies,
    );
    let body = LoginResponse {
        user,
        token: session.token,
        expires_at: session.expires_at,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/logout - Always clears the cookie, even without a live session
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        if state.db.lock().delete_session(&token)? {
            info!("logged out");
        }
    }
    let cookie = session_cookie("", 0, state.secure_cookies);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; studio_session=abc123; other=1"),
        );
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer zzz"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn bearer_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(session_token(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn empty_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("studio_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("t", 60, true);
        assert_eq!(
            cookie,
            "studio_session=t; Path=/; Max-Age=60; HttpOnly; SameSite=Lax; Secure"
        );
    }
}
