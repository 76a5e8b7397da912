use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;
use tunnel_core::User;
use uuid::Uuid;

use crate::error::Result;
use crate::state::AppState;

/// Name of the cookie carrying the anonymous session UUID.
pub const SESSION_COOKIE: &str = "tunnel_session";

/// The anonymous user behind a request, put into the request extensions by
/// [`session_middleware`].
#[derive(Debug, Clone)]
pub struct Session {
    pub uuid: String,
    pub user: User,
}

/// Resolves the session cookie to a user, starting a new session when the
/// cookie is missing or malformed.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let (uuid, fresh) = match session_uuid(request.headers()) {
        Some(uuid) => (uuid, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let user = state.shortener.session_user(&uuid).await?;
    if fresh {
        debug!(user_id = user.id, "started session");
    }
    request.extensions_mut().insert(Session {
        uuid: uuid.clone(),
        user,
    });

    let mut response = next.run(request).await;
    if fresh {
        let cookie = format!("{SESSION_COOKIE}={uuid}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    Ok(response)
}

fn session_uuid(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
        .map(|uuid| uuid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn finds_session_among_other_cookies() {
        let uuid = "353ba025-7285-4790-bfeb-b70c1ef18323";
        let cookie = format!("a=1; {SESSION_COOKIE}={uuid}");
        let headers = headers(&["theme=dark", cookie.as_str()]);
        assert_eq!(session_uuid(&headers).as_deref(), Some(uuid));
    }

    #[test]
    fn ignores_missing_or_malformed_session() {
        assert_eq!(session_uuid(&headers(&[])), None);
        assert_eq!(session_uuid(&headers(&["theme=dark"])), None);
        let malformed = format!("{SESSION_COOKIE}=not-a-uuid");
        assert_eq!(session_uuid(&headers(&[malformed.as_str()])), None);
    }
}
