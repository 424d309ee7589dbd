use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::comments::UserId;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)
            .or_else(|| extract_session_token(parts, &state.config.auth.cookie_name))
            .ok_or(AppError::Unauthorized)?;

        let id = state
            .sessions
            .resolve(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser { id })
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(name: header::HeaderName, value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(name, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let parts = parts_with(header::COOKIE, "theme=dark; fanthread_session=abc123; x=y");
        assert_eq!(
            extract_session_token(&parts, "fanthread_session"),
            Some("abc123")
        );
        assert_eq!(extract_session_token(&parts, "other"), None);
    }

    #[test]
    fn reads_bearer_header() {
        let parts = parts_with(header::AUTHORIZATION, "Bearer tok-1");
        assert_eq!(extract_bearer_token(&parts), Some("tok-1"));

        let parts = parts_with(header::AUTHORIZATION, "Basic Zm9vOmJhcg==");
        assert_eq!(extract_bearer_token(&parts), None);
    }
}
