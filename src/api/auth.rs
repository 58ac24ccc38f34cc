use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::{AccountError, UserProfile};

/// The authenticated user, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

/// Accepts `Authorization: Token <key>` or `Authorization: Bearer <key>`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(key) = extract_token(&headers) else {
        return Err(ApiError::unauthorized());
    };

    let user = match state.shared.account_service.authenticate_token(&key).await {
        Ok(user) => user,
        Err(AccountError::Unauthorized) => {
            tracing::debug!("Rejected unknown session token");
            return Err(ApiError::unauthorized());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::Span::current().record("user_id", user.id.value());
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, key) = value.split_once(' ')?;

    if !(scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer")) {
        return None;
    }

    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token(&headers("Token abc123")), Some("abc123".into()));
        assert_eq!(extract_token(&headers("Bearer abc123")), Some("abc123".into()));
        assert_eq!(extract_token(&headers("bearer  abc123 ")), Some("abc123".into()));
        assert_eq!(extract_token(&headers("Basic abc123")), None);
        assert_eq!(extract_token(&headers("Token")), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
