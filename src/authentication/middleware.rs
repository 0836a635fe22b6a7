use warp::{reject::Rejection, Filter};

use crate::database::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData, SessionKeys};

/// Pulls the token out of `Authorization: Token <jwt>` (or `Bearer <jwt>`).
pub fn extract_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }

    match scheme.to_ascii_lowercase().as_str() {
        "token" | "bearer" => Some(token),
        _ => None,
    }
}

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            let token = header
                .as_deref()
                .and_then(extract_token)
                .ok_or_else(|| warp::reject::custom(ApiError::Unauthenticated))?;

            verify_jwt_session(token, &keys)
                .map(SessionData::from)
                .map_err(warp::reject::custom)
        }
    })
}

/// Like [`with_session`] but anonymous (or broken) credentials yield `None`.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        let token = header.as_deref().and_then(extract_token)?;

        verify_jwt_session(token, &keys).ok().map(SessionData::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_schemes() {
        assert_eq!(extract_token("Token abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("token   abc  "), Some("abc"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("Token "), None);
        assert_eq!(extract_token("abc"), None);
    }
}
