use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::ApiError;
use crate::database::schema::{User, UserRole};
use crate::schema::Uuid;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }

    /// Whether the caller may modify something owned by `owner_id`.
    pub fn can_manage(&self, owner_id: Uuid, own: ActionType, all: ActionType) -> bool {
        match self.authenticate(all) {
            Ok(_) => true,
            Err(_) => owner_id == self.user_id && self.authenticate(own).is_ok(),
        }
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            role: value.role,
        }
    }
}

/// Signing material for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime_hours: i64) -> Result<Self, ApiError> {
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|e| ApiError::Internal(format!("invalid session secret: {e}")))?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> Result<String, ApiError> {
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        keys.lifetime,
    );

    claims
        .sign_with_key(&keys.key)
        .map_err(|e| ApiError::Internal(format!("failed to sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> Result<JwtSessionData, ApiError> {
    let session: JwtSessionData = token.verify_with_key(&keys.key).map_err(|e| {
        log::debug!("Rejected session token: {e}");
        ApiError::Unauthenticated
    })?;

    let now = Utc::now().timestamp();
    if (session.exp - now).is_negative() {
        log::debug!("Rejected expired session for {}", session.username);
        return Err(ApiError::Unauthenticated);
    }

    Ok(session)
}
