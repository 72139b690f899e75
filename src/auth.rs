//! Session-backed login state and the extractors guarding protected pages.

use std::future::{ready, Ready};

use actix_identity::IdentityExt;
use actix_session::{Session, SessionExt};
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;

pub const USER_KEY: &str = "user";
pub const ENTITY_KEY: &str = "selectedEntity";
pub const FLASH_KEY: &str = "flash";

/// The logged in user as persisted in the session.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionUser {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Backend ids come as numbers or strings; keep them as strings.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Read the session user. A value that no longer deserializes is removed and
/// reported as no session.
pub fn session_user(session: &Session) -> Option<SessionUser> {
    match session.get::<SessionUser>(USER_KEY) {
        Ok(user) => user,
        Err(e) => {
            log::warn!("Discarding malformed session user: {}", e);
            session.remove(USER_KEY);
            None
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let session = req.get_session();
    let user = session_user(&session).ok_or(AppError::Unauthenticated)?;
    if req.get_identity().is_err() {
        log::debug!("Session user {} has no identity, dropping it", user.id);
        session.remove(USER_KEY);
        return Err(AppError::Unauthenticated);
    }
    Ok(AuthUser(user))
}

/// Any logged in user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.0.is_admin {
            Ok(())
        } else {
            log::warn!("User {} denied admin page", self.0.id);
            Err(AppError::Forbidden)
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

pub fn flash_success(session: &Session, message: &str) {
    set_flash(session, "success", message);
}

pub fn flash_error(session: &Session, message: &str) {
    set_flash(session, "error", message);
}

fn set_flash(session: &Session, level: &str, message: &str) {
    let flash = Flash {
        level: level.to_string(),
        message: message.to_string(),
    };
    if let Err(e) = session.insert(FLASH_KEY, flash) {
        log::error!("Failed to store flash message: {}", e);
    }
}

/// Take the pending flash message, if any.
pub fn take_flash(session: &Session) -> Option<Flash> {
    session.remove_as::<Flash>(FLASH_KEY).and_then(Result::ok)
}
