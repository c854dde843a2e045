//! Session management for authentication

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::storage::{MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};
use crate::AuthError;

/// Backend-assigned identifier
///
/// The backend emits integers today; strings are accepted as well and the
/// value is only ever echoed back in URLs, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpaqueId(String);

impl OpaqueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for OpaqueId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for OpaqueId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for OpaqueId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OpaqueId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(Self(n.to_string())),
            RawId::Text(s) if !s.is_empty() => Ok(Self(s)),
            RawId::Text(_) => Err(serde::de::Error::custom("empty identifier")),
        }
    }
}

/// User profile as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: OpaqueId,

    /// Display name
    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "correo")]
    pub email: String,
}

/// Session data
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Opaque bearer credential
    pub token: String,

    pub user: User,
}

/// Shared handle on the current session and its persisted copy
///
/// Cloning is cheap and every clone observes the same session, so one
/// context is created at start-up and handed to each client. `teardown`
/// from any clone (logout, or a 401 seen by the gateway) is visible to all.
#[derive(Clone)]
pub struct SessionContext {
    current: Arc<RwLock<Option<Session>>>,
    storage: Arc<dyn SessionStorage>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionContext {
    /// Restore the persisted session from `storage`, if there is one
    ///
    /// A token without a decodable user (or the reverse) is treated as a
    /// corrupt session: both keys are removed and the context starts empty.
    pub fn init(storage: Arc<dyn SessionStorage>) -> Self {
        let restored = match Self::read_persisted(storage.as_ref()) {
            Ok(Some(session)) => {
                log::debug!("Restored session for {}", session.user.email);
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Discarding persisted session: {}", e);
                Self::clear_persisted(storage.as_ref());
                None
            }
        };

        Self {
            current: Arc::new(RwLock::new(restored)),
            storage,
        }
    }

    /// A context backed by [`MemoryStorage`], starting unauthenticated
    pub fn ephemeral() -> Self {
        Self::init(Arc::new(MemoryStorage::new()))
    }

    fn read_persisted(storage: &dyn SessionStorage) -> Result<Option<Session>, AuthError> {
        let token = storage.get_item(TOKEN_KEY)?;
        let user = storage.get_item(USER_KEY)?;

        match (token, user) {
            (None, None) => Ok(None),
            (Some(token), Some(user)) if !token.is_empty() => {
                let user: User = serde_json::from_str(&user)?;
                Ok(Some(Session { token, user }))
            }
            _ => Err(AuthError::StorageError(
                "incomplete persisted session".to_string(),
            )),
        }
    }

    fn clear_persisted(storage: &dyn SessionStorage) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = storage.remove_item(key) {
                log::warn!("Failed to remove persisted '{}': {}", key, e);
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Get the current session
    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    /// Bearer token of the current session
    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    /// Profile of the signed-in user
    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Persist `session` and make it current
    pub fn establish(&self, session: Session) -> Result<(), AuthError> {
        let user = serde_json::to_string(&session.user)?;
        self.storage.set_item(TOKEN_KEY, &session.token)?;
        self.storage.set_item(USER_KEY, &user)?;

        *self.write() = Some(session);
        Ok(())
    }

    /// Drop the session from memory and storage
    ///
    /// Always succeeds in memory; storage failures are logged.
    pub fn teardown(&self) {
        let previous = self.write().take();
        Self::clear_persisted(self.storage.as_ref());

        if let Some(session) = previous {
            log::info!("Session for {} ended", session.user.email);
        }
    }
}
