//! Admin session guard.
//!
//! A successful login writes a small session record into the console's state
//! directory; protected commands call [`SessionGuard::require_admin`] first.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Base64 SHA-256 of the demo password `admin123`.
pub const DEFAULT_ADMIN_PASSWORD_SHA256: &str = "JAvlGPq9JyTdtvBO6x2llnRI1+gxwIyPqCKAn3THIKk=";

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not logged in")]
    NotAuthenticated,
    #[error("session file '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn password_digest(password: &str) -> String {
    STANDARD.encode(Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    username: String,
    password_sha256: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password_sha256: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_sha256: password_sha256.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// True while the demo account is still configured.
    pub fn is_default(&self) -> bool {
        self.username == DEFAULT_ADMIN_USERNAME
            && self.password_sha256 == DEFAULT_ADMIN_PASSWORD_SHA256
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_ok = username == self.username;
        let password_ok = password_digest(password) == self.password_sha256.trim();
        username_ok && password_ok
    }
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD_SHA256)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

pub struct SessionGuard {
    credentials: AdminCredentials,
    state_dir: PathBuf,
}

impl SessionGuard {
    pub fn new(credentials: AdminCredentials, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            state_dir: state_dir.into(),
        }
    }

    pub fn credentials(&self) -> &AdminCredentials {
        &self.credentials
    }

    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join(SESSION_FILE)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AdminSession, SessionError> {
        if !self.credentials.verify(username, password) {
            warn!(username, "admin login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        let session = AdminSession {
            username: username.to_string(),
            logged_in_at: Utc::now(),
        };
        let path = self.session_path();
        fs::create_dir_all(&self.state_dir).map_err(|source| SessionError::Io {
            path: self.state_dir.clone(),
            source,
        })?;
        let raw = serde_json::to_vec_pretty(&session)?;
        fs::write(&path, raw).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })?;

        info!(username, path = %path.display(), "admin logged in");
        Ok(session)
    }

    /// The stored session, if any. An unreadable record or one left by a
    /// different admin account counts as logged out.
    pub fn current(&self) -> Result<Option<AdminSession>, SessionError> {
        let path = self.session_path();
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SessionError::Io { path, source }),
        };

        match serde_json::from_slice::<AdminSession>(&raw) {
            Ok(session) if session.username == self.credentials.username() => Ok(Some(session)),
            Ok(session) => {
                warn!(username = %session.username, "ignoring session for another account");
                Ok(None)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    pub fn require_admin(&self) -> Result<AdminSession, SessionError> {
        self.current()?.ok_or(SessionError::NotAuthenticated)
    }

    /// Removes the session record. Returns whether one existed.
    pub fn logout(&self) -> Result<bool, SessionError> {
        let path = self.session_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "admin logged out");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SessionError::Io { path, source }),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
