/// Accounts and login sessions.
use anyhow::Result;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{from_unix, ProjectDb, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

impl ProjectDb {
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            anyhow::bail!("username and password are required");
        }
        if self.find_user(username)?.is_some() {
            return Err(StoreError::Conflict(format!("user {} already exists", username)).into());
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: from_unix(Utc::now().timestamp()),
        };
        let salt = Uuid::new_v4().simple().to_string();
        self.connection().execute(
            "INSERT INTO users(id, username, password_hash, salt, created_at) VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                hash_password(&salt, password),
                salt,
                user.created_at.timestamp()
            ],
        )?;
        info!(username, "user created");
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        let row = self
            .connection()
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, username, created_at)| -> Result<User> {
            Ok(User {
                id: Uuid::parse_str(&id)?,
                username,
                created_at: from_unix(created_at),
            })
        })
        .transpose()
    }

    pub fn user_count(&self) -> Result<usize> {
        let count: i64 = self
            .connection()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Returns the user when the credentials match.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        let row = self
            .connection()
            .query_row(
                "SELECT password_hash, salt FROM users WHERE username = ?1",
                params![username.trim()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((stored, salt)) = row else {
            debug!(username, "login for unknown user");
            return Ok(None);
        };
        if hash_password(&salt, password) != stored {
            warn!(username, "login rejected");
            return Ok(None);
        }
        self.find_user(username.trim())
    }

    pub fn create_session(&self, user_id: Uuid, ttl: Duration) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            token: new_token(),
            user_id,
            expires_at: now + ttl,
        };
        self.connection().execute(
            "INSERT INTO sessions(token, user_id, created_at, expires_at) VALUES(?1, ?2, ?3, ?4)",
            params![
                session.token,
                user_id.to_string(),
                now.timestamp(),
                session.expires_at.timestamp()
            ],
        )?;
        debug!(user = %user_id, "session created");
        Ok(session)
    }

    /// The user owning `token`, if the session exists and has not expired.
    pub fn session_user(&self, token: &str) -> Result<Option<User>> {
        let row = self
            .connection()
            .query_row(
                "SELECT u.id, u.username, u.created_at FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1 AND s.expires_at > ?2",
                params![token, Utc::now().timestamp()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, username, created_at)| -> Result<User> {
            Ok(User {
                id: Uuid::parse_str(&id)?,
                username,
                created_at: from_unix(created_at),
            })
        })
        .transpose()
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let removed = self
            .connection()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(removed > 0)
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let removed = self.connection().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![Utc::now().timestamp()],
        )?;
        if removed > 0 {
            info!(removed, "expired sessions purged");
        }
        Ok(removed)
    }
}
