//! Voter authentication and session management
//!
//! This module sits outside the election core:
//! 1. Credentials are stored as salted keyed Blake3 hashes, never in clear
//! 2. Credential checks compare in constant time
//! 3. Sessions map random tokens to voter ids with an expiry
//! 4. Logout and expiry both invalidate a token immediately
//!
//! The election only ever sees the [`VoterId`] a session resolves to.

use crate::config::{AuthConfig, MIN_SALT_BYTES};
use crate::types::{Voter, VoterId, VoterStatus};
use crate::{Error, Result, internal_error};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;
use zeroize::Zeroize;

/// Opaque session token handed to an authenticated voter
pub type SessionToken = String;

/// Salted credential hasher
pub struct CredentialHasher {
    key: [u8; 32],
}

impl Drop for CredentialHasher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl CredentialHasher {
    /// Create a hasher keyed by the first 32 bytes of `salt`
    pub fn from_salt(salt: &[u8]) -> Result<Self> {
        if salt.len() < MIN_SALT_BYTES {
            return Err(Error::configuration(format!(
                "Credential salt must be at least {MIN_SALT_BYTES} bytes"
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&salt[..32]);
        Ok(Self { key })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let mut salt = config.credential_salt_bytes()?;
        let hasher = Self::from_salt(&salt);
        salt.zeroize();
        hasher
    }

    /// Create for testing with a secure random salt
    pub fn for_testing() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    /// Hex-encoded keyed hash of a password
    pub fn hash(&self, password: &str) -> String {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }

    /// Check a password against a stored hash in constant time
    pub fn verify(&self, password: &str, expected: &str) -> bool {
        use subtle::ConstantTimeEq;
        let actual = self.hash(password);
        if actual.len() != expected.len() {
            return false;
        }
        actual.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

#[derive(Debug, Clone)]
struct Session {
    voter_id: VoterId,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Session store mapping tokens to voter ids
pub struct SessionService {
    hasher: CredentialHasher,
    /// None when the configured lifetime overflows
    lifetime: Option<Duration>,
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl SessionService {
    pub fn new(hasher: CredentialHasher, lifetime_seconds: u64) -> Self {
        let lifetime = i64::try_from(lifetime_seconds)
            .ok()
            .and_then(Duration::try_seconds);

        Self {
            hasher,
            lifetime,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        Ok(Self::new(
            CredentialHasher::from_config(config)?,
            config.session_lifetime_seconds,
        ))
    }

    /// Create session service for testing
    pub fn for_testing() -> Self {
        Self::new(CredentialHasher::for_testing(), 300)
    }

    /// Hasher used to derive stored credential hashes at registration
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Authenticate a voter and open a session
    pub fn login(&self, voter: &Voter, password: &str) -> Result<SessionToken> {
        if !self.hasher.verify(password, &voter.credential_hash) {
            tracing::warn!("🚫 Login rejected for voter {}: bad credentials", voter.id);
            return Err(Error::unauthorized("Invalid credentials"));
        }
        if voter.status == VoterStatus::Blocked {
            tracing::warn!("🚫 Login rejected for voter {}: blocked", voter.id);
            return Err(Error::unauthorized("Voter is blocked"));
        }

        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = hex::encode(raw);

        let now = Utc::now();
        let expires_at = self
            .lifetime
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.sessions
            .write()
            .map_err(|_| internal_error!("Session store write error"))?
            .insert(
                token.clone(),
                Session {
                    voter_id: voter.id,
                    expires_at,
                },
            );

        tracing::info!("🔑 Session opened for voter {}", voter.id);
        Ok(token)
    }

    /// Resolve a session token to the voter it belongs to
    ///
    /// Expired sessions are removed on lookup.
    pub fn resolve_session(&self, token: &str) -> Result<VoterId> {
        let now = Utc::now();
        {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| internal_error!("Session store read error"))?;

            match sessions.get(token) {
                None => return Err(Error::unauthorized("Invalid session")),
                Some(session) if !session.is_expired(now) => return Ok(session.voter_id),
                Some(_) => {}
            }
        }

        self.sessions
            .write()
            .map_err(|_| internal_error!("Session store write error"))?
            .remove(token);
        tracing::debug!("Session expired and removed");
        Err(Error::unauthorized("Session expired"))
    }

    /// End a session. Returns whether the token was active.
    pub fn logout(&self, token: &str) -> Result<bool> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| internal_error!("Session store write error"))?
            .remove(token)
            .is_some();
        if removed {
            tracing::info!("👋 Session closed");
        }
        Ok(removed)
    }

    /// Drop every expired session, returning how many were removed
    pub fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| internal_error!("Session store write error"))?;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }

    pub fn active_sessions(&self) -> Result<usize> {
        let now = Utc::now();
        let sessions = self
            .sessions
            .read()
            .map_err(|_| internal_error!("Session store read error"))?;
        Ok(sessions.values().filter(|s| !s.is_expired(now)).count())
    }
}
