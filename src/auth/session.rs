//! Session management for authentication

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::auth::types::Usuario;
use crate::error::Result;
use crate::store::{SessionStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};

/// Claims we read from the access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry as a unix timestamp
    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
}

/// Snapshot of the stored authentication entries
#[derive(Debug, Clone)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: Option<String>,

    /// The user stored at login
    pub user: Option<Usuario>,
}

impl Session {
    /// Load the session from the store. Returns `None` without an access
    /// token. A user entry that no longer parses is dropped from the snapshot.
    pub fn load(store: &dyn SessionStore) -> Option<Self> {
        let access_token = store.get(ACCESS_TOKEN_KEY)?;
        let user = store.get(USER_KEY).and_then(|raw| {
            serde_json::from_str::<Usuario>(&raw)
                .map_err(|e| warn!("stored user is not valid JSON: {}", e))
                .ok()
        });

        Some(Self {
            access_token,
            refresh_token: store.get(REFRESH_TOKEN_KEY),
            user,
        })
    }

    /// Write the three auth entries
    pub fn save(&self, store: &dyn SessionStore) -> Result<()> {
        store.set(ACCESS_TOKEN_KEY, &self.access_token)?;
        match &self.refresh_token {
            Some(token) => store.set(REFRESH_TOKEN_KEY, token)?,
            None => store.remove(REFRESH_TOKEN_KEY)?,
        }
        match &self.user {
            Some(user) => store.set(USER_KEY, &serde_json::to_string(user)?)?,
            None => store.remove(USER_KEY)?,
        }
        Ok(())
    }

    /// Expiry of the access token, when it is a JWT carrying `exp`
    pub fn expires_at(&self) -> Option<i64> {
        token_claims(&self.access_token).and_then(|claims| claims.exp)
    }

    /// Check if the access token has expired.
    ///
    /// Tokens that cannot be decoded locally are reported as not expired and
    /// left for the backend to judge.
    pub fn is_expired(&self) -> bool {
        is_token_expired(&self.access_token)
    }
}

/// Whether a JWT's `exp` claim lies in the past. Opaque tokens are not
/// expired.
pub fn is_token_expired(token: &str) -> bool {
    match token_claims(token).and_then(|claims| claims.exp) {
        Some(expires_at) => now_secs() >= expires_at,
        None => false,
    }
}

/// Decode the claims of a JWT without checking its signature
pub fn token_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}
