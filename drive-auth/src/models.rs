use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Response from the OAuth token-info endpoint
///
/// The endpoint reports numbers as strings, so they are kept as such and
/// parsed on access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Absolute expiry, seconds since epoch
    #[serde(default)]
    pub exp: Option<String>,
    /// Remaining lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenInfo {
    /// Expiry instant, preferring the absolute `exp` over `expires_in`
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(exp) = self.exp.as_deref().and_then(|s| s.trim().parse::<i64>().ok()) {
            return Utc.timestamp_opt(exp, 0).single();
        }
        self.expires_in
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(|secs| now + Duration::seconds(secs))
    }

    /// Whether the token was granted the given scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().any(|granted| granted == scope))
            .unwrap_or(false)
    }
}

/// Access token as persisted by the host application
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Serialized expiry as stored under the expiry key (epoch millis)
    pub fn expiry_value(&self) -> Option<String> {
        self.expires_at.map(|at| at.timestamp_millis().to_string())
    }
}

/// Result of evaluating the stored credential
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No non-empty token stored
    SignedOut,
    /// Token present but its expiry is in the past or unreadable
    Expired { at: Option<DateTime<Utc>> },
    /// Token present and not known to be expired
    Valid { expires_at: Option<DateTime<Utc>> },
}

impl AuthState {
    pub fn is_usable(&self) -> bool {
        matches!(self, AuthState::Valid { .. })
    }
}
