use crate::models::{AuthState, TokenInfo};
use chrono::{DateTime, Utc};

const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Error type for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("JSON error: {0}")]
    JsonError(String),
    #[error("Server error: status {0}")]
    ServerError(u16),
    #[error("Access token was rejected")]
    InvalidToken,
}

/// Parses a stored expiry value.
///
/// Accepts epoch milliseconds (what the host writes) and RFC 3339.
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decides whether a stored token is usable at `now`.
///
/// A recorded expiry that cannot be parsed counts as expired.
pub fn evaluate_token(token: Option<&str>, expiry: Option<&str>, now: DateTime<Utc>) -> AuthState {
    let has_token = token.map(|t| !t.trim().is_empty()).unwrap_or(false);
    if !has_token {
        return AuthState::SignedOut;
    }

    match expiry.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => AuthState::Valid { expires_at: None },
        Some(raw) => match parse_expiry(raw) {
            Some(at) if at > now => AuthState::Valid {
                expires_at: Some(at),
            },
            Some(at) => AuthState::Expired { at: Some(at) },
            None => AuthState::Expired { at: None },
        },
    }
}

/// Token verification against the OAuth token-info endpoint
pub struct DriveAuthService {
    tokeninfo_url: String,
    client: reqwest::Client,
}

impl DriveAuthService {
    /// Create a service talking to the public token-info endpoint
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_TOKENINFO_URL.to_string())
    }

    /// Create a service against a custom endpoint
    pub fn with_endpoint(tokeninfo_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent("MemoSync/0.1.0")
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            tokeninfo_url,
            client,
        }
    }

    /// Ask the provider whether `token` is live and when it expires
    pub async fn verify_token(&self, token: &str) -> Result<TokenInfo, AuthError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("access_token", token)])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("Token info request failed: {}", e)))?;

        match response.status().as_u16() {
            200 => {
                let info = response
                    .json::<TokenInfo>()
                    .await
                    .map_err(|e| AuthError::JsonError(format!("Failed to parse token info: {}", e)))?;
                log::debug!("Token verified for client {:?}", info.azp);
                Ok(info)
            }
            400 | 401 => Err(AuthError::InvalidToken),
            status => Err(AuthError::ServerError(status)),
        }
    }
}

impl Default for DriveAuthService {
    fn default() -> Self {
        Self::new()
    }
}
