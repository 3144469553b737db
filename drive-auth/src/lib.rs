//! # Drive Auth
//!
//! Access-token handling for the Google Drive backed memo sync.
//!
//! This crate provides:
//! - The persisted key names under which the host application stores the
//!   OAuth access token and its expiry
//! - Validity rules deciding whether a stored token is usable
//! - Token verification against the token-info endpoint
//!
//! ## Separation of Concerns
//!
//! This crate focuses solely on credentials. It does **not**:
//! - Run the OAuth consent flow (handled by the host application)
//! - Store credentials (the sync engine owns the key-value store)
//! - Talk to the Drive files API (handled by the sync engine)
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use drive_auth::{evaluate_token, DriveAuthService};
//!
//! let state = evaluate_token(Some("ya29.token"), Some("1893456000000"), chrono::Utc::now());
//! assert!(state.is_usable());
//!
//! let info = DriveAuthService::new().verify_token("ya29.token").await?;
//! ```

pub mod models;
pub mod service;

pub use models::{AccessToken, AuthState, TokenInfo};
pub use service::{evaluate_token, parse_expiry, AuthError, DriveAuthService};

/// Key of the access token written by current host versions
pub const ACCESS_TOKEN_KEY: &str = "gdrive_access_token";

/// Key used by older host versions; still honoured when the current key is empty
pub const LEGACY_ACCESS_TOKEN_KEY: &str = "googleDriveAccessToken";

/// Lookup order for the access token
pub const ACCESS_TOKEN_KEYS: [&str; 2] = [ACCESS_TOKEN_KEY, LEGACY_ACCESS_TOKEN_KEY];

/// Key of the token expiry (epoch milliseconds or RFC 3339)
pub const TOKEN_EXPIRY_KEY: &str = "gdrive_token_expiry";

/// OAuth scope the sync engine needs for its own files
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
