// Authentication types

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Bearer token pair issued by the cloud auth endpoint.
///
/// Callers receive owned snapshots of this; the cached copy inside the
/// token manager is never handed out by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds, as reported at issuance
    pub expires_in: u64,
}

/// Credential-based login request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub user_name: &'a str,
    pub password: &'a str,
}

/// Refresh-token exchange request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Token response from both the login and refresh routes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<TokenResponse> for Token {
    fn from(resp: TokenResponse) -> Self {
        Token {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in,
        }
    }
}

/// One cached token per username.
///
/// Exactly one renewal task exists per entry; replacing the entry aborts
/// the old task before the new one is spawned.
#[derive(Debug)]
pub(crate) struct TokenEntry {
    /// Password the token was obtained with; a mismatch on a later
    /// `get_token` call invalidates the entry
    pub password: String,
    pub token: Token,
    /// Monotonic issuance time of the current token
    pub issued_at: Instant,
    /// Consecutive renewal failures since the last success
    pub retry_count: u32,
    /// Increments every time the entry is (re)created; a renewal task that
    /// wakes up under a different generation exits silently
    pub generation: u64,
    pub renewal: tokio::task::JoinHandle<()>,
}

impl Drop for TokenEntry {
    fn drop(&mut self) {
        // No orphaned timers: the task dies with the entry.
        self.renewal.abort();
    }
}
