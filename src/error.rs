// Error handling module
// Defines the cloud error taxonomy and structured response classification

use serde::Deserialize;
use thiserror::Error;

/// Machine-readable error code the vendor cloud returns when a login is
/// rejected because the username/password pair is wrong.
const INVALID_USER_PASSWORD: &str = "InvalidUserPassword";

/// Errors that can occur while talking to the vendor cloud
#[derive(Error, Debug)]
pub enum CloudError {
    /// Login rejected: wrong username or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The cloud rejected the request because we are calling too often
    #[error("Rate limited by the cloud API{}", retry_after_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// Transport-level failure: timeout, connection refused, decode error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-success response from the cloud API
    #[error("Cloud API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response from cloud API: {0}")]
    Decode(String),
}

fn retry_after_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

/// Structured error body the vendor cloud attaches to 4xx responses.
/// Older API routes use `errorCodeName`, newer ones `title`; both carry the
/// same machine-readable token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudErrorBody {
    pub error_code: Option<u32>,
    pub error_code_name: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
}

impl CloudErrorBody {
    fn code(&self) -> Option<&str> {
        self.error_code_name.as_deref().or(self.title.as_deref())
    }
}

impl CloudError {
    /// Classify a non-success HTTP response from the cloud.
    ///
    /// Invalid-credentials detection is structural: the decoded error body's
    /// code field is compared exactly against the known token, never by
    /// substring search in display text.
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 429 {
            let retry_after_secs = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("retryAfter").and_then(|r| r.as_u64()));
            return CloudError::RateLimited { retry_after_secs };
        }

        if let Ok(parsed) = serde_json::from_str::<CloudErrorBody>(body) {
            if parsed.code() == Some(INVALID_USER_PASSWORD) {
                return CloudError::InvalidCredentials;
            }
        }

        // Bare 401 means rejected credentials even when the body carries no
        // structured code.
        if status == 401 {
            return CloudError::InvalidCredentials;
        }

        CloudError::Api {
            status,
            message: body.to_string(),
        }
    }

    /// Whether a retry on the same schedule can reasonably succeed.
    /// Wrong credentials will not fix themselves; everything else might.
    pub fn is_transient(&self) -> bool {
        !matches!(self, CloudError::InvalidCredentials)
    }

    /// Whether the caller should surface a "needs re-authentication" state
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, CloudError::InvalidCredentials)
    }
}

/// Result type alias for cloud operations
pub type Result<T> = std::result::Result<T, CloudError>;
