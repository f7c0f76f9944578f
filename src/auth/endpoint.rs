// Cloud auth endpoint
// HTTP calls exchanging credentials or a refresh token for a token pair

use async_trait::async_trait;
use reqwest::Client;

use crate::error::CloudError;

use super::types::{LoginRequest, RefreshRequest, Token, TokenResponse};

/// The vendor's token-issuing service.
///
/// Abstracted behind a trait so the token manager can be driven by a fake
/// in tests; production code uses [`HttpAuthEndpoint`].
#[async_trait]
pub trait AuthEndpoint: Send + Sync + 'static {
    /// Credential-based issuance ("login")
    async fn login(&self, username: &str, password: &str) -> Result<Token, CloudError>;

    /// Refresh-token exchange
    async fn refresh(&self, refresh_token: &str) -> Result<Token, CloudError>;
}

#[async_trait]
impl<T: AuthEndpoint + ?Sized> AuthEndpoint for std::sync::Arc<T> {
    async fn login(&self, username: &str, password: &str) -> Result<Token, CloudError> {
        (**self).login(username, password).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Token, CloudError> {
        (**self).refresh(refresh_token).await
    }
}

/// Auth endpoint talking to the real vendor cloud over HTTPS
pub struct HttpAuthEndpoint {
    client: Client,
    base_url: String,
}

impl HttpAuthEndpoint {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn login_url(&self) -> String {
        format!("{}/accounts/login", self.base_url)
    }

    fn refresh_url(&self) -> String {
        format!("{}/accounts/refresh_token", self.base_url)
    }

    async fn exchange<B: serde::Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Token, CloudError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CloudError::from_response(status.as_u16(), &text));
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| CloudError::Decode(format!("token response: {}", e)))?;

        if data.access_token.is_empty() {
            return Err(CloudError::Decode(
                "token response is missing accessToken".to_string(),
            ));
        }

        Ok(data.into())
    }
}

#[async_trait]
impl AuthEndpoint for HttpAuthEndpoint {
    async fn login(&self, username: &str, password: &str) -> Result<Token, CloudError> {
        tracing::debug!(username, "Requesting new token pair via login");
        let request = LoginRequest {
            user_name: username,
            password,
        };
        self.exchange(&self.login_url(), &request).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Token, CloudError> {
        tracing::debug!("Exchanging refresh token for a new token pair");
        let request = RefreshRequest { refresh_token };
        self.exchange(&self.refresh_url(), &request).await
    }
}
