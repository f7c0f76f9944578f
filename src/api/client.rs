// Authorized REST client for the vendor cloud

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthEndpoint, TokenManager};
use crate::error::CloudError;

use super::endpoints;
use super::models::{
    Charger, ChargerCommand, ChargerConfig, ChargerDetails, ChargerSettings, ChargerState,
    CircuitDynamicCurrent, Equalizer, EqualizerState,
};

/// REST client for one vendor account.
///
/// Every request carries a bearer token from the shared [`TokenManager`].
/// 401/403 responses trigger a single force-refresh of the token followed
/// by a retry; 429 and 5xx responses are retried with exponential backoff.
pub struct CloudApiClient<A: AuthEndpoint> {
    /// Shared HTTP client with connection pooling
    client: Client,

    token_manager: Arc<TokenManager<A>>,

    base_url: String,

    /// Account the client authorizes as
    username: String,
    password: String,

    /// Maximum number of retries per request
    max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: u64,
}

impl<A: AuthEndpoint> CloudApiClient<A> {
    pub fn new(
        token_manager: Arc<TokenManager<A>>,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        max_connections: usize,
        connect_timeout: u64,
        request_timeout: u64,
        max_retries: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            token_manager,
            base_url,
            username: username.into(),
            password: password.into(),
            max_retries,
            base_delay_ms: 1000,
        })
    }

    /// Override the backoff base, mainly to keep tests fast
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_backoff_base_ms(&mut self, base_delay_ms: u64) {
        self.base_delay_ms = base_delay_ms;
    }

    // Charger routes

    pub async fn chargers(&self) -> Result<Vec<Charger>, CloudError> {
        self.get_json(endpoints::chargers(&self.base_url)).await
    }

    pub async fn charger_state(&self, charger_id: &str) -> Result<ChargerState, CloudError> {
        self.get_json(endpoints::charger_state(&self.base_url, charger_id))
            .await
    }

    pub async fn charger_config(&self, charger_id: &str) -> Result<ChargerConfig, CloudError> {
        self.get_json(endpoints::charger_config(&self.base_url, charger_id))
            .await
    }

    pub async fn charger_details(&self, charger_id: &str) -> Result<ChargerDetails, CloudError> {
        self.get_json(endpoints::charger_details(&self.base_url, charger_id))
            .await
    }

    pub async fn send_command(
        &self,
        charger_id: &str,
        command: ChargerCommand,
    ) -> Result<(), CloudError> {
        tracing::info!(charger_id, command = command.as_str(), "Sending charger command");
        let url = endpoints::charger_command(&self.base_url, charger_id, command.as_str());
        self.send(Method::POST, &url, None).await?;
        Ok(())
    }

    pub async fn update_charger_settings(
        &self,
        charger_id: &str,
        settings: &ChargerSettings,
    ) -> Result<(), CloudError> {
        let url = endpoints::charger_settings(&self.base_url, charger_id);
        let body = serde_json::to_value(settings)
            .map_err(|e| CloudError::Decode(format!("settings body: {}", e)))?;
        self.send(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    pub async fn set_dynamic_circuit_current(
        &self,
        site_id: u64,
        circuit_id: u64,
        current: &CircuitDynamicCurrent,
    ) -> Result<(), CloudError> {
        let url = endpoints::circuit_settings(&self.base_url, site_id, circuit_id);
        let body = serde_json::to_value(current)
            .map_err(|e| CloudError::Decode(format!("circuit body: {}", e)))?;
        self.send(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    // Equalizer routes

    pub async fn equalizers(&self) -> Result<Vec<Equalizer>, CloudError> {
        self.get_json(endpoints::equalizers(&self.base_url)).await
    }

    pub async fn equalizer_state(&self, equalizer_id: &str) -> Result<EqualizerState, CloudError> {
        self.get_json(endpoints::equalizer_state(&self.base_url, equalizer_id))
            .await
    }

    // Transport

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, CloudError> {
        let response = self.send(Method::GET, &url, None).await?;
        response
            .json()
            .await
            .map_err(|e| CloudError::Decode(format!("{}: {}", url, e)))
    }

    /// Execute a request with token handling and retry logic
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, CloudError> {
        let mut force_refresh = false;
        let mut attempt = 0;

        loop {
            let token = self
                .token_manager
                .get_token(&self.username, &self.password, force_refresh)
                .await?;
            force_refresh = false;

            tracing::debug!(
                method = %method,
                url = %url,
                attempt = attempt + 1,
                "Sending HTTP request"
            );

            let mut request = self
                .client
                .request(method.clone(), url)
                .header("Authorization", format!("Bearer {}", token.access_token))
                .header("Accept", "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::debug!(status = %status, "Request successful");
                        return Ok(response);
                    }

                    match status {
                        // Token no longer accepted: refresh and retry once
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            if attempt < self.max_retries {
                                tracing::warn!(
                                    status = %status,
                                    "Token rejected, force-refreshing and retrying"
                                );
                                force_refresh = true;
                                attempt += 1;
                                continue;
                            }
                        }
                        // Throttled or upstream trouble: back off
                        s if s.as_u16() == 429 || s.is_server_error() => {
                            if attempt < self.max_retries {
                                let delay = self.backoff_delay(attempt);
                                tracing::warn!(
                                    status = %status,
                                    delay_ms = delay,
                                    attempt = attempt + 1,
                                    max_retries = self.max_retries,
                                    "Retrying after backoff"
                                );
                                tokio::time::sleep(Duration::from_millis(delay)).await;
                                attempt += 1;
                                continue;
                            }
                        }
                        _ => {}
                    }

                    let text = response.text().await.unwrap_or_default();
                    tracing::error!(
                        status = status.as_u16(),
                        url = %url,
                        response_body = %text,
                        "HTTP request failed with error response"
                    );
                    return Err(CloudError::from_response(status.as_u16(), &text));
                }

                Err(e) => {
                    if attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt);
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay,
                            attempt = attempt + 1,
                            "Request failed, retrying after backoff"
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(
                        error = %e,
                        url = %url,
                        total_attempts = attempt + 1,
                        "HTTP request failed after all retries"
                    );
                    return Err(CloudError::Network(e));
                }
            }
        }
    }

    /// Exponential backoff with jitter to avoid thundering herd
    fn backoff_delay(&self, attempt: u32) -> u64 {
        let delay = self.base_delay_ms * 2_u64.pow(attempt.min(6));
        let jitter = (delay as f64 * 0.1 * jitter::random()) as u64;
        delay + jitter
    }
}

// Simple random number generation for jitter
mod jitter {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hash, Hasher};

    pub fn random() -> f64 {
        let state = RandomState::new();
        let mut hasher = state.build_hasher();
        std::time::SystemTime::now().hash(&mut hasher);
        (hasher.finish() % 1000) as f64 / 1000.0
    }
}
