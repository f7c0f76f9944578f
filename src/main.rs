use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use easee_bridge::api::CloudApiClient;
use easee_bridge::auth::{HttpAuthEndpoint, TokenManager};
use easee_bridge::config::Config;
use easee_bridge::devices;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    tracing::info!("🔌 Easee Bridge starting...");
    tracing::info!("Cloud API: {}", config.api_base);

    // The auth endpoint's timeout bounds how long the token manager's
    // critical section can be held across a login.
    let auth_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.http_connect_timeout))
        .timeout(Duration::from_secs(config.http_request_timeout))
        .build()?;
    let endpoint = HttpAuthEndpoint::new(auth_client, config.api_base.clone());

    let token_manager = Arc::new(TokenManager::with_settings(
        endpoint,
        config.min_token_age,
        config.renewal_margin_secs,
        config.max_renewal_retries,
    ));

    // Verify the credentials before doing anything else
    match token_manager
        .get_token(&config.username, &config.password, false)
        .await
    {
        Ok(token) => {
            tracing::info!(
                "✅ Authentication successful (token expires in {}s)",
                token.expires_in
            );
        }
        Err(e) if e.is_auth_failure() => {
            anyhow::bail!("Login rejected, check EASEE_USERNAME/EASEE_PASSWORD: {}", e);
        }
        Err(e) => {
            tracing::warn!("⚠️  Cloud not reachable at startup, polling will retry: {}", e);
        }
    }

    let client = CloudApiClient::new(
        token_manager,
        config.api_base.clone(),
        config.username.clone(),
        config.password.clone(),
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
        config.http_max_retries,
    )?;

    loop {
        if let Err(e) = poll_once(&client).await {
            tracing::error!("Polling cycle failed: {}", e);
        }

        if config.once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(config.poll_interval)).await;
    }

    Ok(())
}

/// Poll every charger and equalizer on the account once and log the
/// capability values a host adapter would apply
async fn poll_once(client: &CloudApiClient<impl easee_bridge::auth::AuthEndpoint>) -> Result<()> {
    let chargers = client.chargers().await?;
    tracing::info!("Found {} charger(s)", chargers.len());

    for charger in &chargers {
        let (state, config) = futures::try_join!(
            client.charger_state(&charger.id),
            client.charger_config(&charger.id),
        )?;
        let updates = devices::charger::capabilities(&state, &config);

        tracing::info!(
            charger = %charger.id,
            name = charger.name.as_deref().unwrap_or("-"),
            "Charger state"
        );
        for update in updates {
            tracing::info!("  {} = {:?}", update.capability, update.value);
        }
    }

    let equalizers = client.equalizers().await?;
    tracing::info!("Found {} equalizer(s)", equalizers.len());

    for equalizer in &equalizers {
        let state = client.equalizer_state(&equalizer.id).await?;
        let updates = devices::equalizer::capabilities(&state);

        tracing::info!(
            equalizer = %equalizer.id,
            name = equalizer.name.as_deref().unwrap_or("-"),
            "Equalizer state"
        );
        for update in updates {
            tracing::info!("  {} = {:?}", update.capability, update.value);
        }
    }

    Ok(())
}
