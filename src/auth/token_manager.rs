// Token lifecycle manager
// Account-keyed token cache with serialized issuance and background renewal

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::CloudError;

use super::endpoint::AuthEndpoint;
use super::types::{Token, TokenEntry};

/// A force refresh is ignored while the cached token is younger than this
pub const MIN_TOKEN_AGE: Duration = Duration::from_secs(120);

/// The renewal timer fires this many seconds before the token expires
pub const RENEWAL_MARGIN_SECS: u64 = 120;

/// Consecutive renewal failures tolerated before the timer gives up
pub const MAX_RENEWAL_RETRIES: u32 = 10;

/// Process-wide token cache shared by every device talking to the same
/// vendor cloud. Cloning shares the underlying cache.
///
/// One async mutex guards the whole username-to-entry map, and it is held
/// across the awaited auth call. That serializes issuance across accounts,
/// which is the intended trade: two concurrent callers for the same
/// username can never race a duplicate login or clobber a just-issued
/// entry, because the second caller only runs after the first has cached
/// its result.
pub struct TokenManager<A: AuthEndpoint> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    endpoint: A,

    /// All cached tokens, one entry per username
    entries: Mutex<HashMap<String, TokenEntry>>,

    /// Source of entry generations; a renewal task only ever touches the
    /// generation it was armed for
    generations: AtomicU64,

    min_token_age: Duration,
    renewal_margin_secs: u64,
    max_renewal_retries: u32,
}

impl<A: AuthEndpoint> TokenManager<A> {
    /// Create a manager with the production timing constants
    pub fn new(endpoint: A) -> Self {
        Self::with_settings(
            endpoint,
            MIN_TOKEN_AGE,
            RENEWAL_MARGIN_SECS,
            MAX_RENEWAL_RETRIES,
        )
    }

    /// Create a manager with explicit timing settings
    pub fn with_settings(
        endpoint: A,
        min_token_age: Duration,
        renewal_margin_secs: u64,
        max_renewal_retries: u32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint,
                entries: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
                min_token_age,
                renewal_margin_secs,
                max_renewal_retries,
            }),
        }
    }

    /// Get a valid bearer token for the given account.
    ///
    /// Returns the cached token when the stored password still matches,
    /// performs a credential login otherwise. With `force_refresh` a new
    /// login is performed early, unless the cached token is younger than
    /// the minimum age, in which case the force is ignored and the cached
    /// token is returned unchanged.
    ///
    /// The whole decision runs under the cache mutex, so a token is never
    /// handed out while an issuance for the same username is in flight.
    /// Login failures propagate to the caller and leave any previously
    /// cached entry untouched.
    pub async fn get_token(
        &self,
        username: &str,
        password: &str,
        force_refresh: bool,
    ) -> Result<Token, CloudError> {
        let mut entries = self.inner.entries.lock().await;

        // Decide first, then act, so the cached borrow never overlaps the
        // map mutation in `issue`.
        let cached = match entries.get(username) {
            Some(entry) if entry.password == password => {
                if force_refresh {
                    let age = entry.issued_at.elapsed();
                    if age > self.inner.min_token_age {
                        tracing::info!(
                            username,
                            age_secs = age.as_secs(),
                            "Force refresh accepted, issuing a new token"
                        );
                        None
                    } else {
                        tracing::debug!(
                            username,
                            age_secs = age.as_secs(),
                            "Force refresh ignored: cached token is younger than the minimum age"
                        );
                        Some(entry.token.clone())
                    }
                } else {
                    Some(entry.token.clone())
                }
            }
            Some(_) => {
                tracing::info!(username, "Stored password no longer matches, logging in again");
                None
            }
            None => {
                tracing::debug!(username, "No cached token, logging in");
                None
            }
        };

        match cached {
            Some(token) => Ok(token),
            None => self.issue(&mut entries, username, password).await,
        }
    }

    /// Perform a credential login and replace the cache entry.
    /// Must be called with the cache mutex held.
    async fn issue(
        &self,
        entries: &mut HashMap<String, TokenEntry>,
        username: &str,
        password: &str,
    ) -> Result<Token, CloudError> {
        let token = self.inner.endpoint.login(username, password).await?;

        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let renewal = self.spawn_renewal(username.to_string(), generation, token.expires_in);

        let entry = TokenEntry {
            password: password.to_string(),
            token: token.clone(),
            issued_at: Instant::now(),
            retry_count: 0,
            generation,
            renewal,
        };

        // Dropping a replaced entry aborts its renewal task.
        if entries.insert(username.to_string(), entry).is_some() {
            tracing::debug!(username, "Replaced cached token entry and cancelled its timer");
        }

        tracing::info!(
            username,
            expires_in = token.expires_in,
            "Token issued and renewal timer armed"
        );
        Ok(token)
    }

    /// Arm the background renewal loop for one cache entry.
    ///
    /// The task sleeps until shortly before expiry, then renews the entry
    /// under the same cache mutex as `get_token`. A refresh-token exchange
    /// is tried first, then a credential login as fallback. Failures keep
    /// the originally armed interval (fixed-interval retry, no backoff)
    /// until the retry budget is spent, at which point the task exits and
    /// the entry stays cached but inert. No error ever escapes the task.
    fn spawn_renewal(&self, username: String, generation: u64, expires_in: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let mut interval = inner.renewal_delay(expires_in);

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let mut entries = inner.entries.lock().await;
                let Some(entry) = entries.get_mut(&username) else {
                    return;
                };
                // A foreground issuance replaced this entry while we were
                // waiting on the mutex; the new entry has its own timer.
                if entry.generation != generation {
                    return;
                }

                match inner.renew(&username, entry).await {
                    Ok(new_expires_in) => {
                        interval = inner.renewal_delay(new_expires_in);
                    }
                    Err(()) => {
                        if entry.retry_count >= inner.max_renewal_retries {
                            tracing::error!(
                                username = %username,
                                retries = entry.retry_count,
                                "Renewal retries exhausted; token stays cached but will no longer auto-renew"
                            );
                            return;
                        }
                    }
                }
            }
        })
    }

    /// Current consecutive-failure count for an account's renewal timer
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn retry_count(&self, username: &str) -> Option<u32> {
        let entries = self.inner.entries.lock().await;
        entries.get(username).map(|e| e.retry_count)
    }

    /// Whether the renewal task for an account has terminated
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn renewal_stopped(&self, username: &str) -> Option<bool> {
        let entries = self.inner.entries.lock().await;
        entries.get(username).map(|e| e.renewal.is_finished())
    }
}

impl<A: AuthEndpoint> Clone for TokenManager<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AuthEndpoint> Inner<A> {
    /// Seconds until the renewal timer should fire for a token with the
    /// given lifetime: `expires_in` minus the margin, clamped at zero
    fn renewal_delay(&self, expires_in: u64) -> Duration {
        Duration::from_secs(expires_in.saturating_sub(self.renewal_margin_secs))
    }

    /// One renewal attempt: refresh exchange, then credential fallback.
    /// Updates the entry in place; returns the new token lifetime on
    /// success so the caller can re-arm the interval.
    async fn renew(&self, username: &str, entry: &mut TokenEntry) -> Result<u64, ()> {
        tracing::debug!(username, "Renewing token in the background");

        let renewed = match self.endpoint.refresh(&entry.token.refresh_token).await {
            Ok(token) => Ok(token),
            Err(e) => {
                tracing::warn!(
                    username,
                    error = %e,
                    "Refresh-token exchange failed, falling back to credential login"
                );
                self.endpoint.login(username, &entry.password).await
            }
        };

        match renewed {
            Ok(token) => {
                let expires_in = token.expires_in;
                entry.token = token;
                entry.issued_at = Instant::now();
                entry.retry_count = 0;
                tracing::info!(username, expires_in, "Token renewed");
                Ok(expires_in)
            }
            Err(e) => {
                entry.retry_count += 1;
                tracing::warn!(
                    username,
                    retry_count = entry.retry_count,
                    error = %e,
                    "Token renewal failed"
                );
                Err(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverCalled;

    #[async_trait::async_trait]
    impl AuthEndpoint for NeverCalled {
        async fn login(&self, _username: &str, _password: &str) -> Result<Token, CloudError> {
            panic!("login must not be called");
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<Token, CloudError> {
            panic!("refresh must not be called");
        }
    }

    #[test]
    fn test_renewal_delay_clamps_at_zero() {
        let manager = TokenManager::new(NeverCalled);

        assert_eq!(manager.inner.renewal_delay(3600), Duration::from_secs(3480));
        assert_eq!(manager.inner.renewal_delay(120), Duration::from_secs(0));
        assert_eq!(manager.inner.renewal_delay(30), Duration::from_secs(0));
        assert_eq!(manager.inner.renewal_delay(0), Duration::from_secs(0));
    }

    #[test]
    fn test_renewal_delay_with_custom_margin() {
        let manager = TokenManager::with_settings(NeverCalled, Duration::from_secs(10), 60, 3);

        assert_eq!(manager.inner.renewal_delay(3600), Duration::from_secs(3540));
        assert_eq!(manager.inner.renewal_delay(59), Duration::from_secs(0));
    }
}
