// Token manager behavior tests
//
// These run on a paused tokio clock so renewal timers and token ages are
// driven deterministically, with a fake auth endpoint standing in for the
// vendor cloud.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{advance, sleep};

use easee_bridge::auth::{AuthEndpoint, Token, TokenManager};
use easee_bridge::error::CloudError;

const FAIL_FOREVER: u32 = u32::MAX;

/// Scriptable stand-in for the cloud auth endpoint.
///
/// Counts every call, mints a distinct token per issuance, and can be told
/// to fail the next N (or all) logins/refreshes.
struct FakeAuthEndpoint {
    login_calls: AtomicU32,
    refresh_calls: AtomicU32,
    serial: AtomicU32,
    expires_in: AtomicU64,
    login_delay_ms: AtomicU64,
    fail_logins: AtomicU32,
    fail_refreshes: AtomicU32,
}

impl FakeAuthEndpoint {
    fn new(expires_in: u64) -> Arc<Self> {
        Arc::new(Self {
            login_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            serial: AtomicU32::new(0),
            expires_in: AtomicU64::new(expires_in),
            login_delay_ms: AtomicU64::new(0),
            fail_logins: AtomicU32::new(0),
            fail_refreshes: AtomicU32::new(0),
        })
    }

    fn mint(&self, username: &str) -> Token {
        let n = self.serial.fetch_add(1, Ordering::SeqCst) + 1;
        Token {
            access_token: format!("access-{}-{}", username, n),
            refresh_token: format!("refresh-{}-{}", username, n),
            expires_in: self.expires_in.load(Ordering::SeqCst),
        }
    }

    fn should_fail(counter: &AtomicU32) -> bool {
        loop {
            let current = counter.load(Ordering::SeqCst);
            if current == 0 {
                return false;
            }
            if current == FAIL_FOREVER {
                return true;
            }
            if counter
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn logins(&self) -> u32 {
        self.login_calls.load(Ordering::SeqCst)
    }

    fn refreshes(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthEndpoint for FakeAuthEndpoint {
    async fn login(&self, username: &str, _password: &str) -> Result<Token, CloudError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.login_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            sleep(Duration::from_millis(delay)).await;
        }

        if Self::should_fail(&self.fail_logins) {
            return Err(CloudError::Api {
                status: 500,
                message: "login unavailable".to_string(),
            });
        }
        Ok(self.mint(username))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Token, CloudError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        if Self::should_fail(&self.fail_refreshes) {
            return Err(CloudError::Api {
                status: 503,
                message: "refresh unavailable".to_string(),
            });
        }
        Ok(self.mint("renewed"))
    }
}

const USER: &str = "user@example.com";
const PASSWORD: &str = "hunter2";

// N concurrent callers with the same credentials trigger exactly one login
// and all see the same token.
#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_login() {
    let endpoint = FakeAuthEndpoint::new(3600);
    endpoint.login_delay_ms.store(10, Ordering::SeqCst);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.get_token(USER, PASSWORD, false).await.unwrap()
        }));
    }

    let mut tokens = Vec::new();
    for handle in handles {
        tokens.push(handle.await.unwrap());
    }

    assert_eq!(endpoint.logins(), 1);
    assert_eq!(endpoint.refreshes(), 0);
    assert!(tokens.windows(2).all(|w| w[0] == w[1]));
}

// A changed password invalidates the cache and triggers a fresh login,
// never a refresh.
#[tokio::test(start_paused = true)]
async fn password_change_replaces_entry() {
    let endpoint = FakeAuthEndpoint::new(3600);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    let first = manager.get_token(USER, "old-password", false).await.unwrap();
    let second = manager.get_token(USER, "new-password", false).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(endpoint.logins(), 2);
    assert_eq!(endpoint.refreshes(), 0);

    // The new entry is now the cached one
    let third = manager.get_token(USER, "new-password", false).await.unwrap();
    assert_eq!(second, third);
    assert_eq!(endpoint.logins(), 2);
}

// A failed issuance propagates to the caller and leaves the previous entry
// untouched.
#[tokio::test(start_paused = true)]
async fn failed_login_keeps_previous_entry() {
    let endpoint = FakeAuthEndpoint::new(3600);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    let original = manager.get_token(USER, PASSWORD, false).await.unwrap();

    endpoint.fail_logins.store(1, Ordering::SeqCst);
    let err = manager.get_token(USER, "different", false).await.unwrap_err();
    assert!(matches!(err, CloudError::Api { status: 500, .. }));

    // Old credentials still hit the cache
    let cached = manager.get_token(USER, PASSWORD, false).await.unwrap();
    assert_eq!(original, cached);
    assert_eq!(endpoint.logins(), 2);
}

// Force refresh is throttled by the minimum token age.
#[tokio::test(start_paused = true)]
async fn force_refresh_respects_minimum_age() {
    let endpoint = FakeAuthEndpoint::new(3600);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    let first = manager.get_token(USER, PASSWORD, false).await.unwrap();

    // Too young: the force is ignored and the cached token comes back
    let second = manager.get_token(USER, PASSWORD, true).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(endpoint.logins(), 1);

    // Past the minimum age the force is honored
    advance(Duration::from_secs(121)).await;
    let third = manager.get_token(USER, PASSWORD, true).await.unwrap();
    assert_ne!(first, third);
    assert_eq!(endpoint.logins(), 2);
}

// The renewal timer fires at expires_in minus the margin, not before.
#[tokio::test(start_paused = true)]
async fn renewal_fires_at_margin_before_expiry() {
    let endpoint = FakeAuthEndpoint::new(300);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    manager.get_token(USER, PASSWORD, false).await.unwrap();

    // 300s lifetime, 120s margin: nothing happens before t=180
    sleep(Duration::from_secs(179)).await;
    assert_eq!(endpoint.refreshes(), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(endpoint.refreshes(), 1);
    assert_eq!(endpoint.logins(), 1);
}

// A lifetime shorter than the margin clamps the delay to zero and renews
// immediately.
#[tokio::test(start_paused = true)]
async fn short_lifetime_renews_immediately() {
    let endpoint = FakeAuthEndpoint::new(60);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    manager.get_token(USER, PASSWORD, false).await.unwrap();

    // The renewed token gets a normal lifetime again
    endpoint.expires_in.store(3600, Ordering::SeqCst);

    sleep(Duration::from_millis(5)).await;
    assert_eq!(endpoint.refreshes(), 1);
}

// After the retry budget is spent the timer stops for good, and a plain
// get_token still serves the stale cached token.
#[tokio::test(start_paused = true)]
async fn retry_exhaustion_stops_renewal_but_keeps_entry() {
    let endpoint = FakeAuthEndpoint::new(300);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    let original = manager.get_token(USER, PASSWORD, false).await.unwrap();

    endpoint.fail_refreshes.store(FAIL_FOREVER, Ordering::SeqCst);
    endpoint.fail_logins.store(FAIL_FOREVER, Ordering::SeqCst);

    // Attempts run at a fixed 180s interval; give all ten room to happen
    sleep(Duration::from_secs(180 * 10 + 10)).await;
    assert_eq!(endpoint.refreshes(), 10);
    assert_eq!(endpoint.logins(), 1 + 10);
    assert_eq!(manager.retry_count(USER).await, Some(10));
    assert_eq!(manager.renewal_stopped(USER).await, Some(true));

    // Terminal: no further cloud calls however long we wait
    sleep(Duration::from_secs(3600)).await;
    assert_eq!(endpoint.refreshes(), 10);
    assert_eq!(endpoint.logins(), 11);

    // The stale token is still served since the password matches
    let cached = manager.get_token(USER, PASSWORD, false).await.unwrap();
    assert_eq!(original, cached);
    assert_eq!(endpoint.logins(), 11);
}

// After exhaustion, an explicit force refresh re-arms renewal with a fresh
// entry.
#[tokio::test(start_paused = true)]
async fn force_refresh_resurrects_stopped_renewal() {
    let endpoint = FakeAuthEndpoint::new(300);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    manager.get_token(USER, PASSWORD, false).await.unwrap();

    endpoint.fail_refreshes.store(FAIL_FOREVER, Ordering::SeqCst);
    endpoint.fail_logins.store(FAIL_FOREVER, Ordering::SeqCst);
    sleep(Duration::from_secs(180 * 10 + 10)).await;
    assert_eq!(manager.renewal_stopped(USER).await, Some(true));

    // Cloud recovers
    endpoint.fail_refreshes.store(0, Ordering::SeqCst);
    endpoint.fail_logins.store(0, Ordering::SeqCst);

    let renewed = manager.get_token(USER, PASSWORD, true).await.unwrap();
    assert_eq!(manager.retry_count(USER).await, Some(0));
    assert_eq!(manager.renewal_stopped(USER).await, Some(false));

    // And the new timer is live again
    sleep(Duration::from_secs(181)).await;
    assert!(endpoint.refreshes() > 10);
    drop(renewed);
}

// A successful renewal resets the failure count and re-arms with the new
// lifetime.
#[tokio::test(start_paused = true)]
async fn renewal_success_resets_retry_count() {
    let endpoint = FakeAuthEndpoint::new(300);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    manager.get_token(USER, PASSWORD, false).await.unwrap();

    // Three double failures at t=180, 360, 540
    endpoint.fail_refreshes.store(3, Ordering::SeqCst);
    endpoint.fail_logins.store(3, Ordering::SeqCst);
    sleep(Duration::from_secs(180 * 3 + 5)).await;
    assert_eq!(manager.retry_count(USER).await, Some(3));
    assert_eq!(endpoint.refreshes(), 3);
    assert_eq!(endpoint.logins(), 4);

    // Fourth attempt at t=720 succeeds with a longer lifetime
    endpoint.expires_in.store(600, Ordering::SeqCst);
    sleep(Duration::from_secs(180)).await;
    assert_eq!(manager.retry_count(USER).await, Some(0));
    assert_eq!(endpoint.refreshes(), 4);

    // Re-armed from the new expiry: 600 - 120 = 480s after the success
    sleep(Duration::from_secs(470)).await;
    assert_eq!(endpoint.refreshes(), 4);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(endpoint.refreshes(), 5);
}

// Accounts do not interfere; each username gets its own entry, login and
// token.
#[tokio::test(start_paused = true)]
async fn accounts_are_isolated() {
    let endpoint = FakeAuthEndpoint::new(3600);
    endpoint.login_delay_ms.store(10, Ordering::SeqCst);
    let manager = Arc::new(TokenManager::new(Arc::clone(&endpoint)));

    let (alice, bob) = {
        let m1 = Arc::clone(&manager);
        let m2 = Arc::clone(&manager);
        tokio::join!(
            async move { m1.get_token("alice@example.com", "pw-a", false).await.unwrap() },
            async move { m2.get_token("bob@example.com", "pw-b", false).await.unwrap() },
        )
    };

    assert_eq!(endpoint.logins(), 2);
    assert!(alice.access_token.contains("alice@example.com"));
    assert!(bob.access_token.contains("bob@example.com"));
    assert_ne!(alice, bob);

    // Cached lookups stay per-account
    let alice_again = manager
        .get_token("alice@example.com", "pw-a", false)
        .await
        .unwrap();
    let bob_again = manager
        .get_token("bob@example.com", "pw-b", false)
        .await
        .unwrap();
    assert_eq!(alice, alice_again);
    assert_eq!(bob, bob_again);
    assert_eq!(endpoint.logins(), 2);
}
