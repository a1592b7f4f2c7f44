/// Per-client request-rate governor
///
/// Resetting-window counter keyed by client identity: each key holds a
/// request count and a window start. When the window elapses the counter
/// resets; above the budget the request is throttled with HTTP 429.
///
/// State is service-owned and injected through the application context, not
/// ambient. Counter updates take a per-key mutex so concurrent requests for
/// the same client serialize on the point update while unrelated clients
/// proceed independently.
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::SakanError,
};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex, RwLock},
    time::{Duration, Instant},
};

/// Admission decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Throttled,
}

/// Per-client counter state
#[derive(Debug)]
struct WindowCounter {
    count: u32,
    window_start: Instant,
}

/// Request-rate governor
pub struct RateGovernor {
    clients: RwLock<HashMap<String, Arc<Mutex<WindowCounter>>>>,
    max_requests: u32,
    window: Duration,
}

impl RateGovernor {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Admit or throttle one request for the given client key
    pub fn admit(&self, client_key: &str) -> Admission {
        let counter = self.counter_for(client_key);
        let mut state = counter.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        if now.duration_since(state.window_start) > self.window {
            state.count = 0;
            state.window_start = now;
        }

        state.count += 1;

        if state.count > self.max_requests {
            Admission::Throttled
        } else {
            Admission::Allowed
        }
    }

    /// Fetch or create the counter entry for a key
    ///
    /// Read-lock fast path; the table write lock is held only to insert a
    /// new entry, never across a counter update.
    fn counter_for(&self, client_key: &str) -> Arc<Mutex<WindowCounter>> {
        if let Some(counter) = self
            .clients
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(client_key)
        {
            return Arc::clone(counter);
        }

        let mut clients = self
            .clients
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(clients.entry(client_key.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(WindowCounter {
                count: 0,
                window_start: Instant::now(),
            }))
        }))
    }
}

/// Rate limiting middleware
///
/// Keys on the authenticated subject when the bearer token validates, the
/// peer address otherwise, and a shared "unknown" bucket as the last resort.
/// Throttled requests are rejected with 429.
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, SakanError> {
    if !ctx.config.rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    let client_key = client_key(&ctx, &request);

    match ctx.rate_governor.admit(&client_key) {
        Admission::Allowed => Ok(next.run(request).await),
        Admission::Throttled => {
            tracing::warn!(client = %client_key, "rate limit exceeded");
            Err(SakanError::RateLimitExceeded {
                retry_after: Duration::from_secs(ctx.config.rate_limit.window_secs),
            })
        }
    }
}

/// Derive the client key for a request
fn client_key(ctx: &AppContext, request: &Request) -> String {
    if let Some(token) = crate::api::middleware::extract_bearer_token(request.headers()) {
        if let Ok(claims) = ctx.account_manager.validate_access_token(&token) {
            return format!("user_{}", claims.sub);
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_budget_is_allowed() {
        let governor = RateGovernor::new(100, Duration::from_secs(60));

        for _ in 0..100 {
            assert_eq!(governor.admit("client-a"), Admission::Allowed);
        }
    }

    #[test]
    fn test_throttles_above_budget() {
        let governor = RateGovernor::new(100, Duration::from_secs(60));

        let throttled = (0..150)
            .filter(|_| governor.admit("client-a") == Admission::Throttled)
            .count();

        assert_eq!(throttled, 50);
    }

    #[test]
    fn test_keys_are_independent() {
        let governor = RateGovernor::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert_eq!(governor.admit("client-a"), Admission::Allowed);
        }
        assert_eq!(governor.admit("client-a"), Admission::Throttled);
        // A different client still has its full budget
        assert_eq!(governor.admit("client-b"), Admission::Allowed);
    }

    #[test]
    fn test_window_reset_restores_budget() {
        let governor = RateGovernor::new(50, Duration::from_millis(40));

        for _ in 0..50 {
            assert_eq!(governor.admit("client-a"), Admission::Allowed);
        }

        std::thread::sleep(Duration::from_millis(60));

        let throttled = (0..50)
            .filter(|_| governor.admit("client-a") == Admission::Throttled)
            .count();
        assert_eq!(throttled, 0);
    }

    #[test]
    fn test_concurrent_admits_respect_budget() {
        let governor = Arc::new(RateGovernor::new(100, Duration::from_secs(60)));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let governor = Arc::clone(&governor);
                std::thread::spawn(move || {
                    (0..20)
                        .filter(|_| governor.admit("shared") == Admission::Allowed)
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 200 concurrent requests against a budget of 100
        assert_eq!(allowed, 100);
    }
}
