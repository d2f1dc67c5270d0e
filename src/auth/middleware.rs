use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::{extract_bearer_token, AuthError, AuthService};

/// Resolves the bearer token into a `UserSession` extension.
pub async fn jwt_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeaderFormat)?;

    let session = auth_service.validate_session(extract_bearer_token(header)?).await?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn security_headers_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        axum::http::header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    )
}

#[derive(Debug, Default)]
struct HitLog {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl HitLog {
    fn prune(recent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while recent
            .front()
            .is_some_and(|&oldest| now.duration_since(oldest) >= window)
        {
            recent.pop_front();
        }
    }

    /// Forget every client with no hit inside the window.
    fn sweep(&mut self, now: Instant, window: Duration) {
        self.clients.retain(|_, recent| {
            Self::prune(recent, now, window);
            !recent.is_empty()
        });
        self.last_sweep = Some(now);
    }
}

/// Sliding-window limiter: at most `max_requests` per client inside `window`.
/// Idle clients are swept out at most once per window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    hits: Arc<Mutex<HitLog>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HitLog::default())),
            max_requests,
            window,
        }
    }

    /// Records a hit, or returns how long the client has to wait.
    pub fn try_acquire(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let mut log = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let sweep_due = log
            .last_sweep
            .map_or(true, |last| now.duration_since(last) >= self.window);
        if sweep_due {
            log.sweep(now, self.window);
        }

        let recent = log.clients.entry(client.to_string()).or_default();
        HitLog::prune(recent, now, self.window);

        if recent.len() >= self.max_requests {
            let wait = recent
                .front()
                .map(|&oldest| self.window.saturating_sub(now.duration_since(oldest)))
                .unwrap_or(self.window);
            return Err(wait);
        }

        recent.push_back(now);
        Ok(())
    }

    pub fn cleanup_old_entries(&self, now: Instant) {
        let mut log = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log.sweep(now, self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clients
            .len()
    }
}

/// First hop of `x-forwarded-for`, else `x-real-ip`.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let client = client_key(request.headers());

    if let Err(wait) = limiter.try_acquire(&client, Instant::now()) {
        tracing::warn!(client = %client, "Auth rate limit exceeded");
        return Err(AuthError::RateLimitExceeded {
            retry_after_secs: wait.as_secs().max(1),
        });
    }

    Ok(next.run(request).await)
}
