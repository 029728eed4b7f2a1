//! Client-side request pacing.
//!
//! Free-tier model endpoints reject bursts long before any daily quota runs
//! out. [`RateLimiter`] keeps a sliding 60-second window of request
//! timestamps per `provider-model` key and holds a caller back until both the
//! window has room and the minimum spacing since the previous request has
//! passed. [`RateLimitedClient`] applies it in front of any [`ModelClient`].

use async_trait::async_trait;
use bentofolio_config::RateLimitConfig;
use bentofolio_core::error::ProviderError;
use bentofolio_core::provider::{ChatRequest, ChatResponse, ModelClient};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 5;
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);

const WINDOW: Duration = Duration::from_secs(60);

/// Slack added when waiting for the oldest request to leave the window.
const WINDOW_SLACK: Duration = Duration::from_millis(100);

pub struct RateLimiter {
    requests_per_minute: u32,
    min_delay: Duration,
    model_overrides: HashMap<String, u32>,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_MIN_DELAY)
    }
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, min_delay: Duration) -> Self {
        Self {
            requests_per_minute: requests_per_minute.max(1),
            min_delay,
            model_overrides: HashMap::new(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let mut limiter = Self::new(
            config.requests_per_minute,
            Duration::from_millis(config.min_delay_ms),
        );
        for (model, rpm) in &config.models {
            limiter = limiter.with_model_limit(model.clone(), *rpm);
        }
        limiter
    }

    /// Override the requests-per-minute budget for one model.
    pub fn with_model_limit(mut self, model: impl Into<String>, requests_per_minute: u32) -> Self {
        self.model_overrides.insert(model.into(), requests_per_minute.max(1));
        self
    }

    pub fn limit_for(&self, model: &str) -> u32 {
        self.model_overrides
            .get(model)
            .copied()
            .unwrap_or(self.requests_per_minute)
    }

    /// Requests recorded for `key` inside the current window.
    pub fn in_window(&self, key: &str) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.get_mut(key).map_or(0, |window| {
            prune(window, now);
            window.len()
        })
    }

    /// How long a request for `key` would have to wait right now, or `None`
    /// if it may go immediately.
    fn wait_needed(&self, window: &mut VecDeque<Instant>, limit: u32, now: Instant) -> Option<Duration> {
        prune(window, now);

        if window.len() >= limit as usize
            && let Some(&oldest) = window.front()
        {
            return Some((oldest + WINDOW + WINDOW_SLACK).saturating_duration_since(now));
        }

        if let Some(&last) = window.back() {
            let since = now.saturating_duration_since(last);
            if since < self.min_delay {
                return Some(self.min_delay - since);
            }
        }

        None
    }

    /// Wait until a request for `model` under `key` is allowed, then record
    /// it. Returns the total time spent waiting.
    pub async fn acquire(&self, key: &str, model: &str) -> Duration {
        let limit = self.limit_for(model);
        let started = Instant::now();

        loop {
            let wait = {
                let now = Instant::now();
                let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
                let window = windows.entry(key.to_string()).or_default();
                match self.wait_needed(window, limit, now) {
                    Some(wait) => wait,
                    None => {
                        window.push_back(now);
                        break;
                    }
                }
            };

            if wait >= Duration::from_secs(1) {
                warn!(key, limit, wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            } else {
                debug!(key, wait_ms = wait.as_millis() as u64, "Spacing requests");
            }
            tokio::time::sleep(wait).await;
        }

        started.elapsed()
    }

    pub fn reset(&self) {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= WINDOW {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// A [`ModelClient`] that paces requests through a shared [`RateLimiter`].
pub struct RateLimitedClient {
    inner: Arc<dyn ModelClient>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedClient {
    pub fn new(inner: Arc<dyn ModelClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

#[async_trait]
impl ModelClient for RateLimitedClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let key = format!("{}-{}", self.inner.name(), request.model);
        self.limiter.acquire(&key, &request.model).await;
        self.inner.chat(request).await
    }
}
