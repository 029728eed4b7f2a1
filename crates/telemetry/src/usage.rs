//! Daily and per-minute quota tracking.
//!
//! Daily counters are kept per model and reset when the UTC date changes.
//! Per-minute token counts use a sliding 60-second window shared by all
//! models. The daily counters can be persisted to a JSON file so a restart
//! on the same day keeps its budget.

use crate::TelemetryError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Share of any daily limit above which a soft warning is raised.
pub const WARN_PERCENT: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLimit {
    pub requests: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinuteLimit {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

pub const MINUTE_LIMIT: MinuteLimit = MinuteLimit {
    input_tokens: 8_000,
    output_tokens: 4_000,
};

/// Free-tier daily limits for a model id.
pub fn daily_limit(model: &str) -> DailyLimit {
    match model {
        "gpt-4o" => DailyLimit { requests: 50, input_tokens: 200_000, output_tokens: 50_000 },
        "gpt-4o-mini" | "llama-3.3-70b" | "phi-4-mini" => DailyLimit {
            requests: 150,
            input_tokens: 600_000,
            output_tokens: 200_000,
        },
        _ => DailyLimit { requests: 100, input_tokens: 400_000, output_tokens: 150_000 },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCounters {
    pub requests: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

fn percent(used: u64, limit: u64) -> u32 {
    if limit == 0 {
        return 100;
    }
    ((used as f64 / limit as f64) * 100.0).round() as u32
}

/// Daily usage for one model against its limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub model: String,
    pub used: DailyCounters,
    pub limit: DailyLimit,
}

impl DailyUsage {
    pub fn requests_remaining(&self) -> u32 {
        self.limit.requests.saturating_sub(self.used.requests)
    }

    pub fn has_requests_left(&self) -> bool {
        self.used.requests < self.limit.requests
    }

    pub fn percent_requests(&self) -> u32 {
        percent(self.used.requests.into(), self.limit.requests.into())
    }

    pub fn percent_input(&self) -> u32 {
        percent(self.used.input_tokens, self.limit.input_tokens)
    }

    pub fn percent_output(&self) -> u32 {
        percent(self.used.output_tokens, self.limit.output_tokens)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinuteUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Outcome of a pre-flight quota check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitCheck {
    pub allowed: bool,
    /// Limits the request would break.
    pub exceeded: Vec<String>,
    /// Limits above the soft threshold.
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedUsage {
    date: Option<NaiveDate>,
    #[serde(default)]
    models: BTreeMap<String, DailyCounters>,
}

#[derive(Debug)]
struct TrackerInner {
    date: NaiveDate,
    daily: BTreeMap<String, DailyCounters>,
    minute: VecDeque<(DateTime<Utc>, u64, u64)>,
}

impl TrackerInner {
    fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.date {
            debug!(from = %self.date, to = %today, "Daily usage reset");
            self.date = today;
            self.daily.clear();
        }
        let cutoff = now - Duration::seconds(60);
        while self.minute.front().is_some_and(|(at, _, _)| *at < cutoff) {
            self.minute.pop_front();
        }
    }

    fn minute_usage(&self) -> MinuteUsage {
        self.minute.iter().fold(MinuteUsage::default(), |acc, (_, i, o)| MinuteUsage {
            input_tokens: acc.input_tokens + i,
            output_tokens: acc.output_tokens + o,
        })
    }

    fn daily_usage(&self, model: &str) -> DailyUsage {
        DailyUsage {
            model: model.to_string(),
            used: self.daily.get(model).copied().unwrap_or_default(),
            limit: daily_limit(model),
        }
    }
}

/// Thread-safe usage tracker.
#[derive(Debug)]
pub struct UsageTracker {
    inner: Mutex<TrackerInner>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                date: Utc::now().date_naive(),
                daily: BTreeMap::new(),
                minute: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Recording ─────────────────────────────────────────────────────

    pub fn record_request(&self, model: &str) {
        self.record_request_at(model, Utc::now());
    }

    pub fn record_request_at(&self, model: &str, now: DateTime<Utc>) {
        let mut inner = self.lock();
        inner.roll_over(now);
        inner.daily.entry(model.to_string()).or_default().requests += 1;
    }

    pub fn record_tokens(&self, model: &str, input: u64, output: u64) {
        self.record_tokens_at(model, input, output, Utc::now());
    }

    pub fn record_tokens_at(&self, model: &str, input: u64, output: u64, now: DateTime<Utc>) {
        let mut inner = self.lock();
        inner.roll_over(now);
        let counters = inner.daily.entry(model.to_string()).or_default();
        counters.input_tokens += input;
        counters.output_tokens += output;
        inner.minute.push_back((now, input, output));
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn daily_usage(&self, model: &str) -> DailyUsage {
        self.daily_usage_at(model, Utc::now())
    }

    pub fn daily_usage_at(&self, model: &str, now: DateTime<Utc>) -> DailyUsage {
        let mut inner = self.lock();
        inner.roll_over(now);
        inner.daily_usage(model)
    }

    pub fn minute_usage(&self) -> MinuteUsage {
        let mut inner = self.lock();
        inner.roll_over(Utc::now());
        inner.minute_usage()
    }

    /// Every model with recorded usage today.
    pub fn report(&self) -> Vec<DailyUsage> {
        let mut inner = self.lock();
        inner.roll_over(Utc::now());
        inner.daily.keys().map(|m| inner.daily_usage(m)).collect()
    }

    pub fn check_limits(&self, model: &str, input: u64, output: u64) -> LimitCheck {
        self.check_limits_at(model, input, output, Utc::now())
    }

    /// Would a request with these estimates stay inside every limit?
    ///
    /// An exhausted daily request budget short-circuits; otherwise every
    /// breached limit and every soft warning is reported.
    pub fn check_limits_at(
        &self,
        model: &str,
        input: u64,
        output: u64,
        now: DateTime<Utc>,
    ) -> LimitCheck {
        let (daily, minute) = {
            let mut inner = self.lock();
            inner.roll_over(now);
            (inner.daily_usage(model), inner.minute_usage())
        };

        let mut check = LimitCheck::default();
        if !daily.has_requests_left() {
            check
                .exceeded
                .push(format!("Daily request limit ({}) exceeded for {model}", daily.limit.requests));
            return check;
        }

        if daily.used.input_tokens + input > daily.limit.input_tokens {
            check.exceeded.push(format!("Daily input token limit exceeded for {model}"));
        }
        if daily.used.output_tokens + output > daily.limit.output_tokens {
            check.exceeded.push(format!("Daily output token limit exceeded for {model}"));
        }
        if minute.input_tokens + input > MINUTE_LIMIT.input_tokens {
            check.exceeded.push(format!(
                "Per-minute input token limit ({}) would be exceeded",
                MINUTE_LIMIT.input_tokens
            ));
        }
        if minute.output_tokens + output > MINUTE_LIMIT.output_tokens {
            check.exceeded.push(format!(
                "Per-minute output token limit ({}) would be exceeded",
                MINUTE_LIMIT.output_tokens
            ));
        }

        for (label, pct) in [
            ("requests", daily.percent_requests()),
            ("input tokens", daily.percent_input()),
            ("output tokens", daily.percent_output()),
        ] {
            if pct > WARN_PERCENT {
                check.warnings.push(format!("Daily {label} at {pct}% capacity"));
            }
        }

        check.allowed = check.exceeded.is_empty();
        if !check.allowed {
            warn!(model, exceeded = ?check.exceeded, "Quota check failed");
        }
        check
    }

    pub fn reset_daily(&self, model: Option<&str>) {
        let mut inner = self.lock();
        match model {
            Some(m) => {
                inner.daily.remove(m);
            }
            None => inner.daily.clear(),
        }
    }

    // ── Persistence ───────────────────────────────────────────────────

    /// Load persisted daily counters. A missing file or a file from an
    /// earlier day yields a fresh tracker.
    pub fn load(path: &Path) -> Result<Self, TelemetryError> {
        let tracker = Self::new();
        if !path.exists() {
            return Ok(tracker);
        }
        let raw = std::fs::read_to_string(path)?;
        let persisted: PersistedUsage = serde_json::from_str(&raw)?;
        {
            let mut inner = tracker.lock();
            if persisted.date == Some(inner.date) {
                inner.daily = persisted.models;
            } else {
                debug!(path = %path.display(), "Discarding usage from an earlier day");
            }
        }
        Ok(tracker)
    }

    pub fn save(&self, path: &Path) -> Result<(), TelemetryError> {
        let persisted = {
            let inner = self.lock();
            PersistedUsage { date: Some(inner.date), models: inner.daily.clone() }
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&persisted)?)?;
        Ok(())
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}
