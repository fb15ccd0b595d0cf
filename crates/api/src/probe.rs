//! Container health probe.
//!
//! A probe is a plain `GET` against the liveness endpoint. Any HTTP answer,
//! error statuses included, counts as reachable; only a connection failure or
//! timeout counts against the service. [`HealthTracker`] applies the
//! orchestrator's schedule on top: failures during the start period are
//! ignored, and `retries` consecutive failures afterwards mark the service
//! unhealthy.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_HEALTH_URL: &str = "http://localhost:8000/health";

/// Probe schedule and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub url: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub start_period: Duration,
    pub retries: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_HEALTH_URL.to_string(),
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            start_period: Duration::from_secs(30),
            retries: 3,
        }
    }
}

/// Result of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered; the status code is informational only.
    Reachable { status: u16 },
    Unreachable { reason: String },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }
}

/// Performs a single probe.
pub async fn probe_once(client: &reqwest::Client, settings: &ProbeSettings) -> ProbeOutcome {
    match client
        .get(&settings.url)
        .timeout(settings.timeout)
        .send()
        .await
    {
        Ok(response) => ProbeOutcome::Reachable {
            status: response.status().as_u16(),
        },
        Err(err) => ProbeOutcome::Unreachable {
            reason: err.to_string(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HealthState::Starting => "starting",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        })
    }
}

/// Folds probe outcomes into a health state.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    start_period: Duration,
    retries: u32,
    state: HealthState,
    failing_streak: u32,
}

impl HealthTracker {
    pub fn new(settings: &ProbeSettings) -> Self {
        Self {
            start_period: settings.start_period,
            retries: settings.retries.max(1),
            state: HealthState::Starting,
            failing_streak: 0,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn failing_streak(&self) -> u32 {
        self.failing_streak
    }

    /// Records an outcome observed `since_start` after the service started.
    ///
    /// Returns the new state when it changed.
    pub fn record(&mut self, outcome: &ProbeOutcome, since_start: Duration) -> Option<HealthState> {
        let previous = self.state;

        if outcome.is_reachable() {
            self.failing_streak = 0;
            self.state = HealthState::Healthy;
        } else if since_start >= self.start_period {
            self.failing_streak += 1;
            if self.failing_streak >= self.retries {
                self.state = HealthState::Unhealthy;
            }
        }

        (self.state != previous).then_some(self.state)
    }
}

/// Probes on the configured schedule forever, logging every state change.
pub async fn run_monitor(client: reqwest::Client, settings: ProbeSettings) {
    let started = Instant::now();
    let mut tracker = HealthTracker::new(&settings);
    let mut ticker = tokio::time::interval_at(started + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        url = %settings.url,
        interval_secs = settings.interval.as_secs(),
        retries = settings.retries,
        "health monitor started"
    );

    loop {
        ticker.tick().await;
        let outcome = probe_once(&client, &settings).await;
        match &outcome {
            ProbeOutcome::Reachable { status } => tracing::debug!(status, "probe reachable"),
            ProbeOutcome::Unreachable { reason } => {
                tracing::warn!(%reason, streak = tracker.failing_streak() + 1, "probe failed")
            }
        }

        if let Some(state) = tracker.record(&outcome, started.elapsed()) {
            match state {
                HealthState::Unhealthy => tracing::error!(%state, "service health changed"),
                _ => tracing::info!(%state, "service health changed"),
            }
        }
    }
}
