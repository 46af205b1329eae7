//! Rolling-window circuit breaker for the generation client.
//!
//! Tracks the error percentage over a rolling window of recent calls. Once a
//! minimum call volume is reached and the error rate crosses the threshold,
//! the breaker opens and every call fails fast until the reset timeout
//! elapses. It then admits one half-open trial at a time: success closes the
//! breaker, failure reopens it, and a trial that never reports an outcome
//! frees the slot again after the reset timeout.
//!
//! State transitions are plain counter and flag updates behind a mutex;
//! every generation call in the process shares one breaker instance.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::ports::BreakerState;

/// Breaker tunables, sourced from `AiConfig`.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// How long the breaker stays open before admitting a trial call.
    pub reset_timeout: Duration,
    /// Error percentage (0..=100) at which the breaker opens.
    pub error_threshold_pct: u8,
    /// Minimum calls in the rolling window before the threshold applies.
    pub min_volume: u32,
    /// How far back call outcomes count toward the error rate.
    pub rolling_window: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            reset_timeout: Duration::from_secs(60),
            error_threshold_pct: 50,
            min_volume: 10,
            rolling_window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
enum Inner {
    Closed,
    Open { until: Instant },
    /// `trial_started` is the admission time of the outstanding trial call,
    /// `None` while the slot is free. A trial whose outcome never arrives
    /// (the caller was cancelled) releases the slot again after the reset
    /// timeout, so an abandoned trial cannot wedge the breaker.
    HalfOpen { trial_started: Option<Instant> },
}

#[derive(Debug)]
struct BreakerCore {
    inner: Inner,
    /// Recent call outcomes: (when, failed).
    outcomes: VecDeque<(Instant, bool)>,
}

/// Shared, process-wide circuit breaker.
#[derive(Debug)]
pub struct RollingBreaker {
    config: BreakerConfig,
    core: Mutex<BreakerCore>,
}

impl RollingBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            core: Mutex::new(BreakerCore {
                inner: Inner::Closed,
                outcomes: VecDeque::new(),
            }),
        }
    }

    /// Current state, advancing Open to HalfOpen if the reset timeout has
    /// elapsed.
    pub fn state(&self) -> BreakerState {
        let mut core = self.lock();
        self.advance(&mut core);
        match core.inner {
            Inner::Closed => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    /// Whether a call may proceed. In half-open state one caller at a time
    /// holds the trial slot; the slot is freed by the trial's outcome, or by
    /// the reset timeout if the outcome never arrives.
    pub fn should_allow(&self) -> bool {
        let now = Instant::now();
        let mut core = self.lock();
        self.advance(&mut core);
        match &mut core.inner {
            Inner::Closed => true,
            Inner::Open { .. } => false,
            Inner::HalfOpen { trial_started } => match trial_started {
                Some(at) if now.duration_since(*at) < self.config.reset_timeout => false,
                _ => {
                    *trial_started = Some(now);
                    true
                }
            },
        }
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let mut core = self.lock();
        match core.inner {
            Inner::HalfOpen { .. } => {
                info!("generation circuit breaker closed, provider healthy again");
                core.inner = Inner::Closed;
                core.outcomes.clear();
            }
            _ => {
                let now = Instant::now();
                core.outcomes.push_back((now, false));
                self.prune(&mut core, now);
            }
        }
    }

    /// Records a failed call, opening the breaker when the rolling error
    /// rate crosses the threshold at sufficient volume.
    pub fn record_failure(&self) {
        let mut core = self.lock();
        match core.inner {
            Inner::HalfOpen { .. } => {
                warn!("generation circuit breaker trial failed, reopening");
                core.inner = Inner::Open {
                    until: Instant::now() + self.config.reset_timeout,
                };
            }
            _ => {
                let now = Instant::now();
                core.outcomes.push_back((now, true));
                self.prune(&mut core, now);

                let total = core.outcomes.len() as u32;
                let failures = core.outcomes.iter().filter(|(_, failed)| *failed).count() as u32;
                if total >= self.config.min_volume
                    && failures * 100 >= u32::from(self.config.error_threshold_pct) * total
                {
                    error!(
                        failures,
                        total, "generation circuit breaker opened, rejecting calls"
                    );
                    core.inner = Inner::Open {
                        until: now + self.config.reset_timeout,
                    };
                    core.outcomes.clear();
                }
            }
        }
    }

    fn advance(&self, core: &mut BreakerCore) {
        if let Inner::Open { until } = core.inner {
            if Instant::now() >= until {
                warn!("generation circuit breaker half-open, probing provider");
                core.inner = Inner::HalfOpen {
                    trial_started: None,
                };
            }
        }
    }

    fn prune(&self, core: &mut BreakerCore, now: Instant) {
        while let Some((at, _)) = core.outcomes.front() {
            if now.duration_since(*at) > self.config.rolling_window {
                core.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerCore> {
        // A poisoned lock means a panic mid-update; the counters are simple
        // enough that continuing with the last state is safe.
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BreakerConfig {
        BreakerConfig {
            reset_timeout: Duration::from_millis(50),
            error_threshold_pct: 50,
            min_volume: 3,
            rolling_window: Duration::from_secs(60),
        }
    }

    #[test]
    fn starts_closed_and_allows_calls() {
        let breaker = RollingBreaker::new(fast_config());
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.should_allow());
    }

    #[test]
    fn stays_closed_below_minimum_volume() {
        let breaker = RollingBreaker::new(fast_config());
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn opens_after_threshold_at_volume_then_rejects() {
        let breaker = RollingBreaker::new(fast_config());
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.should_allow());
    }

    #[test]
    fn successes_keep_error_rate_below_threshold() {
        let breaker = RollingBreaker::new(fast_config());
        breaker.record_success();
        breaker.record_success();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_admits_exactly_one_trial() {
        let breaker = RollingBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.should_allow());
        assert!(!breaker.should_allow());
    }

    #[test]
    fn trial_success_closes_the_breaker() {
        let breaker = RollingBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.should_allow());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.should_allow());
    }

    #[test]
    fn abandoned_trial_frees_the_slot_after_reset_timeout() {
        let breaker = RollingBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        // Take the trial slot and never record an outcome, as a caller
        // cancelled mid-call would.
        assert!(breaker.should_allow());
        assert!(!breaker.should_allow());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.should_allow());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn trial_failure_reopens_the_breaker() {
        let breaker = RollingBreaker::new(fast_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.should_allow());
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.should_allow());
    }
}
