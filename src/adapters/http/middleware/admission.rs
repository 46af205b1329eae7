//! Admission control for the response-submission endpoint.
//!
//! Two independent gates, both rejecting rather than queuing:
//! - a per-caller fixed-window rate limiter (429 on excess), and
//! - a global concurrency cap (503 once saturated), whose slot is released
//!   when the in-flight request finishes for any reason, including a client
//!   disconnect (the permit lives in the request future and drops with it).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::config::LimitsConfig;
use crate::domain::UserId;

use super::identity::CallerIdentity;

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Shared admission-control state for the submission route.
#[derive(Clone)]
pub struct AdmissionControl {
    window: Duration,
    max_requests: u32,
    windows: Arc<Mutex<HashMap<UserId, Window>>>,
    permits: Arc<Semaphore>,
}

impl AdmissionControl {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            window: Duration::from_secs(limits.rate_window_secs),
            max_requests: limits.rate_max_requests,
            windows: Arc::new(Mutex::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(limits.max_concurrent_submissions as usize)),
        }
    }

    /// Fixed-window check for one caller. Returns whether the request is
    /// admitted.
    pub fn admit(&self, user_id: UserId) -> bool {
        let now = Instant::now();
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        match windows.get_mut(&user_id) {
            Some(window) if now < window.reset_at => {
                if window.count >= self.max_requests {
                    return false;
                }
                window.count += 1;
                true
            }
            _ => {
                windows.insert(
                    user_id,
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
        }
    }

    /// Tries to take an in-flight slot without waiting.
    pub fn try_acquire_slot(&self) -> Option<tokio::sync::OwnedSemaphorePermit> {
        self.permits.clone().try_acquire_owned().ok()
    }
}

/// Middleware applying both gates to the submission route.
pub async fn admission_middleware(
    State(control): State<AdmissionControl>,
    request: Request,
    next: Next,
) -> Response {
    // Unidentified requests fall through to the 401 in the handler chain.
    if let Some(CallerIdentity(user_id)) = request.extensions().get::<CallerIdentity>().copied() {
        if !control.admit(user_id) {
            warn!(user_id = %user_id, "submission rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Too many requests" })),
            )
                .into_response();
        }
    }

    let Some(_permit) = control.try_acquire_slot() else {
        warn!("submission concurrency limit saturated");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Server busy" })),
        )
            .into_response();
    };

    // The permit drops when this future completes or is dropped on
    // disconnect, releasing the slot either way.
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(max_requests: u32, max_concurrent: u32) -> AdmissionControl {
        AdmissionControl::new(&LimitsConfig {
            rate_window_secs: 60,
            rate_max_requests: max_requests,
            max_concurrent_submissions: max_concurrent,
            ..LimitsConfig::default()
        })
    }

    #[test]
    fn rate_limit_is_per_caller() {
        let control = control(2, 4);
        let alice = UserId::new();
        let bob = UserId::new();

        assert!(control.admit(alice));
        assert!(control.admit(alice));
        assert!(!control.admit(alice));
        // A different caller has their own window.
        assert!(control.admit(bob));
    }

    #[test]
    fn window_resets_after_expiry() {
        let control = AdmissionControl::new(&LimitsConfig {
            rate_window_secs: 1,
            rate_max_requests: 1,
            ..LimitsConfig::default()
        });
        // Shrink the window directly rather than sleeping a full second.
        let user = UserId::new();
        assert!(control.admit(user));
        assert!(!control.admit(user));
        control
            .windows
            .lock()
            .unwrap()
            .get_mut(&user)
            .unwrap()
            .reset_at = Instant::now() - Duration::from_millis(1);
        assert!(control.admit(user));
    }

    #[tokio::test]
    async fn concurrency_slots_are_bounded_and_released_on_drop() {
        let control = control(100, 2);
        let first = control.try_acquire_slot().unwrap();
        let second = control.try_acquire_slot().unwrap();
        assert!(control.try_acquire_slot().is_none());

        drop(first);
        let third = control.try_acquire_slot().unwrap();
        drop(second);
        drop(third);
        assert!(control.try_acquire_slot().is_some());
    }
}
