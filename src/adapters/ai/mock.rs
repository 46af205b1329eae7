//! Scriptable QuestionGenerator for tests.
//!
//! Honors the same static fast path as the real client, so the opening
//! question never counts as an external call. Everything else pops a
//! scripted result, falling back to a deterministic placeholder.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{CommandCatalog, Message};
use crate::ports::{BreakerState, GenerationError, GeneratorHealth, QuestionGenerator};

#[derive(Default)]
pub struct MockGenerator {
    catalog: CommandCatalog,
    questions: Mutex<VecDeque<Result<String, GenerationError>>>,
    summaries: Mutex<VecDeque<Result<String, GenerationError>>>,
    /// Number of calls that would have gone over the network.
    external_calls: AtomicU32,
    /// Simulated provider latency for non-static calls.
    delay: Mutex<Duration>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next scripted question outcome.
    pub fn push_question(&self, result: Result<String, GenerationError>) {
        self.questions
            .lock()
            .expect("mock lock")
            .push_back(result);
    }

    /// Queues the next scripted summary outcome.
    pub fn push_summary(&self, result: Result<String, GenerationError>) {
        self.summaries
            .lock()
            .expect("mock lock")
            .push_back(result);
    }

    /// How many generation calls reached the "network" layer.
    pub fn external_calls(&self) -> u32 {
        self.external_calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent non-static call take this long.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("mock lock") = delay;
    }

    async fn simulate_latency(&self) {
        let delay = *self.delay.lock().expect("mock lock");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl QuestionGenerator for MockGenerator {
    async fn generate_question(
        &self,
        _history: &[Message],
        question_number: u8,
    ) -> Result<String, GenerationError> {
        let command = self
            .catalog
            .get(question_number)
            .ok_or(GenerationError::CommandNotFound {
                number: question_number,
            })?;

        if let Some(text) = command.static_question {
            return Ok(text.to_string());
        }

        self.external_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.questions
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Mock question {question_number}?")))
    }

    async fn generate_summary(&self, _history: &[Message]) -> Result<String, GenerationError> {
        self.external_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.summaries
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| Ok("Mock summary.".to_string()))
    }

    async fn check_health(&self) -> GeneratorHealth {
        GeneratorHealth {
            ok: true,
            latency_ms: 0,
            error: None,
            circuit_open: false,
        }
    }

    fn breaker_state(&self) -> BreakerState {
        BreakerState::Closed
    }
}
