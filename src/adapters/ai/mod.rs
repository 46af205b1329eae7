//! Generation client adapters: the OpenAI-compatible provider, its circuit
//! breaker, and a scriptable mock for tests.

pub mod circuit_breaker;
pub mod error_class;
pub mod mock;
pub mod openai_client;
pub mod prompts;

pub use circuit_breaker::{BreakerConfig, RollingBreaker};
pub use error_class::{classify, ErrorClass};
pub use mock::MockGenerator;
pub use openai_client::{OpenAiGenerator, OpenAiSettings};
