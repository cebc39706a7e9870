//! Resilient external-call orchestration substrate.
//!
//! Everything in this crate wraps *somebody else's* unreliable work: remote
//! AI providers, the ML scoring microservice, the queue backing store. It is
//! deliberately small and has no opinion about what is being called.
//!
//! ## Components
//!
//! - `context`: per-call correlation scope (task-local, no parameter threading)
//! - `retry`: bounded retries with exponential backoff and jitter
//! - `fallback`: primary/secondary composition over the retry engine
//! - `timeout`: per-call deadline with cooperative cancellation

pub mod context;
pub mod fallback;
pub mod retry;
pub mod timeout;

pub use context::{current_correlation_id, with_correlation_id};
pub use fallback::{FallbackOutcome, execute_with_fallback, execute_with_fallback_policies};
pub use retry::RetryPolicy;
pub use timeout::with_timeout;
