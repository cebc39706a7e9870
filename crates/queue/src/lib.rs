//! Background job queue with a supervised worker pool.
//!
//! ## Design
//!
//! - Job payloads are a tagged union keyed by job type — one variant per
//!   registered worker, nothing crosses the boundary as an untyped blob
//! - Redis-backed reliable-list store (claim into a processing list, ack on
//!   success, bounded redelivery, dead-letter after the cap)
//! - The supervisor is a single encapsulated state machine owned by the
//!   composition root: `Unconfigured -> Starting -> Running -> Draining ->
//!   Stopped`, with `StartFailed` terminal
//! - A missing backing-store address disables the subsystem instead of
//!   failing the host process
//! - Jobs carry the submitting call's correlation id; workers re-enter that
//!   scope before running the handler
//!
//! ## Components
//!
//! - `job`: `QueueJob`, `JobPayload`, `JobKind`
//! - `store`: `QueueStore` trait, Redis and in-memory implementations
//! - `supervisor`: worker pool lifecycle, health probe, shutdown draining

pub mod job;
pub mod store;
pub mod supervisor;

pub use job::{JobId, JobKind, JobPayload, QueueJob};
pub use store::{ClaimedJob, DeadLetterEntry, InMemoryQueueStore, QueueError, QueueStore, RedisQueueStore};
pub use supervisor::{JobHandler, QueueConfig, QueueHealth, QueueSupervisor, SupervisorState};
