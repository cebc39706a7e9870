//! `visage-scoring`
//!
//! **Responsibility:** client boundary to the remote ML scoring microservice.
//!
//! This crate owns nothing about what the scores *mean* — it turns image
//! bytes into a validated [`ScoreResult`] or a classified failure, applying
//! the bounded-timeout and retry discipline from `visage-resilience` on every
//! call.

pub mod client;
pub mod result;

pub use client::ScoringClient;
pub use result::ScoreResult;
