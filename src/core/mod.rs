//! Core functionality for the edge interdiction service.
//!
//! This module contains the core components of the service: request
//! classification, rate limiting, the security event store, honeypot
//! responses, and monitoring.

pub mod classifier;
pub mod event_store;
pub mod honeypot;
pub mod monitoring;
pub mod rate_limiter;

pub use classifier::{Classification, Classifier, ClassifierError, RequestDescriptor, Verdict};
pub use event_store::{
    EventCategory, EventLog, EventStore, EventStoreError, PathCount, SecurityEvent,
    SecurityEventInput, SecurityStats,
};
pub use honeypot::{DecoyResponse, HoneypotResponder};
pub use rate_limiter::{RateLimitDecision, RateLimiter, RequestCounter};
