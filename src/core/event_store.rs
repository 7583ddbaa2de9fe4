//! Security event store for the edge interdiction service.
//!
//! This module keeps a bounded, insertion-ordered log of security events in
//! memory and derives the aggregate statistics served to the dashboard.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::classifier::Verdict;
use crate::core::monitoring::EVENT_STORE_SIZE;
use crate::models::EventStoreConfig;

/// Errors that can occur while reading the event store
#[derive(Error, Debug)]
pub enum EventStoreError {
    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

/// Event categories, serialized with the names the dashboard expects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    Honeypot,
    Attack,
    Php,
    RateLimit,
    SuspiciousAgent,
    BlockedPath,
    Legitimate,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Honeypot => "honeypot",
            EventCategory::Attack => "attack",
            EventCategory::Php => "php",
            EventCategory::RateLimit => "rateLimit",
            EventCategory::SuspiciousAgent => "suspiciousAgent",
            EventCategory::BlockedPath => "blockedPath",
            EventCategory::Legitimate => "legitimate",
        }
    }

    fn default_reason(self) -> &'static str {
        match self {
            EventCategory::Honeypot => "decoy resource requested",
            EventCategory::Attack => "attack pattern detected",
            EventCategory::Php => "unserved script resource requested",
            EventCategory::RateLimit => "rate limit exceeded",
            EventCategory::SuspiciousAgent => "suspicious user agent",
            EventCategory::BlockedPath => "blocked path",
            EventCategory::Legitimate => "blocked",
        }
    }
}

impl From<Verdict> for EventCategory {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Allow => EventCategory::Legitimate,
            Verdict::BlockPath => EventCategory::BlockedPath,
            Verdict::BlockAgent => EventCategory::SuspiciousAgent,
            Verdict::Honeypot => EventCategory::Honeypot,
            Verdict::ScriptCatchAll => EventCategory::Php,
            Verdict::AttackPattern => EventCategory::Attack,
        }
    }
}

/// What a caller hands to [`EventLog::record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEventInput {
    pub source_address: String,
    pub path: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub blocked: bool,
    pub category: EventCategory,
    pub reason: Option<String>,
}

impl SecurityEventInput {
    /// A request that was let through
    pub fn passed(
        source_address: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            source_address: source_address.into(),
            path: path.into(),
            method: method.into(),
            user_agent,
            blocked: false,
            category: EventCategory::Legitimate,
            reason: None,
        }
    }

    /// A request that was rejected or diverted
    pub fn blocked(
        source_address: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        user_agent: Option<String>,
        category: EventCategory,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_address: source_address.into(),
            path: path.into(),
            method: method.into(),
            user_agent,
            blocked: true,
            category,
            reason: Some(reason.into()),
        }
    }
}

/// Stored security event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityEvent {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub source_address: String,
    pub path: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub blocked: bool,
    pub category: EventCategory,
    pub reason: Option<String>,
}

/// Request count for one path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

/// Aggregate statistics over the retained events
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SecurityStats {
    pub total_attempts: u64,
    pub unique_sources: u64,
    pub last_hour: u64,
    pub top_paths: Vec<PathCount>,
}

/// Security event log.
///
/// Implemented in memory by [`EventStore`]; a shared external store can be
/// put behind the same interface.
#[cfg_attr(test, mockall::automock)]
pub trait EventLog: Send + Sync {
    /// Assign id and timestamp and append the event
    fn record(&self, input: SecurityEventInput) -> SecurityEvent;

    /// Up to `limit` events, newest first
    fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, EventStoreError>;

    /// Aggregate statistics relative to `now`
    fn stats(&self, now: DateTime<Utc>) -> Result<SecurityStats, EventStoreError>;

    /// Drop every retained event; the id sequence keeps counting
    fn clear(&self);
}

struct Inner {
    events: VecDeque<SecurityEvent>,
    next_id: u64,
}

/// Bounded in-memory ring buffer of security events
pub struct EventStore {
    config: EventStoreConfig,
    inner: RwLock<Inner>,
}

impl EventStore {
    /// Create a new event store instance
    pub fn new(config: EventStoreConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            config: EventStoreConfig {
                capacity,
                ..config
            },
            inner: RwLock::new(Inner {
                events: VecDeque::with_capacity(capacity.min(1024)),
                next_id: 1,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLog for EventStore {
    fn record(&self, input: SecurityEventInput) -> SecurityEvent {
        let reason = match input.reason {
            None if input.blocked => Some(input.category.default_reason().to_string()),
            reason => reason,
        };

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let event = SecurityEvent {
            id: inner.next_id,
            timestamp: Utc::now(),
            source_address: input.source_address,
            path: input.path,
            method: input.method,
            user_agent: input.user_agent,
            blocked: input.blocked,
            category: input.category,
            reason,
        };
        inner.next_id += 1;

        while inner.events.len() >= self.config.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(event.clone());
        metrics::gauge!(EVENT_STORE_SIZE, inner.events.len() as f64);

        event
    }

    fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, EventStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;
        Ok(inner.events.iter().rev().take(limit).cloned().collect())
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<SecurityStats, EventStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;

        let hour_ago = now - Duration::hours(1);
        let mut sources = HashSet::new();
        let mut last_hour = 0;
        // path -> (count, position of first appearance)
        let mut paths: HashMap<&str, (u64, usize)> = HashMap::new();

        for (position, event) in inner.events.iter().enumerate() {
            sources.insert(event.source_address.as_str());
            if event.timestamp >= hour_ago {
                last_hour += 1;
            }
            paths.entry(event.path.as_str()).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(&str, u64, usize)> = paths
            .into_iter()
            .map(|(path, (count, first_seen))| (path, count, first_seen))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        Ok(SecurityStats {
            total_attempts: inner.events.len() as u64,
            unique_sources: sources.len() as u64,
            last_hour,
            top_paths: ranked
                .into_iter()
                .take(self.config.top_paths_limit)
                .map(|(path, count, _)| PathCount {
                    path: path.to_string(),
                    count,
                })
                .collect(),
        })
    }

    fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.events.clear();
        metrics::gauge!(EVENT_STORE_SIZE, 0.0);
    }
}
