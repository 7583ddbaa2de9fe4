//! Request classifier for the edge interdiction service.
//!
//! This module maps a request descriptor to a verdict using a fixed-priority
//! decision table built from configuration. It has no side effects: callers
//! record events and apply decoy delays.

use regex::RegexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ClassifierConfig;

/// Errors raised while building a classifier from configuration
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("empty entry at index {index} in `{list}`")]
    EmptyEntry { list: &'static str, index: usize },
    #[error("`script_suffix` must not be empty")]
    EmptySuffix,
    #[error("invalid attack pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Classifier decision for a single request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    /// No rule matched
    Allow,
    /// Path contains a deny-listed substring
    BlockPath,
    /// User agent contains a suspicious substring
    BlockAgent,
    /// Path is one of the configured decoy resources
    Honeypot,
    /// Path ends with a scripting suffix the service never runs
    ScriptCatchAll,
    /// Path matches an attack-pattern regex
    AttackPattern,
}

impl Verdict {
    /// Whether the request is rejected without delay
    pub fn is_fast_block(self) -> bool {
        matches!(self, Verdict::BlockPath | Verdict::BlockAgent)
    }
}

/// The fields of an inbound request the rules consult
#[derive(Debug, Clone, Copy)]
pub struct RequestDescriptor<'a> {
    pub path: &'a str,
    pub method: &'a str,
    pub user_agent: Option<&'a str>,
}

impl<'a> RequestDescriptor<'a> {
    pub fn new(path: &'a str, method: &'a str, user_agent: Option<&'a str>) -> Self {
        Self {
            path,
            method,
            user_agent,
        }
    }

    fn is_read(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") || self.method.eq_ignore_ascii_case("HEAD")
    }

    fn is_post(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST")
    }
}

/// Verdict plus the reason it was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub reason: Option<String>,
}

impl Classification {
    fn allow() -> Self {
        Self {
            verdict: Verdict::Allow,
            reason: None,
        }
    }

    fn matched(verdict: Verdict, reason: String) -> Self {
        Self {
            verdict,
            reason: Some(reason),
        }
    }
}

/// Compiled decision table.
///
/// Rules are evaluated in this order, first match wins:
///
/// 1. deny-listed path substrings (case-insensitive) → [`Verdict::BlockPath`]
/// 2. suspicious user-agent substrings (case-insensitive) → [`Verdict::BlockAgent`]
/// 3. exact decoy paths for the request method → [`Verdict::Honeypot`]
/// 4. GET/HEAD paths ending with the scripting suffix → [`Verdict::ScriptCatchAll`]
/// 5. GET/HEAD paths matching an attack regex → [`Verdict::AttackPattern`]
/// 6. otherwise [`Verdict::Allow`]
#[derive(Debug, Clone)]
pub struct Classifier {
    blocked_paths: Vec<String>,
    suspicious_agents: Vec<String>,
    decoy_get_paths: Vec<String>,
    decoy_post_paths: Vec<String>,
    script_suffix: String,
    attack_patterns: RegexSet,
}

impl Classifier {
    /// Build a classifier, rejecting empty entries and invalid regexes
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let script_suffix = config.script_suffix.trim().to_lowercase();
        if script_suffix.is_empty() {
            return Err(ClassifierError::EmptySuffix);
        }

        Ok(Self {
            blocked_paths: lowered("blocked_path_substrings", &config.blocked_path_substrings)?,
            suspicious_agents: lowered(
                "suspicious_agent_substrings",
                &config.suspicious_agent_substrings,
            )?,
            decoy_get_paths: decoy_paths("decoy_get_paths", &config.decoy_get_paths)?,
            decoy_post_paths: decoy_paths("decoy_post_paths", &config.decoy_post_paths)?,
            script_suffix,
            attack_patterns: compile_patterns(&config.attack_patterns)?,
        })
    }

    /// Classify one request
    pub fn classify(&self, request: &RequestDescriptor<'_>) -> Classification {
        let path = request.path.to_lowercase();

        if let Some(hit) = self.blocked_paths.iter().find(|s| path.contains(s.as_str())) {
            return Classification::matched(
                Verdict::BlockPath,
                format!("path matched deny-list entry '{}'", hit),
            );
        }

        if let Some(agent) = request.user_agent {
            let agent = agent.to_lowercase();
            if let Some(hit) = self
                .suspicious_agents
                .iter()
                .find(|s| agent.contains(s.as_str()))
            {
                return Classification::matched(
                    Verdict::BlockAgent,
                    format!("user agent matched suspicious signature '{}'", hit),
                );
            }
        }

        let normalized = normalize_route(&path);
        let decoys = if request.is_read() {
            Some(&self.decoy_get_paths)
        } else if request.is_post() {
            Some(&self.decoy_post_paths)
        } else {
            None
        };
        if decoys.is_some_and(|list| list.iter().any(|d| d == normalized)) {
            return Classification::matched(
                Verdict::Honeypot,
                format!("decoy resource {} {}", request.method, request.path),
            );
        }

        if !request.is_read() {
            return Classification::allow();
        }

        if path.ends_with(&self.script_suffix) {
            return Classification::matched(
                Verdict::ScriptCatchAll,
                format!("request for unserved '{}' resource", self.script_suffix),
            );
        }

        if let Some(index) = self.attack_patterns.matches(request.path).iter().next() {
            return Classification::matched(
                Verdict::AttackPattern,
                format!(
                    "path matched attack pattern '{}'",
                    self.attack_patterns.patterns()[index]
                ),
            );
        }

        Classification::allow()
    }
}

fn lowered(list: &'static str, entries: &[String]) -> Result<Vec<String>, ClassifierError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry = entry.trim();
            if entry.is_empty() {
                Err(ClassifierError::EmptyEntry { list, index })
            } else {
                Ok(entry.to_lowercase())
            }
        })
        .collect()
}

fn decoy_paths(list: &'static str, entries: &[String]) -> Result<Vec<String>, ClassifierError> {
    Ok(lowered(list, entries)?
        .into_iter()
        .map(|p| normalize_route(&p).to_string())
        .collect())
}

fn compile_patterns(patterns: &[String]) -> Result<RegexSet, ClassifierError> {
    if let Some(index) = patterns.iter().position(|p| p.trim().is_empty()) {
        return Err(ClassifierError::EmptyEntry {
            list: "attack_patterns",
            index,
        });
    }
    Ok(RegexSet::new(patterns)?)
}

/// Routes match with or without a single trailing slash.
fn normalize_route(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}
