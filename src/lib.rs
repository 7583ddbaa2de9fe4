//! Edge Interdiction Service
//!
//! Screens every inbound HTTP request before it reaches the protected
//! application: hard-blocks known-bad paths and clients, tarpits scanners on
//! decoy resources, rate-limits per source address, and records every
//! decision in a queryable security event log.

pub mod api;
pub mod config;
pub mod core;
pub mod models;
pub mod utils;
