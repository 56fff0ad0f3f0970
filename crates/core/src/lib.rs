//! Shared domain types for the SlidePilot relay.
//!
//! Identifiers, job status vocabulary, the page-context wire protocol,
//! persisted settings and backend address resolution.

pub mod backend_config;
pub mod error;
pub mod job;
pub mod messages;
pub mod settings;
pub mod types;
