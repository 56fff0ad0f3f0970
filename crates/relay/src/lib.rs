//! SlidePilot relay library.
//!
//! Exposes the relay core (subscription registry, poll fallback,
//! dispatcher), the page-context WebSocket infrastructure and the HTTP
//! routes so integration tests and the binary entrypoint can both use them.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod poller;
pub mod registry;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
