//! Client side of the generation backend contract.
//!
//! Provides the HTTP API wrapper (generation requests, job status), the
//! push-channel message parser, the WebSocket client and the long-lived
//! [`channel::PushChannel`] that keeps one push connection alive and hands
//! job updates to a [`channel::JobUpdateSink`].

pub mod api;
pub mod channel;
pub mod client;
pub mod messages;
pub mod processor;
