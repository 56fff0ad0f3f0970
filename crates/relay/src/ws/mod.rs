//! Page-context WebSocket.
//!
//! Each connection is one page context: it sends generation requests and
//! receives acknowledgements plus job notifications.

mod handler;
mod heartbeat;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
