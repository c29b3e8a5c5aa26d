//! Gateway: HTTP surface for the media tool.
//!
//! Two routes on one port: `GET /health` (unauthenticated version probe) and
//! `POST /execute` (Basic auth, validated argv, tool output as JSON).

mod protocol;
mod server;

pub use protocol::{ErrorResponse, ExecuteRequest, ExecuteResponse};
pub use server::{router, run_gateway, serve, GatewayState};
