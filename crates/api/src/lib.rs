//! Community management API server library.
//!
//! Exposes the building blocks (config, state, error handling, the request
//! lifecycle service, routes, WebSocket hub, background jobs) so integration
//! tests and the binary entrypoint share them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
