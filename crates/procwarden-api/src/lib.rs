//! # procwarden API
//!
//! Thin HTTP dispatch layer over [`procwarden_daemon::DaemonManager`].
//!
//! ```text
//! GET  /                  list daemons
//! POST /                  create a daemon (form or JSON: key, cmd, dir)
//! GET  /{key}             one daemon
//! ANY  /{key}/start       start
//! ANY  /{key}/stop        pause
//! ANY  /{key}/continue    resume
//! ANY  /{key}/kill        kill
//! GET  /healthz           liveness
//! ```

pub mod error;
pub mod http;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use http::routes::create_router;
pub use server::ApiServer;
pub use state::AppState;
