//! HTTP and websocket front end for a [`pulse`] live series.
//!
//! Observers connect to `/ws` and receive the full series as a JSON frame
//! every broadcast period. The UI directory is served at `/`.

pub mod api;
pub mod server;
pub mod transport;

pub use api::build_router;
pub use server::{ServerConfig, ServerError, bind, serve};
