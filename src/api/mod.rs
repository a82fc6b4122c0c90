//! HTTP API surface

pub mod cache;
pub mod context;
pub mod server;

pub use server::{run_api_server, AppState};
