//! easyvol-server: the EasyVol HTTP backend
//!
//! Every endpoint follows the same shape: authenticate, resolve a
//! permission, run a query through a thin repository, return JSON or
//! stream a file.

pub mod auth;
pub mod db;
pub mod download;
pub mod export;
pub mod http;
pub mod models;
pub mod print;
pub mod state;

pub use http::server::{run_server, ServerError};
pub use state::AppState;
