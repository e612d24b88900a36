//! HTTP surface: error mapping, extractors, routes, server setup

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;
