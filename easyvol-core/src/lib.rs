//! easyvol-core: shared foundations for the EasyVol backend
//!
//! Holds the pieces every other crate needs: configuration loading,
//! the module/action permission model, and the print template engine.

pub mod config;
pub mod permissions;
pub mod template;

pub use config::EasyvolConfig;
pub use permissions::{Action, Module, PermissionSet};
