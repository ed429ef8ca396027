//! Dental benefit apply wizard API server library.
//!
//! Exposes the building blocks (config, state, sessions, error handling,
//! routes) so integration tests and the binary entrypoint can both access
//! them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod navigation;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
