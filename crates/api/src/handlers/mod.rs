//! HTTP handlers, grouped by resource.

pub mod apply;
pub mod client_application;
pub mod sessions;
