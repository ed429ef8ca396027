pub mod apply;
pub mod clock;
pub mod error;
pub mod mapping;
pub mod session_store;
pub mod types;
