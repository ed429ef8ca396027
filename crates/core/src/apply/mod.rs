//! The apply wizard: state model, step forms, lifecycle and review gating.

pub mod children;
pub mod forms;
pub mod lifecycle;
pub mod review;
pub mod state;
pub mod steps;
