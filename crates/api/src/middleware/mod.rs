//! Session extractors and request tracing.
//!
//! - [`session::Session`] -- resolves the `x-session-id` header to an open session.
//! - [`session::CsrfProtected`] -- a [`session::Session`] whose `x-csrf-token` matches.
//! - [`trace::make_request_span`] -- request spans with identifier path segments redacted.

pub mod session;
pub mod trace;
