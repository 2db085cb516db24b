//! HTTP middleware

pub mod auth;
pub mod lifecycle;

pub use auth::require_api_key;
pub use lifecycle::track_requests;
