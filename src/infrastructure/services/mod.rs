//! Service layer

pub mod query_service;

pub use query_service::{QueryOutcome, QueryParams, QueryService, QueryServiceConfig};
