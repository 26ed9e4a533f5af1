// Public fallible APIs in this crate share one concrete error contract (`SpapiError`).
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod client;
pub mod config;
pub mod error;
pub mod fight;
pub mod metric;
pub mod path;
pub mod query;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::{GraphqlClient, RemoteQueryClient};
pub use config::AppConfig;
pub use error::{Result, SpapiError};
pub use fight::{FightIdentity, FightResult, Report};
pub use metric::{DamageBreakdown, MetricDefinition, MetricSet};
pub use query::QueryRequest;
pub use report::ReportOrchestrator;
