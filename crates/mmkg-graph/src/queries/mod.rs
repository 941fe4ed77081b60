//! Read-only graph reports.
//!
//! Typed wrappers over [`AggregateQuery`](crate::repository::AggregateQuery)
//! so callers never deal with raw rows.

pub mod report;
pub mod stats;

pub use report::{
    condition_neighbourhood, demo_report, CrossSystemTally, DemoReport, HubDisease, Neighbour, PatientBurden,
    Progression, StrongPattern,
};
pub use stats::{graph_statistics, GraphStatistics};
