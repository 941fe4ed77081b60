//! MMKG Core Library
//!
//! Codelist loading, relationship synthesis, complexity analysis and
//! hypothesis checks for the CPRD multimorbidity knowledge graph.

pub mod complexity;
pub mod condition;
pub mod config;
pub mod dataset;
pub mod document;
pub mod error;
pub mod hypothesis;
pub mod relationship;
pub mod validation;

pub use config::DataConfig;
pub use dataset::Dataset;
pub use error::{MmkgError, MmkgResult};
