//! Shared types for the discount workspace
//!
//! Plain data models used by the discount engine and by anything that reads
//! its tables. Database derives are gated behind the `db` feature.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
