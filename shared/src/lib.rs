//! Shared types for fanfetch: error taxonomy, status model, and the task group
//! used to fan status messages back into the coordinator.
pub mod errors;
pub mod models;
pub mod task_group;
