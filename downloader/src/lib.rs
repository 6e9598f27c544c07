//! fanfetch: fetch a list of URLs concurrently under one shared deadline,
//! write each body to its own file, and report one status line per URL.
pub mod config;
pub mod coordinator;
pub mod deadline;
pub mod fetch;
pub mod naming;
pub mod progress;

pub use config::Config;
pub use coordinator::{Coordinator, RunReport, COMPLETION_LINE};
