pub mod amendment;
pub mod application;
pub mod config;
pub mod decision;
pub mod error;
pub mod event;
pub mod io;
pub mod notify;
pub mod orchestrator;
pub mod paths;
pub mod registry;
pub mod store;
pub mod supplement;
pub mod transition;
pub mod types;

#[cfg(test)]
pub(crate) mod testkit;

pub use error::{Result, SyncError};
