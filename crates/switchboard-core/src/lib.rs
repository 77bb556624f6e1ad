pub mod catalog;
pub mod command;
pub mod config;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod record;
pub mod runner;
pub mod schema;
pub mod store;

pub use error::{Result, SwitchboardError};
