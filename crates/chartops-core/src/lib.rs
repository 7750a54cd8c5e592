pub mod backend;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod credentials;
pub mod error;
pub mod helm;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod ports;
pub mod process;
pub mod types;
pub mod workspace;

pub use error::{ActionError, Result};
pub use orchestrator::Orchestrator;
