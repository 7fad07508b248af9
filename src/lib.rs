//! Builds Gaffer operation chains from the selections on a query page and
//! routes the results back into the application.

pub mod chain;
pub mod client;
pub mod coercion;
pub mod config;
pub mod controller;
pub mod descriptor;
mod error;
pub mod filter;
pub mod logging;
pub mod operation;
pub mod stores;
pub mod view;

pub use controller::{Collaborators, ExecuteOutcome, SubmissionController, SubmissionState};
pub use error::{BuildError, ConfigError, QueryError, QueryResult};
pub use gaffer_chain::{ChainServiceError, OperationChain};
