//! The application stores and UI surfaces the submission controller reads and
//! drives. Each is a narrow capability; the UI owns the implementations.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    descriptor::{EdgeDirection, OperationDescriptor},
    operation::Operation,
    view::{DateRangeState, ViewState},
};

/// The query page: selected operation, edge direction and chain options
pub trait QueryPage: Send + Sync {
    fn selected_operation(&self) -> Option<OperationDescriptor>;
    fn direction(&self) -> EdgeDirection;
    fn operation_options(&self) -> Option<BTreeMap<String, String>>;
    fn reset(&self);
}

/// Seeds uploaded or typed by the user
pub trait SeedInput: Send + Sync {
    fn seeds(&self) -> Vec<Value>;
    fn reset(&self);
}

/// Groups, filters and named views chosen for the next query
pub trait ViewSelection: Send + Sync {
    fn current(&self) -> ViewState;
    fn reset(&self);
}

pub trait DateRange: Send + Sync {
    fn current(&self) -> DateRangeState;
    fn reset(&self);
}

pub trait Settings: Send + Sync {
    fn result_limit(&self) -> usize;
    /// Operation option keys the user may set, with their labels
    fn operation_option_keys(&self) -> BTreeMap<String, String>;
}

/// Operations the user has run, shown while they are still running
pub trait OperationHistory: Send + Sync {
    fn record(&self, operation: &Operation);
}

pub trait ResultsStore: Send + Sync {
    /// Replaces the stored results
    fn update(&self, results: Vec<Value>);
}

/// The graph canvas
pub trait GraphSelection: Send + Sync {
    fn deselect_all(&self);
}

pub trait Navigation: Send + Sync {
    fn go_to(&self, route: &str);
}

/// Query parameters of the current route, in memory and in the address bar
pub trait RouteParams: Send + Sync {
    fn clear(&self, name: &str);
}

pub trait LoadingIndicator: Send + Sync {
    fn load(&self);
    fn finish(&self);
}

/// Surfaces errors to the user
pub trait ErrorReporter: Send + Sync {
    fn handle(&self, label: &str, error: &(dyn std::error::Error + Send + Sync));
}

/// What the user picked in the result-limit warning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitWarningChoice {
    /// Show the truncated results anyway
    ShowResults,
    /// Stay on the query page
    ReturnToQuery,
}

impl From<&str> for LimitWarningChoice {
    fn from(command: &str) -> Self {
        match command {
            "results" => LimitWarningChoice::ShowResults,
            _ => LimitWarningChoice::ReturnToQuery,
        }
    }
}

/// The dialog warning that the result limit was reached
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultLimitPrompt: Send + Sync {
    async fn warn(&self, result_limit: usize) -> LimitWarningChoice;
}
