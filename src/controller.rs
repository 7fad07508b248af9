//! Runs one execute action end to end: snapshot the stores, build the chain,
//! submit it, then commit or hold the results behind the limit warning.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use gaffer_chain::OperationChain;
use serde_json::Value;
use tower::{Service, ServiceExt};

use crate::{
    chain::{assemble_chain, OperationFactory, SettingsOperationFactory},
    coercion::{TypeRegistry, ValueCoercion},
    config::TimeConfig,
    descriptor::OperationDescriptor,
    error::{BuildError, QueryResult},
    operation::{Operation, OperationBuilder, QuerySnapshot},
    stores::{
        DateRange, ErrorReporter, GraphSelection, LimitWarningChoice, LoadingIndicator,
        Navigation, OperationHistory, QueryPage, ResultLimitPrompt, ResultsStore, RouteParams,
        SeedInput, Settings, ViewSelection,
    },
};

/// Label reported alongside transport failures
pub const EXECUTE_ERROR_LABEL: &str = "Error executing operation";
/// Route showing the results graph
pub const RESULTS_ROUTE: &str = "graph";
/// Route query parameter holding seeds passed in by link
pub const INPUT_QUERY_PARAM: &str = "input";

/// Where the controller is in a submission
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    /// A chain has been submitted and has not answered yet
    InFlight,
    /// Results hit the limit and the user has not chosen what to do
    AwaitingConfirmation,
}

/// What became of one call to [`SubmissionController::execute`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The form was invalid or a submission was already running
    Skipped,
    /// Results were written to the results store
    Committed { count: usize },
    /// Results hit the limit and the user went back to the query
    Declined { count: usize },
    /// The transport failed; the failure went to the error reporter
    Failed,
}

/// Everything the controller reads from or drives
#[derive(Clone)]
pub struct Collaborators {
    pub query_page: Arc<dyn QueryPage>,
    pub seeds: Arc<dyn SeedInput>,
    pub view: Arc<dyn ViewSelection>,
    pub date_range: Arc<dyn DateRange>,
    pub settings: Arc<dyn Settings>,
    pub history: Arc<dyn OperationHistory>,
    pub results: Arc<dyn ResultsStore>,
    pub graph: Arc<dyn GraphSelection>,
    pub navigation: Arc<dyn Navigation>,
    pub route: Arc<dyn RouteParams>,
    pub loading: Arc<dyn LoadingIndicator>,
    pub errors: Arc<dyn ErrorReporter>,
    pub prompt: Arc<dyn ResultLimitPrompt>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Returns the controller to [`SubmissionState::Idle`] when dropped, however
/// the submission ended
struct InFlight<'a> {
    state: &'a Mutex<SubmissionState>,
}

impl InFlight<'_> {
    fn set(&self, state: SubmissionState) {
        *lock(self.state) = state;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set(SubmissionState::Idle);
    }
}

fn lock(state: &Mutex<SubmissionState>) -> MutexGuard<'_, SubmissionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Turns an execute action into an operation chain and routes its results.
///
/// At most one submission runs at a time; an execute action while one is
/// running is skipped, not queued.
pub struct SubmissionController<S> {
    service: S,
    stores: Collaborators,
    coercion: Arc<dyn ValueCoercion>,
    operation_factory: Arc<dyn OperationFactory>,
    time: Option<TimeConfig>,
    state: Mutex<SubmissionState>,
}

impl<S> SubmissionController<S>
where
    S: Service<OperationChain, Response = Vec<Value>> + Clone + Send,
    S::Future: Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    /// Creates a controller coercing values with the default [`TypeRegistry`]
    /// and reading the result limit from `stores.settings`
    pub fn new(service: S, stores: Collaborators, time: Option<TimeConfig>) -> Self {
        let operation_factory = Arc::new(SettingsOperationFactory::new(stores.settings.clone()));
        SubmissionController {
            service,
            stores,
            coercion: Arc::new(TypeRegistry::default()),
            operation_factory,
            time,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn with_coercion(mut self, coercion: Arc<dyn ValueCoercion>) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_operation_factory(mut self, operation_factory: Arc<dyn OperationFactory>) -> Self {
        self.operation_factory = operation_factory;
        self
    }

    pub fn state(&self) -> SubmissionState {
        *lock(&self.state)
    }

    /// Whether an execute action would go ahead right now
    pub fn can_execute(&self, form_valid: bool) -> bool {
        form_valid && self.state() == SubmissionState::Idle
    }

    /// Whether there are operation options for the user to fill in
    pub fn has_operation_options(&self) -> bool {
        !self.stores.settings.operation_option_keys().is_empty()
    }

    pub fn selected_operation(&self) -> Option<OperationDescriptor> {
        self.stores.query_page.selected_operation()
    }

    /// Snapshots the stores and builds the operation the user asked for
    pub fn build_operation(&self) -> Result<Operation, BuildError> {
        let snapshot = self.snapshot()?;
        OperationBuilder::new(self.coercion.as_ref(), self.time.as_ref()).build(&snapshot)
    }

    /// Runs one execute action.
    ///
    /// Build errors are returned before any store is touched. Transport
    /// failures go to the error reporter and come back as
    /// [`ExecuteOutcome::Failed`].
    pub async fn execute(&self, form_valid: bool) -> QueryResult<ExecuteOutcome> {
        if !form_valid {
            tracing::debug!("form is not valid, skipping execute");
            return Ok(ExecuteOutcome::Skipped);
        }
        let Some(in_flight) = self.begin() else {
            tracing::debug!("a submission is already running, skipping execute");
            return Ok(ExecuteOutcome::Skipped);
        };

        let operation = self.build_operation()?;
        let chain = assemble_chain(&operation, self.operation_factory.as_ref())?;

        self.stores.history.record(&operation);
        self.stores.loading.load();
        tracing::info!(%chain, "submitting operation chain");

        let mut service = self.service.clone();
        let response = match ServiceExt::<OperationChain>::ready(&mut service).await {
            Ok(service) => service.call(chain).await,
            Err(err) => Err(err),
        };
        self.stores.loading.finish();

        let results = match response {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(error = %err, "operation chain failed");
                self.stores.errors.handle(EXECUTE_ERROR_LABEL, &err);
                return Ok(ExecuteOutcome::Failed);
            }
        };

        let count = results.len();
        let result_limit = self.stores.settings.result_limit();
        if count == result_limit {
            in_flight.set(SubmissionState::AwaitingConfirmation);
            tracing::info!(result_limit, "result limit reached, asking before showing results");
            match self.stores.prompt.warn(result_limit).await {
                LimitWarningChoice::ShowResults => {}
                LimitWarningChoice::ReturnToQuery => {
                    tracing::debug!(count, "results discarded");
                    return Ok(ExecuteOutcome::Declined { count });
                }
            }
        }

        self.submit_results(results);
        Ok(ExecuteOutcome::Committed { count })
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        let mut state = lock(&self.state);
        if *state != SubmissionState::Idle {
            return None;
        }
        *state = SubmissionState::InFlight;
        Some(InFlight { state: &self.state })
    }

    fn snapshot(&self) -> Result<QuerySnapshot, BuildError> {
        let query_page = &self.stores.query_page;
        let operation = query_page
            .selected_operation()
            .ok_or(BuildError::NoOperationSelected)?;
        Ok(QuerySnapshot {
            operation,
            seeds: self.stores.seeds.seeds(),
            view: self.stores.view.current(),
            date_range: self.stores.date_range.current(),
            direction: query_page.direction(),
            options: query_page.operation_options(),
        })
    }

    /// Shows `results` and clears the query page for the next query
    fn submit_results(&self, results: Vec<Value>) {
        let stores = &self.stores;
        stores.graph.deselect_all();
        stores.results.update(results);
        stores.navigation.go_to(RESULTS_ROUTE);
        stores.query_page.reset();
        stores.date_range.reset();
        stores.view.reset();
        stores.seeds.reset();
        stores.route.clear(INPUT_QUERY_PARAM);
    }
}

impl<S> fmt::Debug for SubmissionController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionController")
            .field("state", &*lock(&self.state))
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}
