use tracing::{error, info};

use crate::api::AccountApi;
use crate::error::Result;
use crate::orchestrator::{ImportOrder, Operation, Orchestrator};
use crate::output::{self, Format};
use crate::store::cache::InventoryCache;

/// How a run ended, for callers that want an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    /// Some spaces failed; the others completed.
    Partial,
    /// The run could not start (e.g. no organization).
    Aborted,
}

pub fn run<A: AccountApi + ?Sized>(
    api: &A,
    cache: &InventoryCache,
    operation: Operation<'_>,
    refresh: bool,
    order: ImportOrder,
    format: Format,
) -> Result<RunStatus> {
    let orchestrator = Orchestrator::new(api, cache)
        .refresh(refresh)
        .import_order(order);

    let (status, printed) = match orchestrator.run(&operation) {
        Ok(report) => {
            let status = if report.has_failures() {
                RunStatus::Partial
            } else {
                RunStatus::Clean
            };
            (status, output::print_report(&report, format))
        }
        Err(err) => {
            error!(error = %err, code = err.code(), "An unexpected error occurred");
            (RunStatus::Aborted, Ok(()))
        }
    };

    // Logged even when the report could not be printed.
    info!("Operation completed.");
    printed.map(|()| status)
}
