use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::Instrument;

use crate::config::{DocumentSpec, SimulationConfig};
use crate::error::IssuanceError;
use crate::events::Reporter;
use crate::journey::{Journey, JourneyHandle};
use crate::office::Office;
use crate::task::{IssuanceResult, IssuanceTask, IssuanceWork};
use crate::telemetry::request_span;

/// Drives document requests to completion across offices.
///
/// For each request it picks the issuing office and submits a task whose work
/// body checks, at the counter, whether the customer already holds every
/// prerequisite. If not, the clerk turns the customer away: the missing
/// prerequisites are chased one by one from the counter (re-entering this
/// very office inline where the prerequisite is issued here, queueing at the
/// remote office otherwise), the task fails with the missing-prerequisites
/// signal, and the orchestrator resubmits. The resubmission depth is bounded
/// by the dependency graph, which configuration validation keeps acyclic.
pub struct DocumentOrchestrator {
    config: Arc<SimulationConfig>,
    offices: Arc<HashMap<String, Arc<Office>>>,
    reporter: Arc<dyn Reporter>,
}

impl DocumentOrchestrator {
    /// Create an orchestrator over the given running offices.
    pub fn new(
        config: Arc<SimulationConfig>,
        offices: Arc<HashMap<String, Arc<Office>>>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            offices,
            reporter,
        }
    }

    /// Start a journey for a customer.
    pub fn journey(self: &Arc<Self>, customer_id: impl Into<String>) -> Journey {
        Journey::new(customer_id, Arc::clone(self))
    }

    /// Obtain one document for one journey, resolving prerequisites and
    /// resubmitting as needed.
    pub(crate) fn obtain(
        self: Arc<Self>,
        journey: JourneyHandle,
        document: String,
    ) -> BoxFuture<'static, Result<IssuanceResult, IssuanceError>> {
        Box::pin(async move {
            let customer = journey.customer_id().to_string();
            let spec = self
                .config
                .document(&document)
                .ok_or_else(|| IssuanceError::UnknownDocument(document.clone()))?
                .clone();
            let office = self
                .offices
                .get(&spec.issuing_office)
                .ok_or_else(|| IssuanceError::UnknownOffice(spec.issuing_office.clone()))?
                .clone();

            let span = request_span(office.name(), &customer, &document);
            async {
                loop {
                    self.reporter
                        .office_arrival(office.name(), &customer, &document);
                    let task = IssuanceTask::new(
                        customer.clone(),
                        document.clone(),
                        self.issue_work(journey.clone(), spec.clone()),
                    );
                    let submission = office.submit(task).await?;
                    match submission.await {
                        Ok(result) => {
                            self.reporter.issued(&result);
                            return Ok(result);
                        }
                        Err(IssuanceError::MissingDependencies(missing)) => {
                            // Prerequisites were chased at the counter; the
                            // journey now holds them, so the same request goes
                            // back in.
                            tracing::debug!(
                                customer = %customer,
                                document = %document,
                                ?missing,
                                "prerequisites resolved, resubmitting"
                            );
                        }
                        Err(err) => {
                            self.reporter.customer(
                                &customer,
                                &format!("failed to obtain {document}: {err}"),
                            );
                            return Err(err);
                        }
                    }
                }
            }
            .instrument(span)
            .await
        })
    }

    /// Work body executed by the serving worker once the customer reaches the
    /// head of the queue.
    fn issue_work(&self, journey: JourneyHandle, spec: DocumentSpec) -> IssuanceWork {
        let reporter = Arc::clone(&self.reporter);
        let config = Arc::clone(&self.config);
        Box::pin(async move {
            let Some(journey) = journey.upgrade() else {
                return Err(IssuanceError::Cancelled);
            };
            let missing: Vec<String> = spec
                .dependencies
                .iter()
                .filter(|dependency| !journey.has_document(dependency))
                .cloned()
                .collect();
            if missing.is_empty() {
                return Ok(IssuanceResult::new(
                    journey.customer_id(),
                    spec.name.clone(),
                    spec.issuing_office.clone(),
                    spec.dependencies.clone(),
                ));
            }

            reporter.cancel(
                &spec.issuing_office,
                journey.customer_id(),
                &spec.name,
                &format!("needs {}", missing.join(", ")),
            );
            for dependency in &missing {
                let handler = config
                    .document(dependency)
                    .map(|dep| dep.issuing_office.clone())
                    .ok_or_else(|| IssuanceError::UnknownDocument(dependency.clone()))?;
                reporter.transport(&spec.issuing_office, &handler, dependency);
                // Sequential on purpose: a later prerequisite may itself
                // depend on an earlier one and will find it memoized.
                journey.request_document(dependency).await?;
            }
            Err(IssuanceError::MissingDependencies(missing))
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Arc<Self> {
        use crate::events::NullReporter;

        Arc::new(Self::new(
            Arc::new(SimulationConfig::new(Vec::new(), Vec::new()).unwrap()),
            Arc::new(HashMap::new()),
            Arc::new(NullReporter),
        ))
    }
}
