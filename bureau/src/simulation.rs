use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::{CustomerProfile, SimulationConfig};
use crate::events::{Reporter, TracingReporter};
use crate::office::Office;
use crate::oracle::{DurationOracle, UniformOracle};
use crate::orchestrator::DocumentOrchestrator;

/// Default window for the delay between an office's coffee breaks.
const DEFAULT_BREAK_WINDOW: (Duration, Duration) =
    (Duration::from_secs(6), Duration::from_secs(10));

/// Token for signaling cooperative shutdown to background tasks.
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    inner: Arc<ShutdownTokenInner>,
}

#[derive(Debug, Default)]
struct ShutdownTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl ShutdownToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every clone.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Check without waiting.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancelled; immediately if cancellation already happened.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Builder for a [`Simulation`]; reporter, oracle, and break cadence have
/// sensible defaults.
pub struct SimulationBuilder {
    config: SimulationConfig,
    customers: Vec<CustomerProfile>,
    reporter: Arc<dyn Reporter>,
    oracle: Arc<dyn DurationOracle>,
    break_window: (Duration, Duration),
}

impl SimulationBuilder {
    /// Start from a validated configuration and a list of customers.
    pub fn new(config: SimulationConfig, customers: Vec<CustomerProfile>) -> Self {
        Self {
            config,
            customers,
            reporter: Arc::new(TracingReporter),
            oracle: Arc::new(UniformOracle),
            break_window: DEFAULT_BREAK_WINDOW,
        }
    }

    /// Replace the event sink.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the duration oracle.
    pub fn with_oracle(mut self, oracle: Arc<dyn DurationOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Override the delay window between break cycles.
    pub fn with_break_window(mut self, min: Duration, max: Duration) -> Self {
        self.break_window = (min, max);
        self
    }

    /// Open the offices and assemble the simulation.
    ///
    /// Must be called from within a tokio runtime: each office spawns its
    /// counter workers on construction.
    pub fn build(self) -> Simulation {
        let config = Arc::new(self.config);
        let mut offices = HashMap::with_capacity(config.offices().len());
        for spec in config.offices() {
            offices.insert(
                spec.name.clone(),
                Arc::new(Office::new(
                    spec.clone(),
                    Arc::clone(&self.reporter),
                    Arc::clone(&self.oracle),
                )),
            );
        }
        let offices = Arc::new(offices);
        let orchestrator = Arc::new(DocumentOrchestrator::new(
            Arc::clone(&config),
            Arc::clone(&offices),
            Arc::clone(&self.reporter),
        ));

        Simulation {
            config,
            customers: self.customers,
            reporter: self.reporter,
            oracle: self.oracle,
            break_window: self.break_window,
            offices,
            orchestrator,
            shutdown: ShutdownToken::new(),
            break_tasks: Mutex::new(Vec::new()),
        }
    }
}

/// Runs the whole scenario: offices, customers, and the break scheduler.
pub struct Simulation {
    config: Arc<SimulationConfig>,
    customers: Vec<CustomerProfile>,
    reporter: Arc<dyn Reporter>,
    oracle: Arc<dyn DurationOracle>,
    break_window: (Duration, Duration),
    offices: Arc<HashMap<String, Arc<Office>>>,
    orchestrator: Arc<DocumentOrchestrator>,
    shutdown: ShutdownToken,
    break_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Simulation {
    /// The running office with the given name.
    pub fn office(&self, name: &str) -> Option<&Arc<Office>> {
        self.offices.get(name)
    }

    /// The orchestrator, for driving journeys outside [`Simulation::run`].
    pub fn orchestrator(&self) -> &Arc<DocumentOrchestrator> {
        &self.orchestrator
    }

    /// Run every customer to completion.
    ///
    /// Announces the scenario, starts the break scheduler, spawns one task
    /// per customer, and returns once all of them have finished. Offices keep
    /// running; call [`Simulation::shutdown`] to tear them down.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.announce();
        self.schedule_breaks();

        let mut customers = Vec::with_capacity(self.customers.len());
        for profile in self.customers.clone() {
            let orchestrator = Arc::clone(&self.orchestrator);
            let reporter = Arc::clone(&self.reporter);
            customers.push(tokio::spawn(customer_flow(profile, orchestrator, reporter)));
        }
        for customer in customers {
            customer.await?;
        }

        self.reporter.system("all customers finished");
        Ok(())
    }

    /// Stop the break scheduler and close every office. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let break_tasks = std::mem::take(&mut *self.break_tasks.lock());
        for task in break_tasks {
            // The scheduler may be sleeping through a multi-second break;
            // there is nothing left for it to do, so cut it short.
            task.abort();
            let _ = task.await;
        }
        for office in self.offices.values() {
            office.shutdown().await;
        }
        self.reporter.system("simulation shut down");
    }

    fn announce(&self) {
        self.reporter.system(&format!(
            "simulation starting with {} customers and {} offices",
            self.customers.len(),
            self.offices.len()
        ));
        self.reporter.system("offices in play:");
        for spec in self.config.offices() {
            self.reporter.system(&format!(
                "- {} | counters={} | service={}-{} ms | break={}s",
                spec.name,
                spec.counters,
                spec.min_service.as_millis(),
                spec.max_service.as_millis(),
                spec.break_duration.as_secs()
            ));
        }
        self.reporter.system("customers queued:");
        for profile in &self.customers {
            self.reporter.system(&format!(
                "- {} arrives after {} ms requesting {}",
                profile.customer_id,
                profile.arrival_delay.as_millis(),
                profile.requested_documents.join(", ")
            ));
        }
    }

    fn schedule_breaks(&self) {
        let (min_delay, max_delay) = self.break_window;
        let mut break_tasks = self.break_tasks.lock();
        for office in self.offices.values() {
            let office = Arc::clone(office);
            let oracle = Arc::clone(&self.oracle);
            let token = self.shutdown.clone();
            break_tasks.push(tokio::spawn(async move {
                loop {
                    let delay = oracle.sample(min_delay, max_delay);
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    office.take_break().await;
                }
            }));
        }
    }
}

/// One customer's run: wait for arrival, fan out over the requested
/// documents, await them all, narrate the outcome.
async fn customer_flow(
    profile: CustomerProfile,
    orchestrator: Arc<DocumentOrchestrator>,
    reporter: Arc<dyn Reporter>,
) {
    if !profile.arrival_delay.is_zero() {
        tokio::time::sleep(profile.arrival_delay).await;
    }
    reporter.customer(&profile.customer_id, "arrived at the service hall");

    let journey = orchestrator.journey(&profile.customer_id);
    let mut pending = Vec::with_capacity(profile.requested_documents.len());
    for document in &profile.requested_documents {
        reporter.customer(&profile.customer_id, &format!("needs document {document}"));
        pending.push(journey.request_document(document));
    }

    let started = tokio::time::Instant::now();
    let outcomes = futures::future::join_all(pending).await;
    let mut obtained = 0usize;
    let mut failed = false;
    for outcome in outcomes {
        match outcome {
            Ok(_) => obtained += 1,
            Err(err) => {
                reporter.customer(
                    &profile.customer_id,
                    &format!("failed to obtain document: {err}"),
                );
                failed = true;
            }
        }
    }
    if !failed {
        reporter.customer(
            &profile.customer_id,
            &format!(
                "completed journey in {}s with {obtained} documents",
                started.elapsed().as_secs()
            ),
        );
    }
}
