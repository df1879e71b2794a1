use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::OfficeSpec;
use crate::error::IssuanceError;
use crate::events::Reporter;
use crate::oracle::DurationOracle;
use crate::task::{IssuanceResult, IssuanceTask};
use crate::telemetry::service_span;

tokio::task_local! {
    /// Set by a worker around its service call; lets `submit` detect that the
    /// caller is already occupying a counter of the target office.
    static SERVING_COUNTER: CounterContext;
}

#[derive(Clone)]
struct CounterContext {
    office: Arc<str>,
    index: usize,
}

/// Counter index of the current execution context, if it is a worker of the
/// named office.
fn serving_counter_at(office: &str) -> Option<usize> {
    SERVING_COUNTER
        .try_with(|ctx| (&*ctx.office == office).then_some(ctx.index))
        .ok()
        .flatten()
}

/// Runtime state of an office.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum OfficeState {
    /// Accepting and serving.
    Open,
    /// A break was requested; in-flight services are finishing.
    BreakPending,
    /// On break; nothing is served, the queue is kept.
    OnBreak,
    /// Terminal. Workers have exited or are exiting.
    Shutdown,
}

struct OfficeQueueEntry {
    task: IssuanceTask,
    sequence: u64,
    completion: oneshot::Sender<Result<IssuanceResult, IssuanceError>>,
}

/// Mutable office state. One lock, one condition; transitions are rare
/// enough that every change simply wakes all waiters.
struct OfficeCore {
    queue: VecDeque<OfficeQueueEntry>,
    accepting: bool,
    break_requested: bool,
    on_break: bool,
    shutdown: bool,
    active_services: usize,
    next_sequence: u64,
}

impl OfficeCore {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            accepting: true,
            break_requested: false,
            on_break: false,
            shutdown: false,
            active_services: 0,
            next_sequence: 0,
        }
    }

    fn enter_break(&mut self) {
        self.on_break = true;
        self.break_requested = false;
    }

    fn snapshot(&self) -> Vec<String> {
        self.queue
            .iter()
            .map(|entry| {
                format!(
                    "{} REQUESTING {}",
                    entry.task.customer_id, entry.task.document_name
                )
            })
            .collect()
    }
}

struct OfficeInner {
    name: Arc<str>,
    spec: OfficeSpec,
    reporter: Arc<dyn Reporter>,
    oracle: Arc<dyn DurationOracle>,
    core: Mutex<OfficeCore>,
    changed: Notify,
}

impl OfficeInner {
    /// Park until `ready` holds. The notified future is registered before the
    /// condition is checked, so a wakeup between check and await is not lost.
    async fn wait_until(&self, ready: impl Fn(&OfficeCore) -> bool) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if ready(&self.core.lock()) {
                return;
            }
            notified.await;
        }
    }

    /// Simulated service: uniform delay, then the work body. The combined
    /// span is measured and attached to the result.
    async fn execute(&self, task: IssuanceTask) -> Result<IssuanceResult, IssuanceError> {
        let started = tokio::time::Instant::now();
        let delay = self
            .oracle
            .sample(self.spec.min_service, self.spec.max_service);
        tokio::time::sleep(delay).await;
        let result = task.work.await?;
        Ok(result.with_service_duration(started.elapsed()))
    }
}

/// A processing station: a FIFO queue drained by `counters` parallel workers,
/// with cooperative coffee breaks and a graceful shutdown.
///
/// Submissions from a worker of this same office bypass the queue and run
/// inline in the caller's context, so a task that re-enters its own office
/// while occupying a counter cannot deadlock.
pub struct Office {
    inner: Arc<OfficeInner>,
    counters: Mutex<Vec<JoinHandle<()>>>,
}

impl Office {
    /// Open the office and spawn its counter workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        spec: OfficeSpec,
        reporter: Arc<dyn Reporter>,
        oracle: Arc<dyn DurationOracle>,
    ) -> Self {
        let name: Arc<str> = Arc::from(spec.name.as_str());
        let inner = Arc::new(OfficeInner {
            name,
            spec,
            reporter,
            oracle,
            core: Mutex::new(OfficeCore::new()),
            changed: Notify::new(),
        });

        let mut handles = Vec::with_capacity(inner.spec.counters);
        for index in 0..inner.spec.counters {
            let worker = Arc::clone(&inner);
            handles.push(tokio::spawn(counter_loop(worker, index)));
        }

        inner.reporter.office(
            &inner.spec.name,
            &format!("office opened with {} counters", inner.spec.counters),
        );

        Self {
            inner,
            counters: Mutex::new(handles),
        }
    }

    /// Office name.
    pub fn name(&self) -> &str {
        &self.inner.spec.name
    }

    /// Current runtime state, derived from the flags.
    pub fn state(&self) -> OfficeState {
        let core = self.inner.core.lock();
        if core.shutdown {
            OfficeState::Shutdown
        } else if core.on_break {
            OfficeState::OnBreak
        } else if core.break_requested || !core.accepting {
            OfficeState::BreakPending
        } else {
            OfficeState::Open
        }
    }

    /// Number of admitted entries that have not started service.
    pub fn queue_size(&self) -> usize {
        self.inner.core.lock().queue.len()
    }

    /// Enqueue a task; the returned [`Submission`] settles with the result or
    /// a failure once a worker drains the entry.
    ///
    /// Fails fast with [`IssuanceError::ShuttingDown`] once the office is
    /// shutting down, and blocks while the office is not accepting (break
    /// pending or on break) — unless the caller is a worker of this very
    /// office, in which case the task is executed inline in the caller's
    /// context: same service delay, same events, no queue slot, no break
    /// check.
    pub async fn submit(&self, task: IssuanceTask) -> Result<Submission, IssuanceError> {
        if let Some(index) = serving_counter_at(&self.inner.spec.name) {
            tracing::debug!(
                office = %self.inner.spec.name,
                counter = index,
                task = %task.id,
                document = %task.document_name,
                "reentrant submission, serving inline"
            );
            return Ok(Submission::inline(Arc::clone(&self.inner), index, task));
        }

        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut core = self.inner.core.lock();
                if core.shutdown {
                    return Err(IssuanceError::ShuttingDown(self.inner.spec.name.clone()));
                }
                if core.accepting {
                    core.next_sequence += 1;
                    let sequence = core.next_sequence;
                    let customer = task.customer_id.clone();
                    let document = task.document_name.clone();
                    let (sender, receiver) = oneshot::channel();
                    core.queue.push_back(OfficeQueueEntry {
                        task,
                        sequence,
                        completion: sender,
                    });
                    // Admission events go out under the lock so no worker can
                    // report service on this entry before it is reported queued.
                    self.inner
                        .reporter
                        .request_accepted(&self.inner.spec.name, &customer, &document);
                    self.inner.reporter.queue(
                        &self.inner.spec.name,
                        &customer,
                        &document,
                        core.snapshot(),
                    );
                    drop(core);
                    self.inner.changed.notify_waiters();
                    return Ok(Submission::queued(receiver));
                }
            }
            notified.await;
        }
    }

    /// Pause the office: stop admitting, let in-flight services finish, sleep
    /// for the configured break duration, reopen.
    ///
    /// Concurrent and repeated calls coalesce into the cycle already underway
    /// and return when it ends. A zero break duration makes this a no-op.
    pub async fn take_break(&self) {
        if self.inner.spec.break_duration.is_zero() {
            return;
        }

        let leader = {
            let mut core = self.inner.core.lock();
            if core.shutdown {
                return;
            }
            if core.break_requested || core.on_break {
                false
            } else {
                core.accepting = false;
                core.break_requested = true;
                self.inner
                    .reporter
                    .office(&self.inner.spec.name, "coffee break requested");
                if core.active_services == 0 {
                    core.enter_break();
                    self.inner
                        .reporter
                        .office(&self.inner.spec.name, "office is now on break");
                } else {
                    self.inner.reporter.office(
                        &self.inner.spec.name,
                        &format!(
                            "waiting for {} active service(s) to finish before break",
                            core.active_services
                        ),
                    );
                }
                true
            }
        };
        self.inner.changed.notify_waiters();

        if !leader {
            // Coalesce: wait out the cycle someone else is driving.
            self.inner
                .wait_until(|core| core.shutdown || (!core.break_requested && !core.on_break))
                .await;
            return;
        }

        self.inner
            .wait_until(|core| core.shutdown || core.on_break)
            .await;
        if self.inner.core.lock().shutdown {
            return;
        }
        self.inner.reporter.office(
            &self.inner.spec.name,
            &format!(
                "coffee break started for {} ms",
                self.inner.spec.break_duration.as_millis()
            ),
        );
        tokio::time::sleep(self.inner.spec.break_duration).await;
        {
            let mut core = self.inner.core.lock();
            if core.shutdown {
                return;
            }
            core.on_break = false;
            core.accepting = true;
            self.inner
                .reporter
                .office(&self.inner.spec.name, "coffee break ended, office is now open");
        }
        self.inner.changed.notify_waiters();
    }

    /// Tear the office down: refuse further submissions, settle queued
    /// entries that never started, and wait for the workers to exit after
    /// their current service. Idempotent; a second call never blocks.
    pub async fn shutdown(&self) {
        let drained = {
            let mut core = self.inner.core.lock();
            if core.shutdown {
                Vec::new()
            } else {
                core.shutdown = true;
                core.accepting = false;
                core.queue.drain(..).collect()
            }
        };
        self.inner.changed.notify_waiters();
        for entry in drained {
            let _ = entry
                .completion
                .send(Err(IssuanceError::ShuttingDown(self.inner.spec.name.clone())));
        }

        let handles = std::mem::take(&mut *self.counters.lock());
        let closing = !handles.is_empty();
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(office = %self.inner.spec.name, "counter worker failed: {err}");
            }
        }
        if closing {
            self.inner
                .reporter
                .office(&self.inner.spec.name, "office closed");
        }
    }
}

/// Admission loop of one counter worker.
async fn counter_loop(inner: Arc<OfficeInner>, index: usize) {
    loop {
        let Some(entry) = admit(&inner).await else {
            return;
        };
        let customer = entry.task.customer_id.clone();
        let document = entry.task.document_name.clone();
        let sequence = entry.sequence;

        inner
            .reporter
            .counter_start(&inner.spec.name, index, &customer, &document);

        let context = CounterContext {
            office: Arc::clone(&inner.name),
            index,
        };
        let span = service_span(&inner.spec.name, index, &customer, &document);
        let outcome = SERVING_COUNTER
            .scope(context, inner.execute(entry.task))
            .instrument(span)
            .await;

        match &outcome {
            Ok(result) => {
                inner
                    .reporter
                    .counter_finish(&inner.spec.name, index, &customer, &document);
                inner.reporter.office(
                    &inner.spec.name,
                    &format!(
                        "completed task #{sequence} for {customer} ({document}) in {} ms",
                        result.service_duration.as_millis()
                    ),
                );
            }
            Err(err) => {
                tracing::debug!(
                    office = %inner.spec.name,
                    counter = index,
                    customer = %customer,
                    document = %document,
                    "service did not produce a document: {err}"
                );
            }
        }
        let _ = entry.completion.send(outcome);

        {
            let mut core = inner.core.lock();
            core.active_services -= 1;
            if core.break_requested && core.active_services == 0 {
                core.enter_break();
                inner
                    .reporter
                    .office(&inner.spec.name, "office is now on break");
            }
        }
        inner.changed.notify_waiters();
    }
}

/// Wait for the next admissible entry; `None` means shutdown.
async fn admit(inner: &Arc<OfficeInner>) -> Option<OfficeQueueEntry> {
    loop {
        let notified = inner.changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        {
            let mut core = inner.core.lock();
            if core.shutdown {
                return None;
            }
            if !core.on_break && !core.break_requested {
                if let Some(entry) = core.queue.pop_front() {
                    core.active_services += 1;
                    return Some(entry);
                }
            }
        }
        notified.await;
    }
}

/// Pending outcome of a [`Office::submit`] call.
///
/// Queued submissions settle when a worker drains the entry; inline
/// (reentrant) submissions perform the service when first awaited, in the
/// awaiting worker's own context.
pub struct Submission {
    future: BoxFuture<'static, Result<IssuanceResult, IssuanceError>>,
}

impl Submission {
    fn queued(receiver: oneshot::Receiver<Result<IssuanceResult, IssuanceError>>) -> Self {
        Self {
            future: Box::pin(async move {
                match receiver.await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(IssuanceError::Cancelled),
                }
            }),
        }
    }

    fn inline(inner: Arc<OfficeInner>, index: usize, task: IssuanceTask) -> Self {
        Self {
            future: Box::pin(async move {
                let customer = task.customer_id.clone();
                let document = task.document_name.clone();
                inner.reporter.office(
                    &inner.spec.name,
                    &format!("counter {index} serving {customer} inline for {document}"),
                );
                inner
                    .reporter
                    .counter_start(&inner.spec.name, index, &customer, &document);
                let outcome = inner.execute(task).await;
                if outcome.is_ok() {
                    inner
                        .reporter
                        .counter_finish(&inner.spec.name, index, &customer, &document);
                }
                outcome
            }),
        }
    }
}

impl Future for Submission {
    type Output = Result<IssuanceResult, IssuanceError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}
