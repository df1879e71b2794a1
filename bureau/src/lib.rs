//! Bureau - a simulation of public-service offices issuing documents.
//!
//! Customers walk into a network of offices, each with a FIFO queue, a pool
//! of parallel counters, and periodic coffee breaks. Every document has one
//! issuing office and a list of prerequisite documents; requesting a document
//! recursively drags the customer through every office its paper trail
//! touches.
//!
//! # Core Concepts
//!
//! - **Office**: a processing station. `counters` workers drain a FIFO queue;
//!   a coffee break pauses admissions while in-flight services finish; a
//!   submission from one of the office's own workers runs inline so a task
//!   that re-enters its own office cannot deadlock. See [`Office`].
//!
//! - **Journey**: one customer's memoization context. At most one issuance
//!   task per (customer, document) is ever submitted; concurrent requests for
//!   the same document converge on one shared future. See [`Journey`].
//!
//! - **Orchestrator**: resolves a document request: submits to the issuing
//!   office, interprets the clerk's "come back with your papers" rejection,
//!   chases the missing prerequisites, and resubmits. See
//!   [`DocumentOrchestrator`].
//!
//! - **Reporter**: the narrow sink the core narrates through; swap in a
//!   recording sink to assert over the observable trace. See [`Reporter`].
//!
//! - **Simulation**: wires config, offices, customers, and the break
//!   scheduler together and runs the day. See [`Simulation`].
//!
//! # Quick Start
//!
//! ```ignore
//! use bureau::{CustomerProfile, SimulationBuilder, SimulationConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let customers = vec![CustomerProfile::new(
//!         "Ana",
//!         vec!["BUSINESS_LICENSE".to_string()],
//!         Duration::ZERO,
//!     )];
//!     let simulation = SimulationBuilder::new(SimulationConfig::sample(), customers).build();
//!     simulation.run().await?;
//!     simulation.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! See `examples/busy_morning.rs` for a complete runnable scenario.

/// Office, document, and customer descriptions plus validated lookup.
///
/// The `config` module defines [`OfficeSpec`], [`DocumentSpec`],
/// [`CustomerProfile`], and [`SimulationConfig`], which validates name
/// uniqueness, office references, service windows, and dependency
/// acyclicity at construction.
pub mod config;

/// Error types for document issuance.
///
/// The `error` module defines [`IssuanceError`], including the internal
/// missing-prerequisites signal the orchestrator resolves and retries on.
pub mod error;

/// Event sink interface and stock implementations.
///
/// The `events` module defines the [`Reporter`] capability, the typed
/// [`SimulationEvent`] mirror used by recording sinks, and the
/// [`TracingReporter`] / [`NullReporter`] implementations.
pub mod events;

/// Per-customer journey state and memoization.
///
/// The `journey` module defines [`Journey`] and the shared
/// [`DocumentFuture`] type callers await.
pub mod journey;

/// The office engine: queue, worker pool, breaks, reentrancy escape.
///
/// The `office` module defines [`Office`], [`OfficeState`], and the
/// [`Submission`] future returned by [`Office::submit`].
pub mod office;

/// Simulated duration sources.
///
/// The `oracle` module defines the [`DurationOracle`] trait and the default
/// [`UniformOracle`].
pub mod oracle;

/// Cross-office document orchestration.
///
/// The `orchestrator` module defines [`DocumentOrchestrator`].
pub mod orchestrator;

/// The simulation driver.
///
/// The `simulation` module defines [`Simulation`], [`SimulationBuilder`],
/// and the [`ShutdownToken`] shared with background tasks.
pub mod simulation;

/// Issuance task and result types.
///
/// The `task` module defines [`IssuanceTask`], [`IssuanceResult`],
/// [`TaskId`], and the [`IssuanceWork`] future type.
pub mod task;

/// Tracing span helpers.
pub mod telemetry;

pub use config::*;
pub use error::*;
pub use events::*;
pub use journey::*;
pub use office::*;
pub use oracle::*;
pub use orchestrator::*;
pub use simulation::*;
pub use task::*;
