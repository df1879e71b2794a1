use thiserror::Error;

/// Errors produced while driving a document request to completion.
///
/// The enum is `Clone` because settled outcomes are memoized per customer and
/// handed out to every caller that requested the same document.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IssuanceError {
    /// The requested document is not part of the configuration.
    #[error("unknown document: {0}")]
    UnknownDocument(String),

    /// A document names an issuing office that is not running.
    #[error("unknown office: {0}")]
    UnknownOffice(String),

    /// Internal signal from a task body: the customer reached the counter
    /// without the listed prerequisites. The orchestrator resolves them and
    /// resubmits; this variant never surfaces to a customer.
    #[error("missing prerequisites: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    /// The office refused the submission because it is shutting down. Queued
    /// entries that never started also settle with this.
    #[error("office {0} is shutting down")]
    ShuttingDown(String),

    /// The awaited completion was dropped before it settled.
    #[error("request cancelled")]
    Cancelled,

    /// Any other failure surfaced by a task body or the execution substrate.
    #[error("{0}")]
    Underlying(String),
}

impl IssuanceError {
    /// True for the internal resolve-and-retry signal.
    pub fn is_missing_dependencies(&self) -> bool {
        matches!(self, IssuanceError::MissingDependencies(_))
    }
}
