//! Tracing span helpers for the office and orchestration layers.
//!
//! The observable simulation trace goes through the event sink; these spans
//! carry the same identifiers for anyone correlating engine diagnostics.

use tracing::{info_span, Span};

/// Span covering one document request, from first arrival to issuance.
#[must_use]
pub fn request_span(office: &str, customer: &str, document: &str) -> Span {
    info_span!(
        "bureau.request",
        office = %office,
        customer = %customer,
        document = %document,
    )
}

/// Span covering one service at a counter (delay plus work body).
#[must_use]
pub fn service_span(office: &str, counter: usize, customer: &str, document: &str) -> Span {
    info_span!(
        "bureau.service",
        office = %office,
        counter = counter,
        customer = %customer,
        document = %document,
    )
}
