use serde::{Deserialize, Serialize};
use tracing::info;

use crate::task::IssuanceResult;

/// Sink the core pushes its observable trace into.
///
/// Every method takes primitive fields, returns nothing, and is invoked from
/// arbitrary worker and customer tasks, so implementations must be
/// thread-safe and must not panic; the core never depends on what a sink
/// does with an event.
pub trait Reporter: Send + Sync {
    /// Engine-level lifecycle message.
    fn system(&self, message: &str);

    /// Office-internal log line.
    fn office(&self, office: &str, message: &str);

    /// Per-customer narration.
    fn customer(&self, customer: &str, message: &str);

    /// A request is about to be submitted to an office.
    fn office_arrival(&self, office: &str, customer: &str, document: &str);

    /// The office has admitted the request to its queue.
    fn request_accepted(&self, office: &str, customer: &str, document: &str);

    /// Queue contents right after an admission.
    fn queue(&self, office: &str, customer: &str, document: &str, line: Vec<String>);

    /// A worker has begun service at the given counter.
    fn counter_start(&self, office: &str, counter: usize, customer: &str, document: &str);

    /// A prerequisite is being sought at another office.
    fn transport(&self, from_office: &str, to_office: &str, document: &str);

    /// A submission was rejected because prerequisites are missing.
    fn cancel(&self, office: &str, customer: &str, document: &str, reason: &str);

    /// Service completed successfully at the given counter.
    fn counter_finish(&self, office: &str, counter: usize, customer: &str, document: &str);

    /// A document was produced; the service duration is known.
    fn issued(&self, result: &IssuanceResult);
}

/// Typed, owned mirror of one [`Reporter`] call.
///
/// Recording sinks collect these so tests can assert over the observable
/// trace without parsing log output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// Engine-level lifecycle message.
    System {
        /// Free-form message.
        message: String,
    },
    /// Office-internal log line.
    Office {
        /// Office name.
        office: String,
        /// Free-form message.
        message: String,
    },
    /// Per-customer narration.
    Customer {
        /// Customer identifier.
        customer: String,
        /// Free-form message.
        message: String,
    },
    /// A request is about to be submitted.
    OfficeArrival {
        /// Target office.
        office: String,
        /// Requesting customer.
        customer: String,
        /// Requested document.
        document: String,
    },
    /// The office admitted the request.
    RequestAccepted {
        /// Target office.
        office: String,
        /// Requesting customer.
        customer: String,
        /// Requested document.
        document: String,
    },
    /// Queue contents right after an admission.
    Queue {
        /// Target office.
        office: String,
        /// Requesting customer.
        customer: String,
        /// Requested document.
        document: String,
        /// Snapshot of the line, head first.
        line: Vec<String>,
    },
    /// Service began at a counter.
    CounterStart {
        /// Serving office.
        office: String,
        /// Counter index.
        counter: usize,
        /// Served customer.
        customer: String,
        /// Document under service.
        document: String,
    },
    /// A prerequisite is being sought elsewhere.
    Transport {
        /// Office the request came from.
        from_office: String,
        /// Office that issues the prerequisite.
        to_office: String,
        /// The prerequisite document.
        document: String,
    },
    /// A submission was rejected for missing prerequisites.
    Cancelled {
        /// Rejecting office.
        office: String,
        /// Affected customer.
        customer: String,
        /// Rejected document.
        document: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Service finished at a counter.
    CounterFinish {
        /// Serving office.
        office: String,
        /// Counter index.
        counter: usize,
        /// Served customer.
        customer: String,
        /// Issued document.
        document: String,
    },
    /// A document was produced.
    Issued {
        /// The full result.
        result: IssuanceResult,
    },
}

/// Reporter that discards everything. Useful default in unit tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn system(&self, _message: &str) {}
    fn office(&self, _office: &str, _message: &str) {}
    fn customer(&self, _customer: &str, _message: &str) {}
    fn office_arrival(&self, _office: &str, _customer: &str, _document: &str) {}
    fn request_accepted(&self, _office: &str, _customer: &str, _document: &str) {}
    fn queue(&self, _office: &str, _customer: &str, _document: &str, _line: Vec<String>) {}
    fn counter_start(&self, _office: &str, _counter: usize, _customer: &str, _document: &str) {}
    fn transport(&self, _from_office: &str, _to_office: &str, _document: &str) {}
    fn cancel(&self, _office: &str, _customer: &str, _document: &str, _reason: &str) {}
    fn counter_finish(&self, _office: &str, _counter: usize, _customer: &str, _document: &str) {}
    fn issued(&self, _result: &IssuanceResult) {}
}

/// Reporter that ships the canonical line format through `tracing`.
///
/// The subscriber installed by the host decides where the lines end up; the
/// demo binary installs a plain fmt subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl TracingReporter {
    fn queue_line(line: &[String]) -> String {
        if line.is_empty() {
            "(now being served)".to_string()
        } else {
            line.join(", ")
        }
    }
}

impl Reporter for TracingReporter {
    fn system(&self, message: &str) {
        info!(target: "bureau::trace", "SYSTEM  {message}");
    }

    fn office(&self, office: &str, message: &str) {
        info!(target: "bureau::trace", "OFFICE  [{office}] {message}");
    }

    fn customer(&self, customer: &str, message: &str) {
        info!(target: "bureau::trace", "PERSON  [{customer}] {message}");
    }

    fn office_arrival(&self, office: &str, customer: &str, document: &str) {
        info!(target: "bureau::trace", "ARRIVE office {office} person {customer} asking for {document}");
    }

    fn request_accepted(&self, office: &str, customer: &str, document: &str) {
        info!(target: "bureau::trace", "REQUEST office {office} person {customer} -> {document} in progress");
    }

    fn queue(&self, office: &str, customer: &str, document: &str, line: Vec<String>) {
        let people = Self::queue_line(&line);
        info!(target: "bureau::trace", "QUEUE   office {office} person {customer} waiting for {document} | line: {people}");
    }

    fn counter_start(&self, office: &str, counter: usize, customer: &str, document: &str) {
        info!(target: "bureau::trace", "COUNTER office {office} counter {counter} now processing person {customer} for {document}");
    }

    fn transport(&self, from_office: &str, to_office: &str, document: &str) {
        info!(target: "bureau::trace", "TRANSPORTING from counter: {from_office} to counter: {to_office} document: {document}");
    }

    fn cancel(&self, office: &str, customer: &str, document: &str, reason: &str) {
        info!(target: "bureau::trace", "CANCELLED at office {office} person {customer} request {document} -> {reason}");
    }

    fn counter_finish(&self, office: &str, counter: usize, customer: &str, document: &str) {
        info!(target: "bureau::trace", "FINISHED person {customer} got {document} from {office} counter {counter} LEAVING...");
    }

    fn issued(&self, result: &IssuanceResult) {
        let deps = if result.dependencies.is_empty() {
            String::new()
        } else {
            format!(" (deps: {})", result.dependencies.join(", "))
        };
        info!(
            target: "bureau::trace",
            "DOC     [{}] received {} from {} in {} ms{}",
            result.customer_id,
            result.document_name,
            result.issuing_office,
            result.service_duration.as_millis(),
            deps
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_line_formats_empty_and_populated() {
        assert_eq!(TracingReporter::queue_line(&[]), "(now being served)");
        assert_eq!(
            TracingReporter::queue_line(&["u REQUESTING X".to_string(), "v REQUESTING Y".to_string()]),
            "u REQUESTING X, v REQUESTING Y"
        );
    }

    #[test]
    fn events_are_cloneable_and_comparable() {
        let event = SimulationEvent::Transport {
            from_office: "A".to_string(),
            to_office: "B".to_string(),
            document: "X".to_string(),
        };
        assert_eq!(event.clone(), event);

        let issued = SimulationEvent::Issued {
            result: IssuanceResult::new("u", "X", "A", vec![]),
        };
        let rendered = format!("{issued:?}");
        assert!(rendered.contains("Issued"));
    }
}
