use std::sync::Arc;

use bureau::{IssuanceResult, Reporter, SimulationEvent};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// One recorded sink call, stamped with wall-clock receive time.
#[derive(Clone, Debug)]
pub struct RecordedEvent {
    /// When the sink call was observed.
    pub at: DateTime<Utc>,
    /// The call itself.
    pub event: SimulationEvent,
}

/// Event sink that records every call in arrival order.
///
/// Clones share the same buffer, so one handle can be given to the
/// simulation while the test keeps another for assertions.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: SimulationEvent) {
        self.events.lock().push(RecordedEvent {
            at: Utc::now(),
            event,
        });
    }

    /// Every recorded call, in arrival order.
    pub fn events(&self) -> Vec<SimulationEvent> {
        self.events
            .lock()
            .iter()
            .map(|recorded| recorded.event.clone())
            .collect()
    }

    /// Every recorded call with its receive stamp.
    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Issuance results for the given customer, in issue order.
    pub fn issued_for(&self, customer: &str) -> Vec<IssuanceResult> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SimulationEvent::Issued { result } if result.customer_id == customer => {
                    Some(result)
                }
                _ => None,
            })
            .collect()
    }

    /// How many times the given (customer, document) pair was issued.
    pub fn issued_count(&self, customer: &str, document: &str) -> usize {
        self.issued_for(customer)
            .iter()
            .filter(|result| result.document_name == document)
            .count()
    }

    /// How many queue admissions the given (customer, document) pair saw.
    pub fn queue_count(&self, customer: &str, document: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SimulationEvent::Queue { customer: c, document: d, .. }
                        if c == customer && d == document
                )
            })
            .count()
    }

    /// How many counter starts the given (customer, document) pair saw.
    pub fn counter_start_count(&self, customer: &str, document: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    SimulationEvent::CounterStart { customer: c, document: d, .. }
                        if c == customer && d == document
                )
            })
            .count()
    }

    /// Index of the first event matching the predicate.
    pub fn position(&self, predicate: impl Fn(&SimulationEvent) -> bool) -> Option<usize> {
        self.events().iter().position(|event| predicate(event))
    }

    /// Assert the pair was issued exactly once.
    pub fn assert_issued_once(&self, customer: &str, document: &str) {
        let count = self.issued_count(customer, document);
        assert_eq!(
            count, 1,
            "expected exactly one issuance of {document} for {customer}, got {count}"
        );
    }

    /// Largest number of services simultaneously in flight at the given
    /// office, reconstructed from the start/finish sequence.
    pub fn max_concurrent_services(&self, office: &str) -> usize {
        let mut in_flight = 0usize;
        let mut peak = 0usize;
        for event in self.events() {
            match event {
                SimulationEvent::CounterStart { office: o, .. } if o == office => {
                    in_flight += 1;
                    peak = peak.max(in_flight);
                }
                SimulationEvent::CounterFinish { office: o, .. } if o == office => {
                    in_flight = in_flight.saturating_sub(1);
                }
                _ => {}
            }
        }
        peak
    }
}

impl Reporter for RecordingReporter {
    fn system(&self, message: &str) {
        self.record(SimulationEvent::System {
            message: message.to_string(),
        });
    }

    fn office(&self, office: &str, message: &str) {
        self.record(SimulationEvent::Office {
            office: office.to_string(),
            message: message.to_string(),
        });
    }

    fn customer(&self, customer: &str, message: &str) {
        self.record(SimulationEvent::Customer {
            customer: customer.to_string(),
            message: message.to_string(),
        });
    }

    fn office_arrival(&self, office: &str, customer: &str, document: &str) {
        self.record(SimulationEvent::OfficeArrival {
            office: office.to_string(),
            customer: customer.to_string(),
            document: document.to_string(),
        });
    }

    fn request_accepted(&self, office: &str, customer: &str, document: &str) {
        self.record(SimulationEvent::RequestAccepted {
            office: office.to_string(),
            customer: customer.to_string(),
            document: document.to_string(),
        });
    }

    fn queue(&self, office: &str, customer: &str, document: &str, line: Vec<String>) {
        self.record(SimulationEvent::Queue {
            office: office.to_string(),
            customer: customer.to_string(),
            document: document.to_string(),
            line,
        });
    }

    fn counter_start(&self, office: &str, counter: usize, customer: &str, document: &str) {
        self.record(SimulationEvent::CounterStart {
            office: office.to_string(),
            counter,
            customer: customer.to_string(),
            document: document.to_string(),
        });
    }

    fn transport(&self, from_office: &str, to_office: &str, document: &str) {
        self.record(SimulationEvent::Transport {
            from_office: from_office.to_string(),
            to_office: to_office.to_string(),
            document: document.to_string(),
        });
    }

    fn cancel(&self, office: &str, customer: &str, document: &str, reason: &str) {
        self.record(SimulationEvent::Cancelled {
            office: office.to_string(),
            customer: customer.to_string(),
            document: document.to_string(),
            reason: reason.to_string(),
        });
    }

    fn counter_finish(&self, office: &str, counter: usize, customer: &str, document: &str) {
        self.record(SimulationEvent::CounterFinish {
            office: office.to_string(),
            counter,
            customer: customer.to_string(),
            document: document.to_string(),
        });
    }

    fn issued(&self, result: &IssuanceResult) {
        self.record(SimulationEvent::Issued {
            result: result.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_buffer() {
        let recorder = RecordingReporter::new();
        let clone = recorder.clone();
        clone.system("hello");
        assert_eq!(recorder.events().len(), 1);
        recorder.clear();
        assert!(clone.events().is_empty());
    }

    #[test]
    fn max_concurrent_services_tracks_overlap() {
        let recorder = RecordingReporter::new();
        recorder.counter_start("A", 0, "u", "X");
        recorder.counter_start("A", 1, "v", "X");
        recorder.counter_finish("A", 0, "u", "X");
        recorder.counter_start("A", 0, "w", "X");
        recorder.counter_finish("A", 1, "v", "X");
        recorder.counter_finish("A", 0, "w", "X");
        recorder.counter_start("B", 0, "u", "Y");
        assert_eq!(recorder.max_concurrent_services("A"), 2);
        assert_eq!(recorder.max_concurrent_services("B"), 1);
    }

    #[test]
    fn issuance_helpers_filter_by_customer_and_document() {
        let recorder = RecordingReporter::new();
        recorder.issued(&IssuanceResult::new("u", "X", "A", vec![]));
        recorder.issued(&IssuanceResult::new("u", "Y", "A", vec!["X".to_string()]));
        recorder.issued(&IssuanceResult::new("v", "X", "A", vec![]));
        assert_eq!(recorder.issued_for("u").len(), 2);
        assert_eq!(recorder.issued_count("u", "X"), 1);
        assert_eq!(recorder.issued_count("v", "Y"), 0);
        recorder.assert_issued_once("v", "X");
    }
}
