//! End-to-end scenarios for the bureaucracy simulation.
//!
//! Each test runs the full stack (offices, journeys, orchestrator, driver)
//! with a recording sink and a deterministic duration oracle, then asserts
//! over the observable event trace.

use std::sync::Arc;
use std::time::Duration;

use bureau::{
    IssuanceError, IssuanceTask, IssuanceResult, Office, OfficeSpec, SimulationBuilder,
    SimulationEvent, Simulation,
};
use bureau_testkit::{
    config, document, quick_office, walk_in, FixedOracle, MidpointOracle, RecordingReporter,
};
use tokio::time::timeout;

const HOUR: Duration = Duration::from_secs(3600);

/// Simulation wired with a recorder, a midpoint oracle, and breaks pushed far
/// enough out that they never fire on their own.
fn harness(
    config: bureau::SimulationConfig,
    customers: Vec<bureau::CustomerProfile>,
) -> (Simulation, RecordingReporter) {
    let recorder = RecordingReporter::new();
    let simulation = SimulationBuilder::new(config, customers)
        .with_reporter(Arc::new(recorder.clone()))
        .with_oracle(Arc::new(MidpointOracle))
        .with_break_window(HOUR, HOUR * 2)
        .build();
    (simulation, recorder)
}

fn index_of(
    events: &[SimulationEvent],
    description: &str,
    predicate: impl Fn(&SimulationEvent) -> bool,
) -> usize {
    events
        .iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("missing event: {description}"))
}

#[tokio::test(start_paused = true)]
async fn leaf_document_is_served_straight_from_the_queue() {
    let (simulation, recorder) = harness(
        config(vec![quick_office("A", 1)], vec![document("X", "A", &[])]),
        vec![walk_in("u", &["X"])],
    );
    simulation.run().await.unwrap();
    simulation.shutdown().await;

    let events = recorder.events();
    let arrive = index_of(&events, "arrival", |e| {
        matches!(e, SimulationEvent::OfficeArrival { office, customer, document }
            if office == "A" && customer == "u" && document == "X")
    });
    let accepted = index_of(&events, "request accepted", |e| {
        matches!(e, SimulationEvent::RequestAccepted { office, customer, document }
            if office == "A" && customer == "u" && document == "X")
    });
    let queued = index_of(&events, "queue", |e| {
        matches!(e, SimulationEvent::Queue { office, customer, document, line }
            if office == "A" && customer == "u" && document == "X"
                && line == &vec!["u REQUESTING X".to_string()])
    });
    let started = index_of(&events, "counter start", |e| {
        matches!(e, SimulationEvent::CounterStart { office, counter, customer, document }
            if office == "A" && *counter == 0 && customer == "u" && document == "X")
    });
    let finished = index_of(&events, "counter finish", |e| {
        matches!(e, SimulationEvent::CounterFinish { office, customer, document, .. }
            if office == "A" && customer == "u" && document == "X")
    });
    let issued = index_of(&events, "issued", |e| {
        matches!(e, SimulationEvent::Issued { result }
            if result.customer_id == "u" && result.document_name == "X")
    });

    assert!(arrive < accepted);
    assert!(accepted < queued);
    assert!(queued < started);
    assert!(started < finished);
    assert!(finished < issued);
    recorder.assert_issued_once("u", "X");
    assert!(recorder
        .issued_for("u")
        .iter()
        .all(|result| result.dependencies.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn same_office_prerequisite_is_served_inline() {
    let (simulation, recorder) = harness(
        config(
            vec![quick_office("A", 1)],
            vec![document("X", "A", &[]), document("Y", "A", &["X"])],
        ),
        vec![walk_in("u", &["Y"])],
    );
    simulation.run().await.unwrap();
    simulation.shutdown().await;

    let events = recorder.events();
    let cancelled = index_of(&events, "cancellation", |e| {
        matches!(e, SimulationEvent::Cancelled { office, customer, document, reason }
            if office == "A" && customer == "u" && document == "Y" && reason == "needs X")
    });
    let transported = index_of(&events, "transport", |e| {
        matches!(e, SimulationEvent::Transport { from_office, to_office, document }
            if from_office == "A" && to_office == "A" && document == "X")
    });
    let issued_x = index_of(&events, "issued X", |e| {
        matches!(e, SimulationEvent::Issued { result } if result.document_name == "X")
    });
    let issued_y = index_of(&events, "issued Y", |e| {
        matches!(e, SimulationEvent::Issued { result } if result.document_name == "Y")
    });

    assert!(cancelled < transported);
    assert!(transported < issued_x);
    assert!(issued_x < issued_y);

    // The prerequisite ran inline on the occupied counter: one service, no
    // queue slot. The rejected request itself went through the queue twice.
    assert_eq!(recorder.queue_count("u", "X"), 0);
    assert_eq!(recorder.counter_start_count("u", "X"), 1);
    assert_eq!(recorder.queue_count("u", "Y"), 2);
    recorder.assert_issued_once("u", "X");
    recorder.assert_issued_once("u", "Y");
}

#[tokio::test(start_paused = true)]
async fn cross_office_prerequisite_queues_remotely() {
    let (simulation, recorder) = harness(
        config(
            vec![quick_office("A", 1), quick_office("B", 1)],
            vec![document("X", "A", &[]), document("Y", "B", &["X"])],
        ),
        vec![walk_in("u", &["Y"])],
    );
    simulation.run().await.unwrap();
    simulation.shutdown().await;

    let events = recorder.events();
    index_of(&events, "transport B to A", |e| {
        matches!(e, SimulationEvent::Transport { from_office, to_office, document }
            if from_office == "B" && to_office == "A" && document == "X")
    });
    let issued_x = index_of(&events, "issued X", |e| {
        matches!(e, SimulationEvent::Issued { result } if result.document_name == "X")
    });
    let issued_y = index_of(&events, "issued Y", |e| {
        matches!(e, SimulationEvent::Issued { result } if result.document_name == "Y")
    });
    assert!(issued_x < issued_y);

    // Remote prerequisite goes through the remote queue, no inline service.
    assert_eq!(recorder.queue_count("u", "X"), 1);
    assert_eq!(recorder.counter_start_count("u", "X"), 1);
    assert_eq!(recorder.queue_count("u", "Y"), 2);
}

#[tokio::test(start_paused = true)]
async fn shared_prerequisite_is_issued_exactly_once() {
    let (simulation, recorder) = harness(
        config(
            vec![quick_office("A", 2)],
            vec![
                document("X", "A", &[]),
                document("Y", "A", &["X"]),
                document("Z", "A", &["X"]),
            ],
        ),
        vec![walk_in("u", &["Y", "Z"])],
    );
    simulation.run().await.unwrap();
    simulation.shutdown().await;

    recorder.assert_issued_once("u", "X");
    recorder.assert_issued_once("u", "Y");
    recorder.assert_issued_once("u", "Z");
    assert_eq!(recorder.counter_start_count("u", "X"), 1);
}

#[tokio::test(start_paused = true)]
async fn break_does_not_lose_queued_work() {
    let recorder = RecordingReporter::new();
    let office = Arc::new(Office::new(
        OfficeSpec::new(
            "A",
            1,
            Duration::from_millis(20),
            Duration::from_millis(20),
            Duration::from_millis(100),
        ),
        Arc::new(recorder.clone()),
        Arc::new(FixedOracle(Duration::from_millis(20))),
    ));

    let result = IssuanceResult::new("u", "X", "A", vec![]);
    let submission = office
        .submit(IssuanceTask::new(
            "u",
            "X",
            Box::pin(async move { Ok(result) }),
        ))
        .await
        .unwrap();

    // Whether or not the worker had already started, the task must survive
    // the break and be served exactly once.
    let breaker = {
        let office = Arc::clone(&office);
        tokio::spawn(async move { office.take_break().await })
    };

    let outcome = timeout(Duration::from_secs(5), submission)
        .await
        .expect("task lost across the break");
    assert!(outcome.is_ok());
    breaker.await.unwrap();
    assert_eq!(recorder.counter_start_count("u", "X"), 1);
    office.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_customers_never_exceed_counter_capacity() {
    let customers = vec![
        walk_in("u1", &["X"]),
        walk_in("u2", &["X"]),
        walk_in("u3", &["X"]),
        walk_in("u4", &["X"]),
        walk_in("u5", &["X"]),
    ];
    let (simulation, recorder) = harness(
        config(vec![quick_office("A", 2)], vec![document("X", "A", &[])]),
        customers,
    );
    simulation.run().await.unwrap();
    simulation.shutdown().await;

    assert!(recorder.max_concurrent_services("A") <= 2);
    for customer in ["u1", "u2", "u3", "u4", "u5"] {
        recorder.assert_issued_once(customer, "X");
    }
}

#[tokio::test(start_paused = true)]
async fn services_start_in_admission_order() {
    let customers = vec![walk_in("u1", &["X"]), walk_in("u2", &["X"]), walk_in("u3", &["X"])];
    let (simulation, recorder) = harness(
        config(vec![quick_office("A", 1)], vec![document("X", "A", &[])]),
        customers,
    );
    simulation.run().await.unwrap();
    simulation.shutdown().await;

    let admitted: Vec<String> = recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SimulationEvent::Queue { customer, .. } => Some(customer),
            _ => None,
        })
        .collect();
    let started: Vec<String> = recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SimulationEvent::CounterStart { customer, .. } => Some(customer),
            _ => None,
        })
        .collect();
    assert_eq!(admitted, started);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_future_and_one_issuance() {
    let (simulation, recorder) = harness(
        config(vec![quick_office("A", 1)], vec![document("X", "A", &[])]),
        vec![],
    );

    let journey = simulation.orchestrator().journey("u");
    let first = journey.request_document("X");
    let second = journey.request_document("X");
    assert!(first.ptr_eq(&second));

    let (a, b) = tokio::join!(first, second);
    assert!(a.is_ok());
    assert!(b.is_ok());
    recorder.assert_issued_once("u", "X");
    assert!(journey.has_document("X"));
    simulation.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_fails_new_requests_and_failure_is_sticky() {
    let (simulation, recorder) = harness(
        config(vec![quick_office("A", 1)], vec![document("X", "A", &[])]),
        vec![],
    );
    simulation.shutdown().await;

    let journey = simulation.orchestrator().journey("u");
    let outcome = journey.request_document("X").await;
    assert!(matches!(outcome, Err(IssuanceError::ShuttingDown(_))));
    assert!(!journey.has_document("X"));

    // The failed attempt stays memoized; no new submission is made.
    let again = journey.request_document("X").await;
    assert!(matches!(again, Err(IssuanceError::ShuttingDown(_))));
    assert_eq!(recorder.queue_count("u", "X"), 0);
}

#[tokio::test(start_paused = true)]
async fn full_scenario_issues_prerequisites_first() {
    let customers = vec![
        walk_in("Mara", &["BUSINESS_LICENSE"]),
        walk_in("Ion", &["RESIDENCE_CERTIFICATE"]),
        walk_in("Alex", &["TAX_CLEARANCE", "HEALTH_CARD"]),
        walk_in("Dana", &["ID_CARD"]),
        walk_in("Vlad", &["BUSINESS_LICENSE"]),
    ];
    let recorder = RecordingReporter::new();
    let simulation = SimulationBuilder::new(bureau::SimulationConfig::sample(), customers)
        .with_reporter(Arc::new(recorder.clone()))
        .with_oracle(Arc::new(MidpointOracle))
        .with_break_window(Duration::from_millis(700), Duration::from_millis(900))
        .build();
    simulation.run().await.unwrap();
    simulation.shutdown().await;

    // Every issuance happened after every one of its prerequisites, per
    // customer, and nothing was issued twice.
    let events = recorder.events();
    let mut seen: Vec<(String, String)> = Vec::new();
    for event in &events {
        if let SimulationEvent::Issued { result } = event {
            let key = (result.customer_id.clone(), result.document_name.clone());
            assert!(!seen.contains(&key), "duplicate issuance: {key:?}");
            for dependency in &result.dependencies {
                assert!(
                    seen.contains(&(result.customer_id.clone(), dependency.clone())),
                    "{} issued for {} before prerequisite {}",
                    result.document_name,
                    result.customer_id,
                    dependency
                );
            }
            seen.push(key);
        }
    }

    recorder.assert_issued_once("Mara", "BUSINESS_LICENSE");
    recorder.assert_issued_once("Vlad", "BUSINESS_LICENSE");
    recorder.assert_issued_once("Ion", "RESIDENCE_CERTIFICATE");
    recorder.assert_issued_once("Alex", "TAX_CLEARANCE");
    recorder.assert_issued_once("Alex", "HEALTH_CARD");
    recorder.assert_issued_once("Dana", "ID_CARD");
}
