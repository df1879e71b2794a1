use std::time::Duration;

use bureau::{CustomerProfile, DocumentSpec, OfficeSpec, SimulationConfig};

/// An office with a deterministic 10 ms service time and no breaks.
pub fn quick_office(name: &str, counters: usize) -> OfficeSpec {
    OfficeSpec::new(
        name,
        counters,
        Duration::from_millis(10),
        Duration::from_millis(10),
        Duration::ZERO,
    )
}

/// A document issued at `office` with the given prerequisites.
pub fn document(name: &str, office: &str, dependencies: &[&str]) -> DocumentSpec {
    DocumentSpec::new(
        name,
        office,
        dependencies.iter().map(|dep| dep.to_string()).collect(),
    )
}

/// A customer who walks in immediately.
pub fn walk_in(customer: &str, documents: &[&str]) -> CustomerProfile {
    CustomerProfile::new(
        customer,
        documents.iter().map(|doc| doc.to_string()).collect(),
        Duration::ZERO,
    )
}

/// Validate a config from fixture parts, panicking on mistakes in the test
/// itself.
pub fn config(offices: Vec<OfficeSpec>, documents: Vec<DocumentSpec>) -> SimulationConfig {
    SimulationConfig::new(offices, documents).expect("fixture configuration must be valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_parts_assemble_into_a_valid_config() {
        let cfg = config(
            vec![quick_office("A", 2)],
            vec![document("X", "A", &[]), document("Y", "A", &["X"])],
        );
        assert_eq!(cfg.document("Y").unwrap().dependencies, vec!["X"]);
        let profile = walk_in("u", &["Y"]);
        assert_eq!(profile.requested_documents, vec!["Y"]);
        assert!(profile.arrival_delay.is_zero());
    }
}
