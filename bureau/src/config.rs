use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable description of one office: its counters, service window, and
/// coffee-break length.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfficeSpec {
    /// Office name, unique within a configuration.
    pub name: String,
    /// Number of parallel counters (workers). Must be at least one.
    pub counters: usize,
    /// Lower bound of the simulated service time.
    pub min_service: Duration,
    /// Upper bound of the simulated service time.
    pub max_service: Duration,
    /// Length of a coffee break; zero disables breaks for this office.
    pub break_duration: Duration,
}

impl OfficeSpec {
    /// Convenience constructor.
    pub fn new(
        name: impl Into<String>,
        counters: usize,
        min_service: Duration,
        max_service: Duration,
        break_duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            counters,
            min_service,
            max_service,
            break_duration,
        }
    }
}

/// Immutable description of one document: where it is issued and which
/// documents the customer must already hold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// Document name, unique within a configuration.
    pub name: String,
    /// Name of the office that issues this document.
    pub issuing_office: String,
    /// Prerequisite documents, in declaration order.
    pub dependencies: Vec<String>,
}

impl DocumentSpec {
    /// Convenience constructor.
    pub fn new(
        name: impl Into<String>,
        issuing_office: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            issuing_office: issuing_office.into(),
            dependencies,
        }
    }
}

/// One customer: who they are, what they want, and when they show up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Customer identifier, used in all narration.
    pub customer_id: String,
    /// Target documents, requested concurrently on arrival.
    pub requested_documents: Vec<String>,
    /// Delay before the customer enters the building.
    pub arrival_delay: Duration,
}

impl CustomerProfile {
    /// Convenience constructor.
    pub fn new(
        customer_id: impl Into<String>,
        requested_documents: Vec<String>,
        arrival_delay: Duration,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            requested_documents,
            arrival_delay,
        }
    }
}

/// Construction-time validation failures for [`SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two offices share a name.
    #[error("duplicate office: {0}")]
    DuplicateOffice(String),

    /// Two documents share a name.
    #[error("duplicate document: {0}")]
    DuplicateDocument(String),

    /// An office was declared without counters.
    #[error("office {0} must have at least one counter")]
    NoCounters(String),

    /// An office's service window is inverted.
    #[error("office {0} has max service time below min service time")]
    ServiceWindow(String),

    /// A document names an office that does not exist.
    #[error("document {document} names unknown issuing office {office}")]
    UnknownIssuingOffice {
        /// The offending document.
        document: String,
        /// The missing office.
        office: String,
    },

    /// A document depends on a document that does not exist.
    #[error("document {document} depends on unknown document {dependency}")]
    UnknownDependency {
        /// The offending document.
        document: String,
        /// The missing prerequisite.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle involving document {0}")]
    DependencyCycle(String),
}

/// Validated, immutable set of offices and documents. Shared read-only by
/// every other component; lookups are O(1).
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    offices: Vec<OfficeSpec>,
    documents: Vec<DocumentSpec>,
    office_index: HashMap<String, usize>,
    document_index: HashMap<String, usize>,
}

impl SimulationConfig {
    /// Validate and index the given offices and documents.
    ///
    /// Rejects duplicate names, zero-counter offices, inverted service
    /// windows, references to unknown offices or documents, and dependency
    /// cycles.
    pub fn new(
        offices: Vec<OfficeSpec>,
        documents: Vec<DocumentSpec>,
    ) -> Result<Self, ConfigError> {
        let mut office_index = HashMap::with_capacity(offices.len());
        for (position, office) in offices.iter().enumerate() {
            if office_index.insert(office.name.clone(), position).is_some() {
                return Err(ConfigError::DuplicateOffice(office.name.clone()));
            }
            if office.counters == 0 {
                return Err(ConfigError::NoCounters(office.name.clone()));
            }
            if office.max_service < office.min_service {
                return Err(ConfigError::ServiceWindow(office.name.clone()));
            }
        }

        let mut document_index = HashMap::with_capacity(documents.len());
        for (position, document) in documents.iter().enumerate() {
            if document_index
                .insert(document.name.clone(), position)
                .is_some()
            {
                return Err(ConfigError::DuplicateDocument(document.name.clone()));
            }
        }
        for document in &documents {
            if !office_index.contains_key(&document.issuing_office) {
                return Err(ConfigError::UnknownIssuingOffice {
                    document: document.name.clone(),
                    office: document.issuing_office.clone(),
                });
            }
            for dependency in &document.dependencies {
                if !document_index.contains_key(dependency) {
                    return Err(ConfigError::UnknownDependency {
                        document: document.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let config = Self {
            offices,
            documents,
            office_index,
            document_index,
        };
        config.reject_cycles()?;
        Ok(config)
    }

    /// Depth-first walk over the dependency graph; a back edge is a cycle.
    fn reject_cycles(&self) -> Result<(), ConfigError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        fn visit(
            config: &SimulationConfig,
            name: &str,
            marks: &mut HashMap<String, Mark>,
        ) -> Result<(), ConfigError> {
            match marks.get(name).copied().unwrap_or(Mark::Unvisited) {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    return Err(ConfigError::DependencyCycle(name.to_string()))
                }
                Mark::Unvisited => {}
            }
            marks.insert(name.to_string(), Mark::InProgress);
            if let Some(document) = config.document(name) {
                for dependency in &document.dependencies {
                    visit(config, dependency, marks)?;
                }
            }
            marks.insert(name.to_string(), Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::with_capacity(self.documents.len());
        for document in &self.documents {
            visit(self, &document.name, &mut marks)?;
        }
        Ok(())
    }

    /// Look up an office by name.
    pub fn office(&self, name: &str) -> Option<&OfficeSpec> {
        self.office_index.get(name).map(|&i| &self.offices[i])
    }

    /// Look up a document by name.
    pub fn document(&self, name: &str) -> Option<&DocumentSpec> {
        self.document_index.get(name).map(|&i| &self.documents[i])
    }

    /// All offices, in declaration order.
    pub fn offices(&self) -> &[OfficeSpec] {
        &self.offices
    }

    /// All documents, in declaration order.
    pub fn documents(&self) -> &[DocumentSpec] {
        &self.documents
    }

    /// The scenario used by the demo: four offices and a small paper trail
    /// of interdependent documents.
    pub fn sample() -> Self {
        let offices = vec![
            OfficeSpec::new(
                "Civil Registry",
                3,
                Duration::from_millis(400),
                Duration::from_millis(900),
                Duration::from_secs(3),
            ),
            OfficeSpec::new(
                "Tax Authority",
                3,
                Duration::from_millis(450),
                Duration::from_millis(1000),
                Duration::from_secs(4),
            ),
            OfficeSpec::new(
                "City Hall",
                3,
                Duration::from_millis(500),
                Duration::from_millis(1100),
                Duration::from_secs(5),
            ),
            OfficeSpec::new(
                "Health Insurance Fund",
                2,
                Duration::from_millis(400),
                Duration::from_millis(900),
                Duration::from_secs(3),
            ),
        ];

        let documents = vec![
            DocumentSpec::new("ID_APPLICATION", "Civil Registry", vec![]),
            DocumentSpec::new(
                "ID_CARD",
                "Civil Registry",
                vec!["ID_APPLICATION".to_string()],
            ),
            DocumentSpec::new("TAX_NUMBER", "Tax Authority", vec!["ID_CARD".to_string()]),
            DocumentSpec::new(
                "TAX_CLEARANCE",
                "Tax Authority",
                vec!["TAX_NUMBER".to_string()],
            ),
            DocumentSpec::new(
                "HEALTH_CARD",
                "Health Insurance Fund",
                vec!["ID_CARD".to_string()],
            ),
            DocumentSpec::new(
                "RESIDENCE_CERTIFICATE",
                "City Hall",
                vec!["ID_CARD".to_string(), "TAX_CLEARANCE".to_string()],
            ),
            DocumentSpec::new(
                "BUSINESS_LICENSE",
                "City Hall",
                vec![
                    "RESIDENCE_CERTIFICATE".to_string(),
                    "TAX_CLEARANCE".to_string(),
                    "HEALTH_CARD".to_string(),
                ],
            ),
        ];

        Self::new(offices, documents).expect("sample configuration is valid")
    }
}
