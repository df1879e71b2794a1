use std::collections::HashMap;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt as _;
use parking_lot::Mutex;

use crate::error::IssuanceError;
use crate::orchestrator::DocumentOrchestrator;
use crate::task::IssuanceResult;

/// Memoized, shareable outcome of one document request.
///
/// Clones are handles onto the same underlying future; whichever holder polls
/// it drives the request forward.
pub type DocumentFuture = Shared<BoxFuture<'static, Result<IssuanceResult, IssuanceError>>>;

struct JourneyInner {
    customer_id: String,
    orchestrator: Arc<DocumentOrchestrator>,
    documents: Mutex<HashMap<String, DocumentFuture>>,
}

/// One customer's trip through the system.
///
/// Tracks every document the customer has requested so far; a name present in
/// the map — in flight or settled, successfully or not — claims the slot, so
/// at most one issuance task per (customer, document) ever reaches an office.
/// A settled failure stays memoized: the customer does not retry a document
/// whose first attempt failed.
#[derive(Clone)]
pub struct Journey {
    inner: Arc<JourneyInner>,
}

impl Journey {
    pub(crate) fn new(customer_id: impl Into<String>, orchestrator: Arc<DocumentOrchestrator>) -> Self {
        Self {
            inner: Arc::new(JourneyInner {
                customer_id: customer_id.into(),
                orchestrator,
                documents: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The customer this journey belongs to.
    pub fn customer_id(&self) -> &str {
        &self.inner.customer_id
    }

    /// Request a document, returning its memoized future.
    ///
    /// The first caller for a name installs the future atomically; concurrent
    /// callers converge on the same one. The request itself advances in
    /// whichever context polls the future.
    pub fn request_document(&self, name: &str) -> DocumentFuture {
        let mut documents = self.inner.documents.lock();
        if let Some(existing) = documents.get(name) {
            return existing.clone();
        }
        let future = self
            .inner
            .orchestrator
            .clone()
            .obtain(self.downgrade(), name.to_string())
            .shared();
        documents.insert(name.to_string(), future.clone());
        future
    }

    /// True only if the document was requested and issued successfully.
    pub fn has_document(&self, name: &str) -> bool {
        self.inner
            .documents
            .lock()
            .get(name)
            .and_then(|future| future.peek())
            .is_some_and(|outcome| outcome.is_ok())
    }

    pub(crate) fn downgrade(&self) -> JourneyHandle {
        JourneyHandle {
            customer_id: self.inner.customer_id.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Weak handle captured by task work bodies; keeps memoized futures from
/// keeping their own journey alive.
#[derive(Clone)]
pub(crate) struct JourneyHandle {
    customer_id: String,
    inner: Weak<JourneyInner>,
}

impl JourneyHandle {
    pub(crate) fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub(crate) fn upgrade(&self) -> Option<Journey> {
        self.inner.upgrade().map(|inner| Journey { inner })
    }
}
