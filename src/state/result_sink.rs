use crate::state::Record;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Append-only collection of records shared by every fetch worker
///
/// Each append happens under the lock, so a record is either fully present or
/// absent. Order across pages follows completion order and is not stable.
#[derive(Debug, Default)]
pub struct ResultSink {
    records: Mutex<Vec<Record>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: Record) {
        self.lock().push(record);
    }

    /// Appends all records of one page under a single lock
    pub fn extend(&self, records: impl IntoIterator<Item = Record>) {
        self.lock().extend(records);
    }

    /// Copies the current contents
    ///
    /// Only complete once the scheduler has drained every worker.
    pub fn snapshot(&self) -> Vec<Record> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
