//! Registered completion delegates of one kind.

use std::sync::{Arc, Mutex, PoisonError};

use steamsesh_domain::DelegateHandle;

/// Ordered list of delegates. Invocation always works on a snapshot so a
/// delegate may clear itself (or register another) while it runs.
pub(crate) struct DelegateList<F: ?Sized> {
    entries: Mutex<Vec<(DelegateHandle, Arc<F>)>>,
}

impl<F: ?Sized> Default for DelegateList<F> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> DelegateList<F> {
    pub fn add(&self, callback: Box<F>) -> DelegateHandle {
        let handle = DelegateHandle::new();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, Arc::from(callback)));
        handle
    }

    /// Returns false when the handle was not registered.
    pub fn remove(&self, handle: DelegateHandle) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(h, _)| *h != handle);
        entries.len() != before
    }

    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
