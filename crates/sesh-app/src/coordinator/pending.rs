//! In-flight request bookkeeping.
//!
//! Each outstanding provider operation owns exactly one `PendingCallback`.
//! It is taken out of its slot when the operation completes or times out, and
//! releasing it clears the delegate registration on the provider that
//! issued it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use steamsesh_domain::{DelegateHandle, LocalIdentity, RequestId, RequestKind, SessionSettings};
use steamsesh_ports::PlatformSessionProvider;

pub(crate) struct PendingCallback {
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub provider: Arc<dyn PlatformSessionProvider>,
    /// Set once the completion delegate has been registered
    pub handle: Option<DelegateHandle>,
    pub started_at: DateTime<Utc>,
}

impl PendingCallback {
    pub fn new(
        request_id: RequestId,
        kind: RequestKind,
        provider: Arc<dyn PlatformSessionProvider>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            kind,
            provider,
            handle: None,
            started_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        (now - self.started_at)
            .to_std()
            .map(|elapsed| elapsed >= timeout)
            .unwrap_or(false)
    }

    /// Clear the delegate registration. Must not be called with the
    /// coordinator state locked.
    pub fn release(self) {
        let Some(handle) = self.handle else {
            return;
        };
        match self.kind {
            RequestKind::Create => self.provider.clear_on_create_session_complete(handle),
            RequestKind::Find => self.provider.clear_on_find_sessions_complete(handle),
            RequestKind::Join => self.provider.clear_on_join_session_complete(handle),
            RequestKind::Destroy => self.provider.clear_on_destroy_session_complete(handle),
        }
    }
}

/// One slot per request kind.
#[derive(Default)]
pub(crate) struct PendingOps {
    create: Option<PendingCallback>,
    find: Option<PendingCallback>,
    join: Option<PendingCallback>,
    destroy: Option<PendingCallback>,
}

impl PendingOps {
    fn slot(&mut self, kind: RequestKind) -> &mut Option<PendingCallback> {
        match kind {
            RequestKind::Create => &mut self.create,
            RequestKind::Find => &mut self.find,
            RequestKind::Join => &mut self.join,
            RequestKind::Destroy => &mut self.destroy,
        }
    }

    pub fn is_pending(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Create => self.create.is_some(),
            RequestKind::Find => self.find.is_some(),
            RequestKind::Join => self.join.is_some(),
            RequestKind::Destroy => self.destroy.is_some(),
        }
    }

    pub fn insert(&mut self, pending: PendingCallback) {
        let kind = pending.kind;
        *self.slot(kind) = Some(pending);
    }

    /// Record the delegate handle for `request_id`. Returns false when the
    /// request is no longer pending (already completed or expired).
    pub fn attach_handle(
        &mut self,
        kind: RequestKind,
        request_id: RequestId,
        handle: DelegateHandle,
    ) -> bool {
        match self.slot(kind) {
            Some(pending) if pending.request_id == request_id => {
                pending.handle = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Take the pending entry only if it belongs to `request_id`.
    pub fn take_matching(
        &mut self,
        kind: RequestKind,
        request_id: RequestId,
    ) -> Option<PendingCallback> {
        let slot = self.slot(kind);
        if slot.as_ref().is_some_and(|p| p.request_id == request_id) {
            slot.take()
        } else {
            None
        }
    }

    pub fn provider_for(
        &self,
        kind: RequestKind,
        request_id: RequestId,
    ) -> Option<Arc<dyn PlatformSessionProvider>> {
        let slot = match kind {
            RequestKind::Create => &self.create,
            RequestKind::Find => &self.find,
            RequestKind::Join => &self.join,
            RequestKind::Destroy => &self.destroy,
        };
        slot.as_ref()
            .filter(|p| p.request_id == request_id)
            .map(|p| Arc::clone(&p.provider))
    }

    /// Take the entry for `kind` if it has outlived `timeout`.
    pub fn take_expired(
        &mut self,
        kind: RequestKind,
        now: DateTime<Utc>,
        timeout: std::time::Duration,
    ) -> Option<PendingCallback> {
        let slot = self.slot(kind);
        if slot.as_ref().is_some_and(|p| p.is_expired(now, timeout)) {
            slot.take()
        } else {
            None
        }
    }

    pub fn take(&mut self, kind: RequestKind) -> Option<PendingCallback> {
        self.slot(kind).take()
    }

    pub fn in_flight(&self) -> Vec<RequestKind> {
        [
            RequestKind::Create,
            RequestKind::Find,
            RequestKind::Join,
            RequestKind::Destroy,
        ]
        .into_iter()
        .filter(|kind| self.is_pending(*kind))
        .collect()
    }
}

/// A create waiting for the provider to confirm teardown of the old session.
pub(crate) struct ParkedCreate {
    pub request_id: RequestId,
    pub provider: Arc<dyn PlatformSessionProvider>,
    pub identity: LocalIdentity,
    pub settings: SessionSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use steamsesh_ports::MockPlatformSessionProvider;

    fn pending(kind: RequestKind, request_id: RequestId) -> PendingCallback {
        PendingCallback::new(
            request_id,
            kind,
            Arc::new(MockPlatformSessionProvider::new()),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn insert_fills_the_slot_of_its_kind() {
        let mut ops = PendingOps::default();
        let find_id = RequestId::new();
        ops.insert(pending(RequestKind::Find, find_id));
        ops.insert(pending(RequestKind::Destroy, RequestId::new()));

        assert_eq!(ops.in_flight(), vec![RequestKind::Find, RequestKind::Destroy]);
        assert!(!ops.is_pending(RequestKind::Create));
        assert!(ops.take_matching(RequestKind::Find, RequestId::new()).is_none());
        assert!(ops.take_matching(RequestKind::Find, find_id).is_some());
        assert_eq!(ops.in_flight(), vec![RequestKind::Destroy]);
    }

    #[test]
    fn expiry_is_measured_from_the_start_time() {
        let mut ops = PendingOps::default();
        ops.insert(pending(RequestKind::Create, RequestId::new()));
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let timeout = std::time::Duration::from_secs(30);

        let early = start + chrono::Duration::seconds(29);
        assert!(ops.take_expired(RequestKind::Create, early, timeout).is_none());
        let late = start + chrono::Duration::seconds(30);
        assert!(ops.take_expired(RequestKind::Create, late, timeout).is_some());
        assert!(ops.in_flight().is_empty());
    }
}
