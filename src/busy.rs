use crate::actions::ActionKind;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};

/// Shared set of actions with a transaction in flight. Cloning shares the set.
#[derive(Clone, Debug, Default)]
pub struct BusyFlags {
    inner: Arc<Mutex<HashSet<ActionKind>>>,
}

impl BusyFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self, kind: ActionKind) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
    }

    /// Marks `kind` busy until the returned guard is dropped. `None` if it is
    /// already busy.
    pub fn try_acquire(&self, kind: ActionKind) -> Option<BusyGuard> {
        let inserted = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind);
        inserted.then(|| BusyGuard {
            flags: self.clone(),
            kind,
        })
    }
}

#[derive(Debug)]
pub struct BusyGuard {
    flags: BusyFlags,
    kind: ActionKind,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flags
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn try_acquire__second_guard_is_refused_until_drop() {
        // given
        let flags = BusyFlags::new();
        let guard = flags.try_acquire(ActionKind::Compete).unwrap();

        // when
        let second = flags.try_acquire(ActionKind::Compete);

        // then
        assert!(second.is_none());
        assert!(flags.is_busy(ActionKind::Compete));
        assert!(!flags.is_busy(ActionKind::Merge));
        drop(guard);
        assert!(!flags.is_busy(ActionKind::Compete));
    }

    #[test]
    fn clones_share_state() {
        let flags = BusyFlags::new();
        let observer = flags.clone();
        let _guard = flags.try_acquire(ActionKind::Shop).unwrap();
        assert!(observer.is_busy(ActionKind::Shop));
    }
}
