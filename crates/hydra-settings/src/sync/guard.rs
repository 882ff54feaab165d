//! Scope-keyed reentrancy guards

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::models::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardKind {
    /// A reconciliation for the scope is running
    Sync,
    /// A remote snapshot is being written into the local store
    Apply,
}

#[derive(Debug, Default, Clone, Copy)]
struct GuardState {
    syncing: bool,
    applying: bool,
}

impl GuardState {
    fn flag(&mut self, kind: GuardKind) -> &mut bool {
        match kind {
            GuardKind::Sync => &mut self.syncing,
            GuardKind::Apply => &mut self.applying,
        }
    }

    const fn is_idle(self) -> bool {
        !self.syncing && !self.applying
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScopeGuards {
    states: Mutex<HashMap<Scope, GuardState>>,
}

impl ScopeGuards {
    /// Raise `kind` for `scope`, or `None` if it is already raised.
    pub(crate) fn try_enter(&self, scope: &Scope, kind: GuardKind) -> Option<ScopeGuard<'_>> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let flag = states.entry(scope.clone()).or_default().flag(kind);
        if *flag {
            return None;
        }
        *flag = true;
        Some(ScopeGuard {
            guards: self,
            scope: scope.clone(),
            kind,
        })
    }

    pub(crate) fn is_active(&self, scope: &Scope, kind: GuardKind) -> bool {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .get_mut(scope)
            .is_some_and(|state| *state.flag(kind))
    }

    fn release(&self, scope: &Scope, kind: GuardKind) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get_mut(scope) {
            *state.flag(kind) = false;
            if state.is_idle() {
                states.remove(scope);
            }
        }
    }
}

/// Lowers its flag when dropped, on every exit path including unwinding.
pub(crate) struct ScopeGuard<'a> {
    guards: &'a ScopeGuards,
    scope: Scope,
    kind: GuardKind,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.guards.release(&self.scope, self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_exclusive_per_scope_and_kind() {
        let guards = ScopeGuards::default();
        let alice = Scope::from_username(Some("alice"));
        let bob = Scope::from_username(Some("bob"));

        let sync = guards.try_enter(&alice, GuardKind::Sync).unwrap();
        assert!(guards.try_enter(&alice, GuardKind::Sync).is_none());
        assert!(guards.try_enter(&bob, GuardKind::Sync).is_some());

        let apply = guards.try_enter(&alice, GuardKind::Apply).unwrap();
        assert!(guards.is_active(&alice, GuardKind::Apply));

        drop(apply);
        assert!(!guards.is_active(&alice, GuardKind::Apply));
        assert!(guards.is_active(&alice, GuardKind::Sync));

        drop(sync);
        assert!(guards.try_enter(&alice, GuardKind::Sync).is_some());
    }

    #[test]
    fn guard_released_on_panic() {
        let guards = ScopeGuards::default();
        let alice = Scope::from_username(Some("alice"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = guards.try_enter(&alice, GuardKind::Apply).unwrap();
            panic!("store exploded");
        }));

        assert!(result.is_err());
        assert!(!guards.is_active(&alice, GuardKind::Apply));
    }
}
