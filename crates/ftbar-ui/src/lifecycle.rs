//! Item lifecycle state machine.
//!
//! - Unmounted -> ScopeSeeding (mount begins, snapshots captured)
//! - ScopeSeeding -> Active (scope fully seeded, renders allowed)
//! - ScopeSeeding -> Unmounted (mount aborted)
//! - Active -> Unmounted (teardown)
//!
//! Every mount starts a new generation. A [`MountTicket`] taken while
//! Active lets background work check whether its item is still the same
//! mounted instance before applying a result.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ftbar_core::error::FtbarError;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    Unmounted,
    ScopeSeeding,
    Active,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::Unmounted => write!(f, "Unmounted"),
            ItemState::ScopeSeeding => write!(f, "ScopeSeeding"),
            ItemState::Active => write!(f, "Active"),
        }
    }
}

impl ItemState {
    pub fn can_transition_to(&self, target: &ItemState) -> bool {
        matches!(
            (self, target),
            (ItemState::Unmounted, ItemState::ScopeSeeding)
                | (ItemState::ScopeSeeding, ItemState::Active)
                | (ItemState::ScopeSeeding, ItemState::Unmounted)
                | (ItemState::Active, ItemState::Unmounted)
        )
    }
}

#[derive(Debug)]
struct LifecycleInner {
    state: ItemState,
    generation: u64,
    mount_id: Option<Uuid>,
}

/// Thread-safe lifecycle shared between an item and its tickets.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    inner: Arc<Mutex<LifecycleInner>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LifecycleInner {
                state: ItemState::Unmounted,
                generation: 0,
                mount_id: None,
            })),
        }
    }

    pub fn current(&self) -> ItemState {
        self.lock().state
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Identifier of the current mount, if mounted or mounting.
    pub fn mount_id(&self) -> Option<Uuid> {
        self.lock().mount_id
    }

    pub fn transition(&self, target: ItemState) -> Result<(), FtbarError> {
        let mut inner = self.lock();
        if !inner.state.can_transition_to(&target) {
            return Err(FtbarError::Lifecycle(format!(
                "Invalid state transition: {} -> {}",
                inner.state, target
            )));
        }
        match target {
            ItemState::ScopeSeeding => {
                inner.generation += 1;
                inner.mount_id = Some(Uuid::new_v4());
            }
            ItemState::Unmounted => inner.mount_id = None,
            ItemState::Active => {}
        }
        tracing::debug!(generation = inner.generation, "Item state: {} -> {}", inner.state, target);
        inner.state = target;
        Ok(())
    }

    /// A ticket for the current mount, or `None` unless Active.
    pub fn ticket(&self) -> Option<MountTicket> {
        let inner = self.lock();
        if inner.state != ItemState::Active {
            return None;
        }
        Some(MountTicket {
            lifecycle: self.clone(),
            generation: inner.generation,
            mount_id: inner.mount_id?,
        })
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of a specific mount, checked before applying async results.
#[derive(Debug, Clone)]
pub struct MountTicket {
    lifecycle: Lifecycle,
    generation: u64,
    mount_id: Uuid,
}

impl MountTicket {
    /// True while the item is Active in the generation the ticket was
    /// issued for.
    pub fn is_current(&self) -> bool {
        let inner = self.lifecycle.lock();
        inner.state == ItemState::Active && inner.generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mount_id(&self) -> Uuid {
        self.mount_id
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mounted() -> Lifecycle {
        let lc = Lifecycle::new();
        lc.transition(ItemState::ScopeSeeding).unwrap();
        lc.transition(ItemState::Active).unwrap();
        lc
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ItemState::Unmounted.to_string(), "Unmounted");
        assert_eq!(ItemState::ScopeSeeding.to_string(), "ScopeSeeding");
        assert_eq!(ItemState::Active.to_string(), "Active");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(ItemState::Unmounted.can_transition_to(&ItemState::ScopeSeeding));
        assert!(ItemState::ScopeSeeding.can_transition_to(&ItemState::Active));
        assert!(ItemState::ScopeSeeding.can_transition_to(&ItemState::Unmounted));
        assert!(ItemState::Active.can_transition_to(&ItemState::Unmounted));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!ItemState::Unmounted.can_transition_to(&ItemState::Active));
        assert!(!ItemState::Active.can_transition_to(&ItemState::ScopeSeeding));
        assert!(!ItemState::Unmounted.can_transition_to(&ItemState::Unmounted));
        assert!(!ItemState::Active.can_transition_to(&ItemState::Active));
    }

    #[test]
    fn test_invalid_transition_is_lifecycle_error() {
        let lc = Lifecycle::new();
        let err = lc.transition(ItemState::Active).unwrap_err();
        assert!(matches!(err, FtbarError::Lifecycle(_)));
        assert!(err.to_string().contains("Unmounted -> Active"));
        assert_eq!(lc.current(), ItemState::Unmounted);
    }

    #[test]
    fn test_generation_increments_per_mount() {
        let lc = mounted();
        assert_eq!(lc.generation(), 1);
        let first_mount = lc.mount_id().unwrap();
        lc.transition(ItemState::Unmounted).unwrap();
        assert!(lc.mount_id().is_none());
        lc.transition(ItemState::ScopeSeeding).unwrap();
        assert_eq!(lc.generation(), 2);
        assert_ne!(lc.mount_id().unwrap(), first_mount);
    }

    #[test]
    fn test_ticket_only_when_active() {
        let lc = Lifecycle::new();
        assert!(lc.ticket().is_none());
        lc.transition(ItemState::ScopeSeeding).unwrap();
        assert!(lc.ticket().is_none());
        lc.transition(ItemState::Active).unwrap();
        assert!(lc.ticket().is_some());
    }

    #[test]
    fn test_ticket_goes_stale_on_unmount() {
        let lc = mounted();
        let ticket = lc.ticket().unwrap();
        assert!(ticket.is_current());
        lc.transition(ItemState::Unmounted).unwrap();
        assert!(!ticket.is_current());
    }

    #[test]
    fn test_ticket_stays_stale_after_remount() {
        let lc = mounted();
        let ticket = lc.ticket().unwrap();
        lc.transition(ItemState::Unmounted).unwrap();
        lc.transition(ItemState::ScopeSeeding).unwrap();
        lc.transition(ItemState::Active).unwrap();
        assert!(!ticket.is_current());
        assert!(lc.ticket().unwrap().is_current());
    }

    #[test]
    fn test_ticket_checked_from_another_thread() {
        let lc = mounted();
        let ticket = lc.ticket().unwrap();
        let handle = std::thread::spawn(move || ticket.is_current());
        assert!(handle.join().unwrap());
    }
}
