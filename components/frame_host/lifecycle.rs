/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The lifecycle state machine of a frame.
//!
//! A frame's lifecycle state is the only place where "is this frame active?",
//! "is it cached?" or "is it being deleted?" is recorded. Everything else is
//! derived from it, so the answers can never disagree with each other.

use std::fmt;

use frame_host_traits::LifecycleState;

/// The full lifecycle of a frame, including the distinction between running unload
/// handlers and being ready for deletion, which observers do not see.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LifecycleStateImpl {
    /// Created to evaluate a navigation that may need a new document host. Not
    /// associated with a commit yet.
    Speculative,
    /// A commit was sent to the renderer and has not been acknowledged.
    PendingCommit,
    /// Part of a page that is being prerendered and not shown.
    Prerendering,
    /// A normal, visible document.
    Active,
    /// Part of a suspended page that can be restored or evicted.
    InBackForwardCache,
    /// Being removed; unload handlers may still be running in the renderer.
    RunningUnloadHandlers,
    /// Being removed and waiting only for structural removal.
    ReadyToBeDeleted,
}

use self::LifecycleStateImpl::*;

impl LifecycleStateImpl {
    /// The states reachable from this one in a single transition.
    pub fn legal_successors(self) -> &'static [LifecycleStateImpl] {
        match self {
            Speculative => &[Active, PendingCommit],
            PendingCommit => &[Prerendering, Active, ReadyToBeDeleted],
            Prerendering => &[Active, RunningUnloadHandlers, ReadyToBeDeleted],
            Active => &[InBackForwardCache, RunningUnloadHandlers, ReadyToBeDeleted],
            InBackForwardCache => &[Active, ReadyToBeDeleted],
            RunningUnloadHandlers => &[ReadyToBeDeleted],
            ReadyToBeDeleted => &[],
        }
    }

    pub fn can_transition_to(self, to: LifecycleStateImpl) -> bool {
        self.legal_successors().contains(&to)
    }

    pub fn is_active(self) -> bool {
        self == Active
    }

    /// Inactive frames may not process most renderer-originated events.
    pub fn is_inactive(self) -> bool {
        !self.is_active()
    }

    pub fn is_pending_deletion(self) -> bool {
        matches!(self, RunningUnloadHandlers | ReadyToBeDeleted)
    }

    pub fn is_in_back_forward_cache(self) -> bool {
        self == InBackForwardCache
    }

    pub fn is_prerendering(self) -> bool {
        self == Prerendering
    }

    /// Speculative and pending-commit frames have no committed document.
    pub fn has_committed_document(self) -> bool {
        !matches!(self, Speculative | PendingCommit)
    }

    /// The coarse state exposed to observers.
    pub fn to_public(self) -> LifecycleState {
        match self {
            Speculative => LifecycleState::Speculative,
            PendingCommit => LifecycleState::PendingCommit,
            Prerendering => LifecycleState::Prerendering,
            Active => LifecycleState::Active,
            InBackForwardCache => LifecycleState::InBackForwardCache,
            RunningUnloadHandlers | ReadyToBeDeleted => LifecycleState::PendingDeletion,
        }
    }
}

impl fmt::Display for LifecycleStateImpl {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, fmt)
    }
}

/// An attempt to apply an edge that is not in the transition table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("illegal lifecycle transition from {from} to {to}")]
pub struct IllegalLifecycleTransition {
    pub from: LifecycleStateImpl,
    pub to: LifecycleStateImpl,
}

/// The lifecycle state of one frame. The state can only change along the edges
/// of the transition table.
#[derive(Clone, Debug)]
pub struct Lifecycle {
    state: LifecycleStateImpl,
}

impl Lifecycle {
    pub fn new(initial: LifecycleStateImpl) -> Lifecycle {
        Lifecycle { state: initial }
    }

    pub fn state(&self) -> LifecycleStateImpl {
        self.state
    }

    /// Move to `to`, returning the previous state. An illegal transition leaves
    /// the state untouched.
    pub fn transition_to(
        &mut self,
        to: LifecycleStateImpl,
    ) -> Result<LifecycleStateImpl, IllegalLifecycleTransition> {
        if !self.state.can_transition_to(to) {
            return Err(IllegalLifecycleTransition {
                from: self.state,
                to,
            });
        }
        Ok(std::mem::replace(&mut self.state, to))
    }
}
