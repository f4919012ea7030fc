/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle state of a frame as seen by observers outside the frame host.
/// Removal is a single state here; the frame host tracks whether unload
/// handlers are still running internally.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LifecycleState {
    Speculative,
    PendingCommit,
    Prerendering,
    Active,
    InBackForwardCache,
    PendingDeletion,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            LifecycleState::Speculative => "speculative",
            LifecycleState::PendingCommit => "pending-commit",
            LifecycleState::Prerendering => "prerendering",
            LifecycleState::Active => "active",
            LifecycleState::InBackForwardCache => "in-back-forward-cache",
            LifecycleState::PendingDeletion => "pending-deletion",
        };
        fmt.write_str(name)
    }
}
