/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use frame_host_traits::{NavigationRequestId, NavigationToken};
use rustc_hash::FxHashMap;

use crate::navigation_request::{NavigationRequest, NavigationState};

/// The navigations a frame has been asked to commit and has not finished
/// committing. Cross-document navigations are keyed by request id;
/// same-document ones by navigation token, since that is all the renderer
/// reports back for them.
#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    cross_document: FxHashMap<NavigationRequestId, NavigationRequest>,
    same_document: FxHashMap<NavigationToken, NavigationRequest>,
}

impl PendingRequestRegistry {
    pub fn track(&mut self, request: NavigationRequest) {
        if request.is_same_document() {
            self.same_document.insert(request.token(), request);
        } else {
            self.cross_document.insert(request.id(), request);
        }
    }

    pub fn get(&self, id: NavigationRequestId) -> Option<&NavigationRequest> {
        self.cross_document.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NavigationRequestId) -> Option<&mut NavigationRequest> {
        self.cross_document.get_mut(&id)
    }

    /// Stop tracking a cross-document navigation.
    pub fn cancel(&mut self, id: NavigationRequestId) -> Option<NavigationRequest> {
        self.cross_document.remove(&id)
    }

    pub fn find_by_token(&self, token: NavigationToken) -> Option<&NavigationRequest> {
        self.cross_document
            .values()
            .find(|request| request.token() == token)
    }

    pub(crate) fn take_by_token(&mut self, token: NavigationToken) -> Option<NavigationRequest> {
        let id = self.find_by_token(token)?.id();
        self.cross_document.remove(&id)
    }

    pub fn take_same_document(&mut self, token: NavigationToken) -> Option<NavigationRequest> {
        self.same_document.remove(&token)
    }

    /// The most recently started cross-document navigation that has been sent to
    /// the renderer and has not committed yet. Ties in start time go to the
    /// request created last.
    pub fn most_recent_committing(&self) -> Option<&NavigationRequest> {
        self.cross_document
            .values()
            .filter(|request| {
                request.state() >= NavigationState::ReadyToCommit &&
                    request.state() < NavigationState::Committed
            })
            .max_by_key(|request| (request.start_time(), request.id()))
    }

    /// Whether any cross-document navigation is waiting for the renderer.
    pub fn has_pending_commit(&self) -> bool {
        self.cross_document
            .values()
            .any(|request| request.state() == NavigationState::ReadyToCommit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NavigationRequest> + '_ {
        self.cross_document.values().chain(self.same_document.values())
    }

    /// Stop tracking everything.
    pub fn drain(&mut self) -> Vec<NavigationRequest> {
        self.cross_document
            .drain()
            .map(|(_, request)| request)
            .chain(self.same_document.drain().map(|(_, request)| request))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cross_document.len() + self.same_document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cross_document.is_empty() && self.same_document.is_empty()
    }
}
