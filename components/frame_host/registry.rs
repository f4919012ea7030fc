/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use frame_host_traits::{FrameToken, RendererProcessId, RoutingId};
use rustc_hash::FxHashMap;

use crate::errors::FrameHostError;
use crate::frame_tree::FrameId;

/// Finds frames by the identifiers renderers use for them.
///
/// A frame is registered for exactly as long as it is in its frame tree. The
/// registry is shared with whoever routes renderer messages, but it belongs to a
/// single frame tree, since frame ids are only meaningful there.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    by_token: FxHashMap<FrameToken, FrameId>,
    by_routing_id: FxHashMap<(RendererProcessId, RoutingId), FrameId>,
}

impl FrameRegistry {
    pub fn new() -> FrameRegistry {
        FrameRegistry::default()
    }

    pub(crate) fn insert(
        &mut self,
        token: FrameToken,
        process_id: RendererProcessId,
        routing_id: RoutingId,
        id: FrameId,
    ) -> Result<(), FrameHostError> {
        if self.by_token.contains_key(&token) {
            return Err(FrameHostError::DuplicateFrame(token.to_string()));
        }
        if self.by_routing_id.contains_key(&(process_id, routing_id)) {
            return Err(FrameHostError::DuplicateFrame(format!(
                "{routing_id} in process {process_id}"
            )));
        }
        self.by_token.insert(token, id);
        self.by_routing_id.insert((process_id, routing_id), id);
        Ok(())
    }

    pub(crate) fn remove(
        &mut self,
        token: FrameToken,
        process_id: RendererProcessId,
        routing_id: RoutingId,
    ) {
        self.by_token.remove(&token);
        self.by_routing_id.remove(&(process_id, routing_id));
    }

    pub fn find_by_token(&self, token: FrameToken) -> Option<FrameId> {
        self.by_token.get(&token).copied()
    }

    pub fn find_by_routing_id(
        &self,
        process_id: RendererProcessId,
        routing_id: RoutingId,
    ) -> Option<FrameId> {
        self.by_routing_id.get(&(process_id, routing_id)).copied()
    }

    pub fn is_registered(&self, token: FrameToken) -> bool {
        self.by_token.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}
