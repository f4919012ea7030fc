/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The beforeunload round trip.
//!
//! Before a navigation replaces documents with beforeunload handlers, the
//! renderers hosting them are asked to run the handlers, and the commit is held
//! until every one of them answered. One message goes to the topmost frame of
//! each same-process region of the navigated subtree that has a handler. A
//! navigation started by a renderer already ran the handlers of its own region.

use std::time::Instant;

use frame_host_traits::{
    BeforeUnloadReply, FrameHostToRendererMsg, NavigationRequestId, NavigationType,
    RendererProcessId,
};
use log::{debug, warn};

use crate::errors::FrameHostError;
use crate::frame_host_manager::FrameHostManager;
use crate::frame_tree::FrameId;
use crate::lifecycle::LifecycleStateImpl;
use crate::navigation_request::{NavigationRequest, NavigationState};
use crate::timer_scheduler::{TimerEvent, TimerId};

/// A navigation held until renderers ran beforeunload handlers.
#[derive(Debug)]
pub(crate) struct BeforeUnloadWait {
    pub(crate) request: NavigationRequestId,
    /// The frame tracking the held navigation.
    pub(crate) target: FrameId,
    /// Frames that were sent `BeforeUnload` and have not answered.
    pub(crate) awaiting: Vec<FrameId>,
    pub(crate) deadline: TimerId,
}

impl FrameHostManager {
    /// The frames whose renderer must run beforeunload handlers before `request`
    /// commits, parents before children.
    pub(crate) fn before_unload_targets(&self, request: &NavigationRequest) -> Vec<FrameId> {
        if request.is_same_document() || request.is_page_activation() || request.is_error_page() {
            return vec![];
        }
        let position = request.frame();
        let is_shown = self
            .tree
            .get(position)
            .is_some_and(|frame| frame.lifecycle_state() == LifecycleStateImpl::Active);
        if !is_shown {
            return vec![];
        }

        let mut targets = vec![];
        for id in self.tree.subtree(position, false) {
            let Some(frame) = self.tree.get(id) else {
                continue;
            };
            if frame.lifecycle_state() != LifecycleStateImpl::Active ||
                !frame.has_before_unload_handler
            {
                continue;
            }
            let mut region_root = id;
            while region_root != position && !self.tree.is_local_root(region_root) {
                match self.tree.parent(region_root) {
                    Some(parent) => region_root = parent,
                    None => break,
                }
            }
            if request.is_renderer_initiated() && region_root == position {
                continue;
            }
            if !targets.contains(&region_root) {
                targets.push(region_root);
            }
        }
        targets
    }

    /// Ask the renderers of `targets` to run beforeunload handlers, and hold
    /// `request` until they answered.
    pub(crate) fn wait_for_before_unload(
        &mut self,
        mut request: NavigationRequest,
        targets: Vec<FrameId>,
    ) -> Result<(), FrameHostError> {
        request.set_state(NavigationState::WaitingForBeforeUnload)?;
        let is_reload = request.navigation_type() == NavigationType::Reload;
        let mut awaiting = vec![];
        for id in targets {
            let Some(routing_id) = self.tree.get(id).map(|frame| frame.routing_id) else {
                continue;
            };
            let msg = FrameHostToRendererMsg::BeforeUnload(routing_id, is_reload);
            match self.send_to_frame(id, msg) {
                Ok(()) => awaiting.push(id),
                Err(error) => debug!("Could not run beforeunload handlers of {id:?}: {error}"),
            }
        }
        if awaiting.is_empty() {
            return self.commit_navigation(request);
        }

        let now = Instant::now();
        let request_id = request.id();
        let target = request.target_frame();
        request.timing.before_unload_sent = Some(now);
        let deadline = self.timers.schedule(
            now,
            self.prefs.before_unload_timeout(),
            TimerEvent::BeforeUnloadDeadline(request_id),
        );
        debug!(
            "Navigation {request_id} waits for beforeunload handlers in {} frames",
            awaiting.len()
        );
        self.before_unload_waits.push(BeforeUnloadWait {
            request: request_id,
            target,
            awaiting,
            deadline,
        });
        if let Some(frame) = self.tree.get_mut(target) {
            frame.pending_requests.track(request);
        }
        Ok(())
    }

    /// The renderer of `id` ran beforeunload handlers. Answers go to the oldest
    /// navigation waiting for that frame.
    pub(crate) fn on_before_unload_completed(&mut self, id: FrameId, reply: BeforeUnloadReply) {
        let Some(wait) = self
            .before_unload_waits
            .iter_mut()
            .find(|wait| wait.awaiting.contains(&id))
        else {
            debug!("Ignoring unexpected beforeunload reply from {id:?}");
            return;
        };
        wait.awaiting.retain(|frame| *frame != id);
        let (request_id, target, is_done) = (wait.request, wait.target, wait.awaiting.is_empty());

        let request = self
            .tree
            .get_mut(target)
            .and_then(|frame| frame.pending_requests.get_mut(request_id));
        let Some(request) = request else {
            self.forget_before_unload_wait(request_id);
            return;
        };
        request.timing.record_before_unload_reply(reply.handler_duration);

        if !reply.proceed {
            debug!("Beforeunload handlers of {id:?} cancelled navigation {request_id}");
            if let Err(error) = self.cancel_request(target, request_id) {
                self.forget_before_unload_wait(request_id);
                debug!("Could not cancel navigation {request_id}: {error}");
            }
            if let Some(frame) = self.tree.get(id) {
                self.delegate.notify_navigation_cancelled(frame.token, request_id);
            }
            return;
        }
        if is_done {
            if let Some(wait) = self.forget_before_unload_wait(request_id) {
                self.proceed_after_before_unload(wait);
            }
        }
    }

    pub(crate) fn on_before_unload_deadline(
        &mut self,
        request_id: NavigationRequestId,
        timer: TimerId,
    ) {
        let Some(index) = self
            .before_unload_waits
            .iter()
            .position(|wait| wait.request == request_id && wait.deadline == timer)
        else {
            return;
        };
        let wait = self.before_unload_waits.remove(index);
        warn!("Beforeunload handlers did not answer in time, navigation {request_id} goes on");
        self.proceed_after_before_unload(wait);
    }

    /// Send the commit of a navigation whose beforeunload handlers all ran.
    fn proceed_after_before_unload(&mut self, wait: BeforeUnloadWait) {
        let request_id = wait.request;
        let Some(mut request) = self
            .tree
            .get_mut(wait.target)
            .and_then(|frame| frame.pending_requests.cancel(request_id))
        else {
            return;
        };
        request.timing.before_unload_completed = Some(Instant::now());
        if let Err(error) = self.commit_navigation(request) {
            warn!("Cannot commit navigation {request_id}: {error}");
            let is_idle_speculative_frame = self.tree.get(wait.target).is_some_and(|frame| {
                !frame.lifecycle_state().has_committed_document() &&
                    frame.pending_requests.is_empty()
            });
            if is_idle_speculative_frame {
                self.discard_speculative_frame(wait.target);
            }
        }
    }

    /// Stop holding a navigation.
    pub(crate) fn forget_before_unload_wait(
        &mut self,
        request_id: NavigationRequestId,
    ) -> Option<BeforeUnloadWait> {
        let index = self
            .before_unload_waits
            .iter()
            .position(|wait| wait.request == request_id)?;
        let wait = self.before_unload_waits.remove(index);
        self.timers.cancel(wait.deadline);
        Some(wait)
    }

    /// `id` is going away: navigations it tracks are dropped, and navigations
    /// waiting for its answer stop waiting.
    pub(crate) fn forget_frame_in_before_unload_waits(&mut self, id: FrameId) {
        let dropped: Vec<NavigationRequestId> = self
            .before_unload_waits
            .iter()
            .filter(|wait| wait.target == id)
            .map(|wait| wait.request)
            .collect();
        for request_id in dropped {
            self.forget_before_unload_wait(request_id);
        }
        self.stop_awaiting(|frame| frame == id);
    }

    /// Frames hosted by a process that went away will not answer.
    pub(crate) fn forget_process_in_before_unload_waits(&mut self, process_id: RendererProcessId) {
        let hosted: Vec<FrameId> = self
            .before_unload_waits
            .iter()
            .flat_map(|wait| wait.awaiting.iter().copied())
            .filter(|id| self.tree.get(*id).is_some_and(|frame| frame.process_id == process_id))
            .collect();
        self.stop_awaiting(|frame| hosted.contains(&frame));
    }

    fn stop_awaiting(&mut self, gone: impl Fn(FrameId) -> bool) {
        let mut ready = vec![];
        for wait in &mut self.before_unload_waits {
            wait.awaiting.retain(|frame| !gone(*frame));
            if wait.awaiting.is_empty() {
                ready.push(wait.request);
            }
        }
        for request_id in ready {
            if let Some(wait) = self.forget_before_unload_wait(request_id) {
                self.proceed_after_before_unload(wait);
            }
        }
    }

    /// Whether `request_id` is held until beforeunload handlers ran.
    pub fn is_waiting_for_before_unload(&self, request_id: NavigationRequestId) -> bool {
        self.before_unload_waits
            .iter()
            .any(|wait| wait.request == request_id)
    }
}
