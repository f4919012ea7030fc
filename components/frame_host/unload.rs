/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Removal of frames from the tree.
//!
//! A removed subtree is split into groups of frames that share a renderer
//! process: each group is unloaded by a single message to its topmost frame.
//! Frames whose document has no unload handler do not wait for the renderer and
//! become ready to be deleted right away. A frame is destroyed once it is ready
//! to be deleted and all of its children are gone, so parents always outlive
//! their children.

use std::time::Instant;

use frame_host_traits::{FrameHostToRendererMsg, UnloadKind};
use log::{debug, warn};

use crate::delegate::UnloadOutcome;
use crate::frame_host_manager::FrameHostManager;
use crate::frame_tree::{FrameId, FrameTree};
use crate::lifecycle::LifecycleStateImpl;
use crate::timer_scheduler::{TimerEvent, TimerId};

/// An unload sent to a renderer, kept on the topmost frame of the group.
#[derive(Debug)]
pub struct UnloadTicket {
    pub(crate) kind: UnloadKind,
    pub(crate) awaiting_ack: bool,
    pub(crate) deadline: Option<TimerId>,
    pub(crate) deadline_fired: bool,
    /// Every frame of the group, parents before children.
    pub(crate) members: Vec<FrameId>,
}

impl UnloadTicket {
    pub fn kind(&self) -> UnloadKind {
        self.kind
    }

    pub fn is_waiting_for_ack(&self) -> bool {
        self.awaiting_ack
    }

    pub fn deadline_fired(&self) -> bool {
        self.deadline_fired
    }
}

/// Frames of a removed subtree that are unloaded together.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnloadGroup {
    /// The topmost frame of the group, which receives the unload message.
    pub local_root: FrameId,
    /// Every frame of the group, parents before children.
    pub members: Vec<FrameId>,
    /// Whether any document of the group has an unload handler to run.
    pub has_unload_handler: bool,
}

pub struct UnloadCoordinator;

impl UnloadCoordinator {
    /// Split the frames below `root` that still have a document to unload into
    /// same-process groups. `root` always starts a group, even when its parent
    /// is hosted in the same process. Frames already being removed belong to
    /// an earlier removal and are left out.
    pub fn plan(tree: &FrameTree, root: FrameId) -> Vec<UnloadGroup> {
        let mut groups: Vec<UnloadGroup> = vec![];
        let mut group_of: Vec<(FrameId, usize)> = vec![];

        for id in tree.subtree(root, false) {
            let Some(frame) = tree.get(id) else {
                continue;
            };
            let state = frame.lifecycle_state();
            if state.is_pending_deletion() || !state.has_committed_document() {
                continue;
            }

            let parent_group = tree
                .parent(id)
                .filter(|_| id != root && !tree.is_local_root(id))
                .and_then(|parent| {
                    group_of
                        .iter()
                        .find(|(member, _)| *member == parent)
                        .map(|(_, index)| *index)
                });
            let index = match parent_group {
                Some(index) => index,
                None => {
                    groups.push(UnloadGroup {
                        local_root: id,
                        members: vec![],
                        has_unload_handler: false,
                    });
                    groups.len() - 1
                },
            };

            let group = &mut groups[index];
            group.members.push(id);
            // Cached documents already ran their pagehide handlers and never
            // run unload handlers.
            if frame.has_unload_handler() && state != LifecycleStateImpl::InBackForwardCache {
                group.has_unload_handler = true;
            }
            group_of.push((id, index));
        }
        groups
    }
}

impl FrameHostManager {
    /// Start removing the subtree rooted at `root` from the frame tree.
    pub(crate) fn start_removal(&mut self, root: FrameId, kind: UnloadKind) {
        // Nothing will ever commit in a speculative frame of a removed subtree.
        let speculative: Vec<FrameId> = self
            .tree
            .subtree(root, true)
            .into_iter()
            .filter(|id| {
                self.tree
                    .get(*id)
                    .is_some_and(|frame| !frame.lifecycle_state().has_committed_document())
            })
            .collect();
        for id in speculative {
            self.discard_speculative_frame(id);
        }
        if !self.tree.contains(root) {
            return;
        }

        for group in UnloadCoordinator::plan(&self.tree, root) {
            self.start_group_unload(group, kind);
        }
        self.check_removal_completed(root);
    }

    fn start_group_unload(&mut self, group: UnloadGroup, kind: UnloadKind) {
        for member in &group.members {
            self.cancel_pending_navigations(*member);
        }

        let Some(frame) = self.tree.get(group.local_root) else {
            return;
        };
        let (token, routing_id) = (frame.token(), frame.routing_id());
        let process_alive = self
            .processes
            .get(&frame.process_id())
            .is_some_and(|process| process.is_alive());

        let sent = group.has_unload_handler &&
            process_alive &&
            self.send_to_frame(group.local_root, FrameHostToRendererMsg::Unload(routing_id, kind))
                .is_ok();

        if !sent {
            for member in &group.members {
                self.set_lifecycle_state(*member, LifecycleStateImpl::ReadyToBeDeleted);
            }
            let outcome = if process_alive {
                UnloadOutcome::NotRequired
            } else {
                UnloadOutcome::ProcessGone
            };
            debug!("Unload of {token} finished without the renderer: {outcome:?}");
            self.delegate.notify_unload_completed(token, outcome);
            return;
        }

        for member in &group.members {
            let next = match self.tree.get(*member).map(|frame| frame.lifecycle_state()) {
                Some(LifecycleStateImpl::InBackForwardCache) => {
                    LifecycleStateImpl::ReadyToBeDeleted
                },
                _ => LifecycleStateImpl::RunningUnloadHandlers,
            };
            self.set_lifecycle_state(*member, next);
        }
        let deadline = self.timers.schedule(
            Instant::now(),
            self.prefs.unload_timeout(),
            TimerEvent::UnloadDeadline(group.local_root),
        );
        if let Some(frame) = self.tree.get_mut(group.local_root) {
            frame.unload_ticket = Some(UnloadTicket {
                kind,
                awaiting_ack: true,
                deadline: Some(deadline),
                deadline_fired: false,
                members: group.members,
            });
        }
        debug!("Sent {kind:?} unload to {token}");
    }

    /// Fail the navigations a frame about to be removed was waiting on.
    pub(crate) fn cancel_pending_navigations(&mut self, id: FrameId) {
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        let dropped: Vec<_> = frame
            .pending_requests
            .drain()
            .into_iter()
            .map(|mut request| {
                debug!("Dropping navigation {} of removed frame {}", request.id(), frame.token);
                request.fail();
                request.id()
            })
            .collect();
        for request_id in dropped {
            self.forget_before_unload_wait(request_id);
        }
    }

    /// The renderer finished running the unload handlers of the group topped by `id`.
    pub(crate) fn on_unload_ack(&mut self, id: FrameId) {
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        let token = frame.token;
        let Some(ticket) = frame.unload_ticket.as_mut().filter(|ticket| ticket.awaiting_ack) else {
            debug!("Ignoring unexpected unload ack for {token}");
            return;
        };
        ticket.awaiting_ack = false;
        let deadline = ticket.deadline.take();
        let members = ticket.members.clone();
        if let Some(deadline) = deadline {
            self.timers.cancel(deadline);
        }
        self.finish_unload(id, members, UnloadOutcome::Acknowledged);
    }

    /// The renderer did not acknowledge the unload of the group topped by `id` in time.
    pub(crate) fn on_unload_deadline(&mut self, id: FrameId, timer: TimerId) {
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        let token = frame.token;
        let Some(ticket) = frame
            .unload_ticket
            .as_mut()
            .filter(|ticket| ticket.awaiting_ack && ticket.deadline == Some(timer))
        else {
            return;
        };
        ticket.awaiting_ack = false;
        ticket.deadline = None;
        ticket.deadline_fired = true;
        let members = ticket.members.clone();
        warn!("Renderer did not acknowledge the unload of {token} in time");
        self.finish_unload(id, members, UnloadOutcome::TimedOut);
    }

    /// The renderer of the group topped by `id` went away while it was unloading.
    pub(crate) fn abandon_unload(&mut self, id: FrameId) {
        let Some(ticket) = self
            .tree
            .get_mut(id)
            .and_then(|frame| frame.unload_ticket.as_mut())
            .filter(|ticket| ticket.awaiting_ack)
        else {
            return;
        };
        ticket.awaiting_ack = false;
        let deadline = ticket.deadline.take();
        let members = ticket.members.clone();
        if let Some(deadline) = deadline {
            self.timers.cancel(deadline);
        }
        self.finish_unload(id, members, UnloadOutcome::ProcessGone);
    }

    fn finish_unload(
        &mut self,
        local_root: FrameId,
        members: Vec<FrameId>,
        outcome: UnloadOutcome,
    ) {
        for member in &members {
            let running = self.tree.get(*member).is_some_and(|frame| {
                frame.lifecycle_state() == LifecycleStateImpl::RunningUnloadHandlers
            });
            if running {
                self.set_lifecycle_state(*member, LifecycleStateImpl::ReadyToBeDeleted);
            }
        }
        if let Some(frame) = self.tree.get(local_root) {
            self.delegate.notify_unload_completed(frame.token(), outcome);
        }
        let parent = self.tree.parent(local_root);
        for member in members.iter().rev() {
            self.remove_if_ready(*member);
        }
        self.check_ancestors(parent);
    }

    /// Destroy every frame of the subtree below `root` that can go, then walk up
    /// to ancestors that were only waiting for this subtree.
    pub(crate) fn check_removal_completed(&mut self, root: FrameId) {
        let parent = self.tree.parent(root);
        for id in self.tree.subtree_post_order(root, false) {
            self.remove_if_ready(id);
        }
        if !self.tree.contains(root) {
            self.check_ancestors(parent);
        }
    }

    fn check_ancestors(&mut self, mut ancestor: Option<FrameId>) {
        while let Some(id) = ancestor {
            let parent = self.tree.parent(id);
            if !self.remove_if_ready(id) {
                break;
            }
            ancestor = parent;
        }
    }

    /// Destroy `id` if it is ready to be deleted and has no children left.
    pub(crate) fn remove_if_ready(&mut self, id: FrameId) -> bool {
        let ready = self.tree.get(id).is_some_and(|frame| {
            frame.lifecycle_state() == LifecycleStateImpl::ReadyToBeDeleted
        }) && self.tree.children(id).is_empty();
        if ready {
            self.destroy_frame(id);
        }
        ready
    }
}
