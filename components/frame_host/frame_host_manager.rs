/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The [`FrameHostManager`] owns every frame of a browsing session and every
//! renderer process hosting them. It is driven by two kinds of input:
//!
//! * Commands from the browser's navigation logic, which decide what should be
//!   committed where. Invalid commands are reported back as [`FrameHostError`]s.
//! * Messages from renderer processes, which are never trusted. A renderer that
//!   reports something impossible is terminated.
//!
//! All of it runs on one thread, and nothing here blocks: unload deadlines are
//! timers that the owner fires through [`FrameHostManager::handle_elapsed_timers`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use crossbeam_channel::Receiver;
use frame_host_traits::{
    CommitFailedNavigationParams, CommitNavigationParams, DidCommitProvisionalLoadParams,
    DomEventKind, FrameHostToRendererMsg, FrameToken, NavigationRequestId, PageActivationKind,
    RendererProcessId, RendererToFrameHostMsg, RoutingId, UnloadKind,
};
use log::{debug, error, trace, warn};
use rustc_hash::FxHashMap;
use url::Url;

use crate::bad_message::{BadMessageReason, DiagnosticContext};
use crate::before_unload::BeforeUnloadWait;
use crate::commit_validator::{CommitValidationContext, CommitValidator, DiagnosticMismatch};
use crate::delegate::{
    BackForwardCache, CommitDetails, DefaultFrameHostDelegate, DisallowActivationReason,
    EvictionReason, FrameHostDelegate, NoBackForwardCache,
};
use crate::errors::FrameHostError;
use crate::frame::Frame;
use crate::frame_tree::{FrameId, FrameTree};
use crate::lifecycle::LifecycleStateImpl;
use crate::navigation_metrics::NavigationMetrics;
use crate::navigation_request::{NavigationRequest, NavigationState};
use crate::policy_snapshot::PolicySnapshot;
use crate::prefs::Preferences;
use crate::process::RendererProcess;
use crate::registry::FrameRegistry;
use crate::subresource_factories::SubresourceFactoryBuilder;
use crate::timer_scheduler::{TimerEvent, TimerScheduler};

/// Commands from the browser's navigation logic.
#[derive(Debug)]
pub enum NavigatorToFrameHostMsg {
    /// Send the commit of a navigation to the renderer of its target frame.
    BeginCommit(Box<NavigationRequest>),
    /// Commit an error page for a navigation that failed.
    FailCommit {
        request: Box<NavigationRequest>,
        error_code: i32,
        error_page_content: Option<String>,
    },
    /// Abandon a navigation tracked by a frame.
    CancelRequest(FrameId, NavigationRequestId),
    EnterBackForwardCache(FrameId),
    RestoreFromBackForwardCache(FrameId),
    ActivatePrerendered(FrameId),
    /// Remove a subframe from its parent.
    Detach(FrameId),
    /// Unload a frame whose document is not needed anymore.
    Unload(FrameId),
}

#[derive(Debug)]
pub enum FrameHostMsg {
    FromNavigator(NavigatorToFrameHostMsg),
    FromRenderer(RendererProcessId, RendererToFrameHostMsg),
    /// The connection to a renderer process was lost.
    RendererProcessGone(RendererProcessId),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CommitKind {
    CrossDocument,
    PageActivation,
    SameDocument,
}

pub struct FrameHostManagerBuilder {
    prefs: Preferences,
    delegate: Rc<dyn FrameHostDelegate>,
    back_forward_cache: Rc<dyn BackForwardCache>,
    registry: Option<Rc<RefCell<FrameRegistry>>>,
}

impl Default for FrameHostManagerBuilder {
    fn default() -> FrameHostManagerBuilder {
        FrameHostManagerBuilder {
            prefs: Preferences::default(),
            delegate: Rc::new(DefaultFrameHostDelegate),
            back_forward_cache: Rc::new(NoBackForwardCache),
            registry: None,
        }
    }
}

impl FrameHostManagerBuilder {
    pub fn new() -> FrameHostManagerBuilder {
        FrameHostManagerBuilder::default()
    }

    pub fn preferences(mut self, prefs: Preferences) -> FrameHostManagerBuilder {
        self.prefs = prefs;
        self
    }

    pub fn delegate(mut self, delegate: Rc<dyn FrameHostDelegate>) -> FrameHostManagerBuilder {
        self.delegate = delegate;
        self
    }

    pub fn back_forward_cache(
        mut self,
        cache: Rc<dyn BackForwardCache>,
    ) -> FrameHostManagerBuilder {
        self.back_forward_cache = cache;
        self
    }

    /// Register frames in `registry`, which may be shared with whoever routes
    /// renderer messages to this manager.
    pub fn registry(mut self, registry: Rc<RefCell<FrameRegistry>>) -> FrameHostManagerBuilder {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> FrameHostManager {
        FrameHostManager {
            tree: FrameTree::new(),
            registry: self.registry.unwrap_or_default(),
            processes: FxHashMap::default(),
            timers: TimerScheduler::default(),
            delegate: self.delegate,
            back_forward_cache: self.back_forward_cache,
            prefs: self.prefs,
            before_unload_waits: vec![],
        }
    }
}

pub struct FrameHostManager {
    pub(crate) tree: FrameTree,
    pub(crate) registry: Rc<RefCell<FrameRegistry>>,
    pub(crate) processes: FxHashMap<RendererProcessId, RendererProcess>,
    pub(crate) timers: TimerScheduler,
    pub(crate) delegate: Rc<dyn FrameHostDelegate>,
    pub(crate) back_forward_cache: Rc<dyn BackForwardCache>,
    pub(crate) prefs: Preferences,
    /// Navigations held for beforeunload handlers, oldest first.
    pub(crate) before_unload_waits: Vec<BeforeUnloadWait>,
}

impl FrameHostManager {
    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.tree.get(id)
    }

    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.tree.get_mut(id)
    }

    pub fn find_frame(&self, token: FrameToken) -> Option<FrameId> {
        self.registry.borrow().find_by_token(token)
    }

    pub fn registry(&self) -> Rc<RefCell<FrameRegistry>> {
        self.registry.clone()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn add_renderer_process(&mut self, process: RendererProcess) {
        debug!("Adding renderer process {}", process.id());
        self.processes.insert(process.id(), process);
    }

    pub fn process(&self, id: RendererProcessId) -> Option<&RendererProcess> {
        self.processes.get(&id)
    }

    pub fn process_mut(&mut self, id: RendererProcessId) -> Option<&mut RendererProcess> {
        self.processes.get_mut(&id)
    }

    /// When [`FrameHostManager::handle_elapsed_timers`] should be called next.
    pub fn next_timer_deadline(&mut self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Create the main frame of a new page, showing its initial empty document.
    /// The first page created is shown.
    pub fn create_main_frame(
        &mut self,
        process_id: RendererProcessId,
        routing_id: RoutingId,
        token: FrameToken,
    ) -> Result<FrameId, FrameHostError> {
        self.ensure_can_host(process_id, routing_id, token)?;
        let frame = Frame::new(token, process_id, routing_id, LifecycleStateImpl::Active);
        let id = self.tree.insert_root(frame);
        self.register(id);
        if self.tree.primary_main_frame().is_none() {
            self.tree.set_primary_main_frame(Some(id));
        }
        debug!("Created main frame {token} in process {process_id}");
        Ok(id)
    }

    /// Create the main frame of a page to prerender. It commits its first
    /// document like a speculative frame, and is not shown until activated.
    pub fn create_prerendered_main_frame(
        &mut self,
        process_id: RendererProcessId,
        routing_id: RoutingId,
        token: FrameToken,
    ) -> Result<FrameId, FrameHostError> {
        self.ensure_can_host(process_id, routing_id, token)?;
        let mut frame = Frame::new(token, process_id, routing_id, LifecycleStateImpl::Speculative);
        frame.in_prerendered_page = true;
        let id = self.tree.insert_root(frame);
        self.register(id);
        debug!("Created prerendered main frame {token} in process {process_id}");
        Ok(id)
    }

    /// Create a frame that may take the place of `position` if a navigation
    /// commits in it.
    pub fn create_speculative_frame(
        &mut self,
        position: FrameId,
        process_id: RendererProcessId,
        routing_id: RoutingId,
        token: FrameToken,
    ) -> Result<FrameId, FrameHostError> {
        let position_frame = self
            .tree
            .get(position)
            .ok_or(FrameHostError::NoSuchFrame(position))?;
        let state = position_frame.lifecycle_state();
        if state.is_pending_deletion() || !state.has_committed_document() {
            return Err(FrameHostError::InvalidState {
                frame: position,
                operation: "get a speculative frame",
                state,
            });
        }
        let in_prerendered_page = position_frame.in_prerendered_page;
        let required_document_policy = position_frame.required_document_policy.clone();
        self.ensure_can_host(process_id, routing_id, token)?;

        let mut frame = Frame::new(token, process_id, routing_id, LifecycleStateImpl::Speculative);
        frame.in_prerendered_page = in_prerendered_page;
        frame.required_document_policy = required_document_policy;
        let id = self.tree.attach_speculative(position, frame)?;
        self.register(id);
        debug!("Created speculative frame {token} for {position:?}");
        Ok(id)
    }

    /// Throw away a speculative frame, undoing any commit sent to it.
    pub fn destroy_speculative_frame(&mut self, id: FrameId) -> Result<(), FrameHostError> {
        let frame = self.tree.get(id).ok_or(FrameHostError::NoSuchFrame(id))?;
        let state = frame.lifecycle_state();
        if state.has_committed_document() {
            return Err(FrameHostError::InvalidState {
                frame: id,
                operation: "be discarded",
                state,
            });
        }
        self.discard_speculative_frame(id);
        Ok(())
    }

    fn ensure_can_host(
        &self,
        process_id: RendererProcessId,
        routing_id: RoutingId,
        token: FrameToken,
    ) -> Result<(), FrameHostError> {
        if !self.processes.contains_key(&process_id) {
            return Err(FrameHostError::NoSuchProcess(process_id));
        }
        let registry = self.registry.borrow();
        if registry.is_registered(token) {
            return Err(FrameHostError::DuplicateFrame(token.to_string()));
        }
        if registry.find_by_routing_id(process_id, routing_id).is_some() {
            return Err(FrameHostError::DuplicateFrame(format!(
                "{routing_id} in process {process_id}"
            )));
        }
        Ok(())
    }

    fn register(&mut self, id: FrameId) {
        let Some(frame) = self.tree.get(id) else {
            return;
        };
        let result = self
            .registry
            .borrow_mut()
            .insert(frame.token, frame.process_id, frame.routing_id, id);
        if let Err(error) = result {
            self.programming_error(format_args!("Cannot register frame {id:?}: {error}"));
        }
    }

    pub(crate) fn send_to_frame(
        &self,
        id: FrameId,
        msg: FrameHostToRendererMsg,
    ) -> Result<(), FrameHostError> {
        let frame = self.tree.get(id).ok_or(FrameHostError::NoSuchFrame(id))?;
        self.processes
            .get(&frame.process_id)
            .ok_or(FrameHostError::NoSuchProcess(frame.process_id))?
            .send(msg)
    }

    /// Report an inconsistency in the frame host itself.
    fn programming_error(&self, message: impl fmt::Display) {
        error!("{message}");
        assert!(!self.prefs.hard_fail, "{message}");
    }

    /// Move a frame to a new state, notifying the delegate when its coarse state
    /// changes. Illegal transitions are programming errors and leave the state
    /// untouched.
    pub(crate) fn set_lifecycle_state(&mut self, id: FrameId, to: LifecycleStateImpl) -> bool {
        let Some(frame) = self.tree.get_mut(id) else {
            return false;
        };
        let token = frame.token;
        match frame.lifecycle.transition_to(to) {
            Ok(old) => {
                trace!("Frame {token}: {old} -> {to}");
                let (old, new) = (old.to_public(), to.to_public());
                if old != new {
                    self.delegate.notify_lifecycle_changed(token, old, new);
                }
                true
            },
            Err(error) => {
                self.programming_error(format_args!("Frame {token}: {error}"));
                false
            },
        }
    }

    /// Move every frame of the page below `root` that is not being removed to
    /// `to`. Nothing changes unless every frame can make the transition.
    fn cascade(
        &mut self,
        root: FrameId,
        to: LifecycleStateImpl,
        operation: &'static str,
    ) -> Result<(), FrameHostError> {
        let frames: Vec<FrameId> = self
            .tree
            .subtree(root, false)
            .into_iter()
            .filter(|id| self.tree.get(*id).is_some_and(|frame| !frame.is_pending_deletion()))
            .collect();
        for id in &frames {
            if let Some(frame) = self.tree.get(*id) {
                let state = frame.lifecycle_state();
                if !state.can_transition_to(to) {
                    return Err(FrameHostError::InvalidState {
                        frame: *id,
                        operation,
                        state,
                    });
                }
            }
        }

        let mut changes = vec![];
        for id in &frames {
            if let Some(frame) = self.tree.get_mut(*id) {
                if let Ok(old) = frame.lifecycle.transition_to(to) {
                    changes.push((frame.token, old));
                }
            }
        }
        for (token, old) in changes {
            let (old, new) = (old.to_public(), to.to_public());
            if old != new {
                self.delegate.notify_lifecycle_changed(token, old, new);
            }
        }
        Ok(())
    }

    fn discard_speculative_frames_below(&mut self, root: FrameId) {
        let speculative: Vec<FrameId> = self
            .tree
            .subtree(root, true)
            .into_iter()
            .filter(|id| self.tree.speculative_for(*id).is_some())
            .collect();
        for id in speculative {
            self.discard_speculative_frame(id);
        }
    }

    pub(crate) fn discard_speculative_frame(&mut self, id: FrameId) {
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        let routing_id = frame.routing_id;
        let state = frame.lifecycle_state();
        let sent: Vec<_> = frame
            .pending_requests
            .drain()
            .into_iter()
            .filter_map(|mut request| {
                let was_sent = request.state() == NavigationState::ReadyToCommit;
                request.fail();
                was_sent.then(|| request.token())
            })
            .collect();
        for token in sent {
            let msg = FrameHostToRendererMsg::UndoCommitNavigation(routing_id, token);
            if let Err(error) = self.send_to_frame(id, msg) {
                debug!("Could not undo commit of {token}: {error}");
            }
        }
        if state == LifecycleStateImpl::PendingCommit {
            self.set_lifecycle_state(id, LifecycleStateImpl::ReadyToBeDeleted);
        }
        self.destroy_frame(id);
    }

    /// Remove a frame from the tree and forget about it.
    pub(crate) fn destroy_frame(&mut self, id: FrameId) {
        if let Some(speculative) = self.tree.speculative_frame(id) {
            self.discard_speculative_frame(speculative);
        }
        self.cancel_pending_navigations(id);
        self.forget_frame_in_before_unload_waits(id);
        match self.tree.remove(id) {
            Ok(frame) => {
                self.registry
                    .borrow_mut()
                    .remove(frame.token, frame.process_id, frame.routing_id);
                let deadline = frame.unload_ticket.as_ref().and_then(|ticket| ticket.deadline);
                if let Some(deadline) = deadline {
                    self.timers.cancel(deadline);
                }
                debug!("Destroyed frame {}", frame.token);
                self.delegate.notify_frame_deleted(frame.token);
            },
            Err(error) => {
                self.programming_error(format_args!("Cannot destroy frame {id:?}: {error}"))
            },
        }
    }

    /// Destroy a page that is not shown, without running unload handlers.
    fn destroy_page(&mut self, page: FrameId) {
        self.discard_speculative_frames_below(page);
        let frames = self.tree.subtree(page, false);
        for id in &frames {
            let state = self.tree.get(*id).map(|frame| frame.lifecycle_state());
            if state.is_some_and(|state| state != LifecycleStateImpl::ReadyToBeDeleted) {
                self.set_lifecycle_state(*id, LifecycleStateImpl::ReadyToBeDeleted);
            }
        }
        self.check_removal_completed(page);
    }

    fn evict_page(&mut self, page: FrameId, reason: EvictionReason) {
        let Some(frame) = self.tree.get(page) else {
            return;
        };
        debug!("Evicting {} from the back/forward cache: {reason:?}", frame.token);
        self.back_forward_cache.evict(frame.token, reason);
        self.destroy_page(page);
    }

    fn cancel_prerendered_page(&mut self, page: FrameId, reason: DisallowActivationReason) {
        let Some(frame) = self.tree.get(page) else {
            return;
        };
        debug!("Cancelling prerendering of {}: {reason:?}", frame.token);
        self.delegate.cancel_prerendering(frame.token, reason);
        self.destroy_page(page);
    }

    /// Show the page of `page`, and let the page shown so far go.
    fn make_primary(&mut self, page: FrameId) {
        let previous = self.tree.primary_main_frame();
        self.tree.set_primary_main_frame(Some(page));
        if let Some(previous) = previous.filter(|previous| *previous != page) {
            self.tree.mark_replaced(previous);
            self.leave_tree_position(previous);
        }
    }

    /// A frame lost its tree position to another one. Main frames of pages that
    /// can be cached go to the back/forward cache; everything else is unloaded.
    fn leave_tree_position(&mut self, old: FrameId) {
        let Some(frame) = self.tree.get(old) else {
            return;
        };
        if frame.is_pending_deletion() {
            return;
        }
        let token = frame.token;
        let cacheable = self.tree.is_main_frame(old) &&
            self.prefs.back_forward_cache_enabled &&
            !frame.is_error_document &&
            self.tree.subtree(old, false).iter().all(|id| {
                self.tree
                    .get(*id)
                    .is_some_and(|frame| frame.lifecycle_state() == LifecycleStateImpl::Active)
            }) &&
            self.back_forward_cache.can_store(token);

        if cacheable {
            match self.enter_cache(old) {
                Ok(()) => {
                    debug!("Stored {token} in the back/forward cache");
                    return;
                },
                Err(error) => self.programming_error(format_args!("Cannot cache {token}: {error}")),
            }
        }
        self.start_removal(old, UnloadKind::NavigatedAway);
    }

    fn enter_cache(&mut self, page: FrameId) -> Result<(), FrameHostError> {
        self.discard_speculative_frames_below(page);
        self.cascade(page, LifecycleStateImpl::InBackForwardCache, "enter the back/forward cache")
    }

    fn restore_page(&mut self, page: FrameId) -> Result<(), FrameHostError> {
        self.cascade(page, LifecycleStateImpl::Active, "leave the back/forward cache")?;
        self.make_primary(page);
        Ok(())
    }

    fn activate_page(&mut self, page: FrameId) -> Result<(), FrameHostError> {
        self.cascade(page, LifecycleStateImpl::Active, "be activated")?;
        for id in self.tree.subtree(page, true) {
            if let Some(frame) = self.tree.get_mut(id) {
                frame.in_prerendered_page = false;
            }
        }
        self.make_primary(page);
        Ok(())
    }

    fn page_root(&self, page: FrameId) -> Result<&Frame, FrameHostError> {
        let frame = self.tree.get(page).ok_or(FrameHostError::NoSuchFrame(page))?;
        if !self.tree.is_main_frame(page) || self.tree.speculative_for(page).is_some() {
            return Err(FrameHostError::NotPageRoot(page));
        }
        Ok(frame)
    }

    /// Store the page of `page`, which must not be shown, in the back/forward cache.
    pub fn enter_back_forward_cache(&mut self, page: FrameId) -> Result<(), FrameHostError> {
        let state = self.page_root(page)?.lifecycle_state();
        if self.tree.primary_main_frame() == Some(page) {
            return Err(FrameHostError::IsPrimaryMainFrame(page));
        }
        if state != LifecycleStateImpl::Active {
            return Err(FrameHostError::InvalidState {
                frame: page,
                operation: "enter the back/forward cache",
                state,
            });
        }
        // Every frame of a cached page is cached, so a page cannot be stored
        // while one of its frames is still being removed.
        let unloading = self.tree.subtree(page, false).into_iter().find_map(|id| {
            let state = self.tree.get(id)?.lifecycle_state();
            state.is_pending_deletion().then_some((id, state))
        });
        if let Some((frame, state)) = unloading {
            return Err(FrameHostError::InvalidState {
                frame,
                operation: "enter the back/forward cache",
                state,
            });
        }
        self.tree.mark_replaced(page);
        self.enter_cache(page)
    }

    /// Show a page from the back/forward cache again.
    pub fn restore_from_back_forward_cache(&mut self, page: FrameId) -> Result<(), FrameHostError> {
        let state = self.page_root(page)?.lifecycle_state();
        if state != LifecycleStateImpl::InBackForwardCache {
            return Err(FrameHostError::InvalidState {
                frame: page,
                operation: "leave the back/forward cache",
                state,
            });
        }
        self.restore_page(page)
    }

    /// Show a prerendered page.
    pub fn activate_prerendered(&mut self, page: FrameId) -> Result<(), FrameHostError> {
        let state = self.page_root(page)?.lifecycle_state();
        if state != LifecycleStateImpl::Prerendering {
            return Err(FrameHostError::InvalidState {
                frame: page,
                operation: "be activated",
                state,
            });
        }
        self.activate_page(page)
    }

    /// Remove a subframe and its descendants from the tree.
    pub fn detach(&mut self, id: FrameId) -> Result<(), FrameHostError> {
        let frame = self.tree.get(id).ok_or(FrameHostError::NoSuchFrame(id))?;
        if self.tree.is_main_frame(id) {
            return Err(FrameHostError::IsMainFrame(id));
        }
        if frame.is_pending_deletion() {
            return Ok(());
        }
        self.start_removal(id, UnloadKind::Detach);
        Ok(())
    }

    /// Unload the document of a frame that is no longer needed, with all of its
    /// descendants.
    pub fn unload(&mut self, id: FrameId) -> Result<(), FrameHostError> {
        let frame = self.tree.get(id).ok_or(FrameHostError::NoSuchFrame(id))?;
        let state = frame.lifecycle_state();
        if state.is_pending_deletion() {
            return Ok(());
        }
        if !state.has_committed_document() {
            return Err(FrameHostError::InvalidState {
                frame: id,
                operation: "be unloaded",
                state,
            });
        }
        if self.tree.primary_main_frame() == Some(id) {
            self.tree.set_primary_main_frame(None);
            self.tree.mark_replaced(id);
        }
        self.start_removal(id, UnloadKind::NavigatedAway);
        Ok(())
    }

    /// Send the commit of `request` to the renderer hosting its target frame.
    /// The request is tracked by that frame until the renderer reports the commit.
    /// If the navigation replaces documents with beforeunload handlers, the
    /// commit is only sent once their renderers ran them.
    pub fn begin_commit(&mut self, request: NavigationRequest) -> Result<(), FrameHostError> {
        let target = request.target_frame();
        let frame = self.tree.get(target).ok_or(FrameHostError::NoSuchFrame(target))?;
        let state = frame.lifecycle_state();
        let is_page_root =
            self.tree.is_main_frame(target) && self.tree.speculative_for(target).is_none();
        let allowed = match (state, request.page_activation_kind()) {
            (LifecycleStateImpl::Speculative | LifecycleStateImpl::PendingCommit, None) => {
                !request.is_same_document()
            },
            (LifecycleStateImpl::Active | LifecycleStateImpl::Prerendering, None) => true,
            (
                LifecycleStateImpl::InBackForwardCache,
                Some(PageActivationKind::BackForwardCacheRestore),
            ) |
            (LifecycleStateImpl::Prerendering, Some(PageActivationKind::PrerenderActivation)) => {
                is_page_root
            },
            _ => false,
        };
        if !allowed {
            return Err(FrameHostError::InvalidState {
                frame: target,
                operation: "commit this navigation",
                state,
            });
        }

        let process = self
            .processes
            .get(&frame.process_id)
            .ok_or(FrameHostError::NoSuchProcess(frame.process_id))?;
        if !process.is_alive() {
            return Err(FrameHostError::ProcessNotAlive(process.id()));
        }

        let targets = self.before_unload_targets(&request);
        if !targets.is_empty() {
            return self.wait_for_before_unload(request, targets);
        }
        self.commit_navigation(request)
    }

    pub(crate) fn commit_navigation(
        &mut self,
        mut request: NavigationRequest,
    ) -> Result<(), FrameHostError> {
        let target = request.target_frame();
        let frame = self.tree.get(target).ok_or(FrameHostError::NoSuchFrame(target))?;
        let state = frame.lifecycle_state();
        let process = self
            .processes
            .get(&frame.process_id)
            .ok_or(FrameHostError::NoSuchProcess(frame.process_id))?;
        if !process.is_alive() {
            return Err(FrameHostError::ProcessNotAlive(process.id()));
        }
        request.ready_to_commit()?;

        let routing_id = frame.routing_id;
        let msg = if request.is_error_page() {
            let snapshot = PolicySnapshot::for_pending_navigation(&request);
            FrameHostToRendererMsg::CommitFailedNavigation(Box::new(CommitFailedNavigationParams {
                routing_id,
                navigation_token: request.token(),
                url: request.url().clone(),
                error_code: request.error_code().unwrap_or_default(),
                error_page_content: request.error_page_content.clone(),
                subresource_loader_factories: SubresourceFactoryBuilder::new(
                    &snapshot,
                    process,
                    request.url(),
                )
                .disable_web_security(self.prefs.disable_web_security)
                .build(),
            }))
        } else {
            let subresource_loader_factories =
                if request.is_same_document() || request.is_page_activation() {
                    None
                } else {
                    let snapshot = PolicySnapshot::for_pending_navigation(&request);
                    Some(
                        SubresourceFactoryBuilder::new(&snapshot, process, request.url())
                            .disable_web_security(self.prefs.disable_web_security)
                            .build(),
                    )
                };
            FrameHostToRendererMsg::CommitNavigation(Box::new(CommitNavigationParams {
                routing_id,
                navigation_token: request.token(),
                url: request.url().clone(),
                origin_to_commit: request.origin_to_commit().clone(),
                method: request.method().clone(),
                post_id: request.post_id,
                is_same_document: request.is_same_document(),
                page_activation: request.page_activation_kind(),
                navigation_type: request.navigation_type,
                transition: request.transition,
                should_replace_current_entry: request.should_replace_current_entry,
                should_clear_history_list: request.should_clear_history_list,
                page_state: request.frame_entry().map(|entry| entry.page_state.clone()),
                subresource_loader_factories,
            }))
        };
        process.send(msg)?;
        request.timing.commit_sent = Some(Instant::now());

        debug!(
            "Sent commit of navigation {} to {} in {}",
            request.id(),
            request.url(),
            frame.token
        );
        if state == LifecycleStateImpl::Speculative {
            self.set_lifecycle_state(target, LifecycleStateImpl::PendingCommit);
        }
        if let Some(frame) = self.tree.get_mut(target) {
            frame.pending_requests.track(request);
        }
        Ok(())
    }

    /// Commit an error page in place of a navigation that failed.
    pub fn fail_commit(
        &mut self,
        mut request: NavigationRequest,
        error_code: i32,
        error_page_content: Option<String>,
    ) -> Result<(), FrameHostError> {
        request.fail_with_error_page(error_code);
        if let Some(content) = error_page_content {
            request.set_error_page_content(content);
        }
        self.begin_commit(request)
    }

    /// Stop tracking a navigation. A commit already sent to the renderer is
    /// undone, and a speculative frame that has nothing left to commit is
    /// destroyed.
    pub fn cancel_request(
        &mut self,
        id: FrameId,
        request_id: NavigationRequestId,
    ) -> Result<(), FrameHostError> {
        let frame = self.tree.get_mut(id).ok_or(FrameHostError::NoSuchFrame(id))?;
        let mut request = frame
            .pending_requests
            .cancel(request_id)
            .ok_or(FrameHostError::NoSuchNavigation(request_id, id))?;
        let was_sent = request.state() == NavigationState::ReadyToCommit;
        request.fail();
        let routing_id = frame.routing_id;
        let state = frame.lifecycle_state();
        let now_idle = frame.pending_requests.is_empty();
        if was_sent {
            frame.undone_commits.insert(request.token());
            let msg = FrameHostToRendererMsg::UndoCommitNavigation(routing_id, request.token());
            if let Err(error) = self.send_to_frame(id, msg) {
                debug!("Could not undo commit of navigation {request_id}: {error}");
            }
        }
        self.forget_before_unload_wait(request_id);
        debug!("Cancelled navigation {request_id}");

        if !state.has_committed_document() && now_idle {
            self.discard_speculative_frame(id);
        }
        Ok(())
    }

    /// Handle one message. Errors are only returned for browser commands.
    pub fn handle_message(&mut self, msg: FrameHostMsg) -> Result<(), FrameHostError> {
        match msg {
            FrameHostMsg::FromNavigator(msg) => match msg {
                NavigatorToFrameHostMsg::BeginCommit(request) => self.begin_commit(*request),
                NavigatorToFrameHostMsg::FailCommit {
                    request,
                    error_code,
                    error_page_content,
                } => self.fail_commit(*request, error_code, error_page_content),
                NavigatorToFrameHostMsg::CancelRequest(frame, request_id) => {
                    self.cancel_request(frame, request_id)
                },
                NavigatorToFrameHostMsg::EnterBackForwardCache(page) => {
                    self.enter_back_forward_cache(page)
                },
                NavigatorToFrameHostMsg::RestoreFromBackForwardCache(page) => {
                    self.restore_from_back_forward_cache(page)
                },
                NavigatorToFrameHostMsg::ActivatePrerendered(page) => {
                    self.activate_prerendered(page)
                },
                NavigatorToFrameHostMsg::Detach(frame) => self.detach(frame),
                NavigatorToFrameHostMsg::Unload(frame) => self.unload(frame),
            },
            FrameHostMsg::FromRenderer(process, msg) => {
                self.handle_renderer_message(process, msg);
                Ok(())
            },
            FrameHostMsg::RendererProcessGone(process) => {
                self.renderer_process_gone(process);
                Ok(())
            },
        }
    }

    /// Handle every message queued on `receiver`, then fire the timers that
    /// elapsed meanwhile.
    pub fn handle_pending_messages(&mut self, receiver: &Receiver<FrameHostMsg>) {
        for msg in receiver.try_iter() {
            if let Err(error) = self.handle_message(msg) {
                warn!("Frame host command failed: {error}");
            }
        }
        self.handle_elapsed_timers(Instant::now());
    }

    pub fn handle_elapsed_timers(&mut self, now: Instant) {
        for (timer, event) in self.timers.take_elapsed(now) {
            match event {
                TimerEvent::UnloadDeadline(frame) => self.on_unload_deadline(frame, timer),
                TimerEvent::BeforeUnloadDeadline(request) => {
                    self.on_before_unload_deadline(request, timer)
                },
            }
        }
    }

    pub fn handle_renderer_message(
        &mut self,
        process_id: RendererProcessId,
        msg: RendererToFrameHostMsg,
    ) {
        let Some(process) = self.processes.get(&process_id) else {
            warn!("Message from unknown renderer process {process_id}");
            return;
        };
        if !process.is_alive() {
            debug!("Ignoring message from renderer process {process_id}, which is not alive");
            return;
        }
        let routing_id = msg.routing_id();
        let Some(id) = self
            .registry
            .borrow()
            .find_by_routing_id(process_id, routing_id)
        else {
            debug!("Ignoring {msg:?} for unknown frame {routing_id} in process {process_id}");
            return;
        };

        match msg {
            RendererToFrameHostMsg::DidCommitProvisionalLoad(_, params) => {
                self.did_commit(id, *params, CommitKind::CrossDocument)
            },
            RendererToFrameHostMsg::DidCommitPageActivation(_, params) => {
                self.did_commit(id, *params, CommitKind::PageActivation)
            },
            RendererToFrameHostMsg::DidCommitSameDocumentNavigation(_, params) => {
                self.did_commit(id, *params, CommitKind::SameDocument)
            },
            RendererToFrameHostMsg::UnloadAck(_) => self.on_unload_ack(id),
            RendererToFrameHostMsg::CreateChildFrame(_, child_routing_id, child_token) => {
                self.create_child_frame(id, child_routing_id, child_token)
            },
            RendererToFrameHostMsg::DetachChildFrame(_) => self.detach_from_renderer(id),
            RendererToFrameHostMsg::UpdateUnloadHandlerState(_, has_unload_handler) => {
                self.update_unload_handler_state(id, has_unload_handler)
            },
            RendererToFrameHostMsg::UpdateBeforeUnloadHandlerState(_, has_handler) => {
                self.update_before_unload_handler_state(id, has_handler)
            },
            RendererToFrameHostMsg::BeforeUnloadCompleted(_, reply) => {
                self.on_before_unload_completed(id, reply)
            },
            RendererToFrameHostMsg::DispatchDomEvent(_, event_id, event) => {
                self.dispatch_dom_event(id, event_id, event)
            },
            RendererToFrameHostMsg::BeginNavigation(_, url, has_user_gesture) => {
                self.begin_navigation_from_renderer(id, url, has_user_gesture)
            },
            RendererToFrameHostMsg::RequestSubresourceFactories(_) => {
                self.update_subresource_factories(id)
            },
        }
    }

    fn diagnostic_context(&self, id: FrameId) -> DiagnosticContext {
        let context = DiagnosticContext::new();
        match self.tree.get(id) {
            Some(frame) => context
                .with("frame", frame.token)
                .with("state", frame.lifecycle_state())
                .with("last_committed_url", &frame.last_committed_url),
            None => context.with("frame", format_args!("{id:?}")),
        }
    }

    fn terminate_for_frame(
        &mut self,
        id: FrameId,
        reason: BadMessageReason,
        context: DiagnosticContext,
    ) {
        if let Some(process_id) = self.tree.get(id).map(|frame| frame.process_id) {
            self.terminate_renderer(process_id, reason, context);
        }
    }

    fn did_commit(
        &mut self,
        id: FrameId,
        params: DidCommitProvisionalLoadParams,
        kind: CommitKind,
    ) {
        let Some(frame) = self.tree.get(id) else {
            return;
        };
        let state = frame.lifecycle_state();
        let context = self
            .diagnostic_context(id)
            .with("url", &params.url)
            .with("navigation_token", params.navigation_token)
            .with("commit", format_args!("{kind:?}"));
        match state {
            LifecycleStateImpl::RunningUnloadHandlers | LifecycleStateImpl::ReadyToBeDeleted => {
                debug!("Ignoring commit in {}, which is being removed", frame.token);
                return;
            },
            LifecycleStateImpl::Speculative => {
                return self.terminate_for_frame(
                    id,
                    BadMessageReason::CommitInSpeculativeFrame,
                    context,
                );
            },
            LifecycleStateImpl::PendingCommit if kind != CommitKind::CrossDocument => {
                return self.terminate_for_frame(
                    id,
                    BadMessageReason::UnexpectedCommitInPendingCommitFrame,
                    context,
                );
            },
            LifecycleStateImpl::InBackForwardCache if kind != CommitKind::PageActivation => {
                self.is_inactive_and_disallow_activation(
                    id,
                    DisallowActivationReason::CommitWhileInactive,
                );
                return;
            },
            _ => {},
        }

        let is_same_document = kind == CommitKind::SameDocument;
        let token = params.navigation_token;
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        let request = if is_same_document {
            frame.pending_requests.take_same_document(token)
        } else {
            frame.pending_requests.take_by_token(token)
        };
        if request.is_none() {
            if frame.undone_commits.remove(&token) {
                debug!("Ignoring commit of navigation {token}, which was undone");
                return;
            }
            let may_be_unknown =
                is_same_document &&
                    (params.is_history_api_navigation || params.is_renderer_initiated);
            if !may_be_unknown {
                return self.terminate_for_frame(
                    id,
                    BadMessageReason::CommitWithUnknownNavigation,
                    context,
                );
            }
        }
        let is_activation = request.as_ref().is_some_and(NavigationRequest::is_page_activation);
        if is_activation != (kind == CommitKind::PageActivation) {
            return self.terminate_for_frame(
                id,
                BadMessageReason::PageActivationCommitMismatch,
                context,
            );
        }

        let verdict = match self.validation_context(id) {
            Some(validation_context) => {
                CommitValidator::validate(
                    &validation_context,
                    request.as_ref(),
                    &params,
                    is_same_document,
                )
            },
            None => return,
        };
        match verdict {
            Ok(verdict) => self.report_mismatches(id, &verdict.mismatches),
            Err(rejection) => {
                warn!("Rejected commit: {rejection}");
                return self.terminate_for_frame(id, rejection.reason, rejection.context);
            },
        }
        self.apply_commit(id, request, params, kind);
    }

    fn validation_context(&self, id: FrameId) -> Option<CommitValidationContext<'_>> {
        let frame = self.tree.get(id)?;
        let process = self.processes.get(&frame.process_id)?;
        let is_main_frame = self.tree.is_main_frame(id);
        let main_frame = if is_main_frame {
            None
        } else {
            let main_frame = self.tree.get(self.tree.main_frame_of(id))?;
            let main_process = self.processes.get(&main_frame.process_id)?;
            Some((main_frame, main_process))
        };
        Some(CommitValidationContext {
            frame,
            process,
            is_main_frame,
            is_current_frame: self.tree.is_current(id),
            main_frame,
            prefs: &self.prefs,
        })
    }

    fn report_mismatches(&self, id: FrameId, mismatches: &[DiagnosticMismatch]) {
        let Some(frame) = self.tree.get(id) else {
            return;
        };
        for mismatch in mismatches {
            warn!("Unexpected commit parameter in {}: {mismatch}", frame.token);
            self.delegate.record_commit_mismatch(frame.token, mismatch);
        }
        assert!(
            !self.prefs.assert_on_commit_param_mismatch || mismatches.is_empty(),
            "Commit parameters of {} differ from the expected ones",
            frame.token
        );
    }

    fn apply_commit(
        &mut self,
        id: FrameId,
        mut request: Option<NavigationRequest>,
        params: DidCommitProvisionalLoadParams,
        kind: CommitKind,
    ) {
        let is_main_frame = self.tree.is_main_frame(id);
        if let Some(request) = request.as_mut() {
            if let Err(error) = request.set_state(NavigationState::Committed) {
                self.programming_error(error);
            }
        }
        if let Some(request) = request.as_ref().filter(|_| is_main_frame) {
            self.record_navigation_metrics(id, request);
        }
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        let old_state = frame.lifecycle_state();

        match kind {
            CommitKind::CrossDocument => {
                frame.last_committed_url = params.url.clone();
                frame.last_committed_origin = params.origin.clone();
                frame.last_http_method = params.method.clone();
                frame.last_http_status_code = params.http_status_code;
                frame.last_post_id = params.post_id;
                frame.document_sequence_number = Some(params.document_sequence_number);
                frame.embedding_token = params.embedding_token;
                frame.document_policy = params.document_policy.clone();
                frame.is_on_initial_empty_document = false;
                frame.is_render_frame_live = true;
                // The renderer handled every undo sent before this commit.
                frame.undone_commits.clear();
                if let Some(request) = request.as_ref() {
                    let snapshot = PolicySnapshot::for_pending_navigation(request);
                    frame.isolation_info = snapshot.isolation_info().clone();
                    frame.client_security_state = snapshot.client_security_state().clone();
                    frame.trust_token_redemption = snapshot.trust_token_redemption();
                    frame.is_error_document = request.is_error_page();
                    frame.is_archive_document = request.is_archive_document;
                }
            },
            CommitKind::SameDocument => {
                frame.last_committed_url = params.url.clone();
                if params.is_history_api_navigation {
                    frame.last_http_method = http::Method::GET;
                    frame.last_post_id = -1;
                }
            },
            CommitKind::PageActivation => {},
        }

        let details = CommitDetails {
            frame: frame.token,
            navigation_request_id: request.as_ref().map(NavigationRequest::id),
            url: params.url,
            origin: frame.last_committed_origin.clone(),
            is_main_frame,
            is_same_document: kind == CommitKind::SameDocument,
            page_activation: request.as_ref().and_then(NavigationRequest::page_activation_kind),
            did_create_new_entry: params.did_create_new_entry,
        };
        if request.is_some() {
            frame.last_committed_navigation = request;
        }
        debug!("Frame {} committed {}", details.frame, details.url);

        match (kind, old_state) {
            (CommitKind::CrossDocument, LifecycleStateImpl::PendingCommit) => {
                let new_state = if frame.in_prerendered_page {
                    LifecycleStateImpl::Prerendering
                } else {
                    LifecycleStateImpl::Active
                };
                self.set_lifecycle_state(id, new_state);
                if self.tree.speculative_for(id).is_some() {
                    match self.tree.swap_in_speculative(id) {
                        Ok(old) => self.leave_tree_position(old),
                        Err(error) => self.programming_error(error),
                    }
                }
            },
            (CommitKind::CrossDocument, _) => {
                // The frames of the previous document go away with it.
                for child in self.tree.children(id).to_vec() {
                    self.start_removal(child, UnloadKind::Detach);
                }
            },
            (CommitKind::PageActivation, LifecycleStateImpl::InBackForwardCache) => {
                if let Err(error) = self.restore_page(id) {
                    self.programming_error(error);
                }
            },
            (CommitKind::PageActivation, LifecycleStateImpl::Prerendering) => {
                if let Err(error) = self.activate_page(id) {
                    self.programming_error(error);
                }
            },
            _ => {},
        }

        self.delegate.notify_navigation_committed(&details);
    }

    fn record_navigation_metrics(&self, id: FrameId, request: &NavigationRequest) {
        let Some(frame) = self.tree.get(id) else {
            return;
        };
        let metrics = NavigationMetrics::for_commit(request, Instant::now());
        debug!("Frame {} {metrics}", frame.token);
        self.delegate.record_navigation_metrics(frame.token, &metrics);
    }

    /// Whether `id` cannot handle a renderer event because its document is not
    /// shown. Pages that are not shown lose the ability to be shown: cached
    /// pages are evicted and prerendered pages are cancelled. Frames without a
    /// committed document cannot send events at all, and their renderer is
    /// terminated.
    pub fn is_inactive_and_disallow_activation(
        &mut self,
        id: FrameId,
        reason: DisallowActivationReason,
    ) -> bool {
        let Some(frame) = self.tree.get(id) else {
            return true;
        };
        match frame.lifecycle_state() {
            LifecycleStateImpl::Active => false,
            LifecycleStateImpl::RunningUnloadHandlers | LifecycleStateImpl::ReadyToBeDeleted => {
                true
            },
            LifecycleStateImpl::InBackForwardCache => {
                let page = self.tree.main_frame_of(id);
                self.evict_page(page, EvictionReason::DisallowActivation(reason));
                true
            },
            LifecycleStateImpl::Prerendering => {
                let page = self.tree.main_frame_of(id);
                self.cancel_prerendered_page(page, reason);
                true
            },
            LifecycleStateImpl::Speculative | LifecycleStateImpl::PendingCommit => {
                let context = self.diagnostic_context(id).with("event", format_args!("{reason:?}"));
                self.terminate_for_frame(
                    id,
                    BadMessageReason::InactiveFrameEventInSpeculativeState,
                    context,
                );
                true
            },
        }
    }

    /// Whether a renderer event may be handled in `id`. Prerendered pages keep
    /// loading, so they may handle the events that do not need to be shown.
    fn allow_renderer_event(
        &mut self,
        id: FrameId,
        reason: DisallowActivationReason,
        allowed_while_prerendering: bool,
    ) -> bool {
        let state = self.tree.get(id).map(|frame| frame.lifecycle_state());
        if allowed_while_prerendering && state == Some(LifecycleStateImpl::Prerendering) {
            return true;
        }
        !self.is_inactive_and_disallow_activation(id, reason)
    }

    fn create_child_frame(&mut self, parent: FrameId, routing_id: RoutingId, token: FrameToken) {
        if !self.allow_renderer_event(parent, DisallowActivationReason::ChildFrameCreation, true) {
            return;
        }
        let Some(process_id) = self.tree.get(parent).map(|frame| frame.process_id) else {
            return;
        };
        if self.ensure_can_host(process_id, routing_id, token).is_err() {
            let context = self
                .diagnostic_context(parent)
                .with("child", token)
                .with("child_routing_id", routing_id);
            return self.terminate_renderer(
                process_id,
                BadMessageReason::DuplicateFrameToken,
                context,
            );
        }
        let frame = Frame::new(token, process_id, routing_id, LifecycleStateImpl::Active);
        match self.tree.add_child(parent, frame) {
            Ok(id) => {
                self.register(id);
                debug!("Created child frame {token} of {parent:?}");
            },
            Err(error) => self.programming_error(error),
        }
    }

    fn detach_from_renderer(&mut self, id: FrameId) {
        if self.tree.is_main_frame(id) {
            let context = self.diagnostic_context(id);
            return self.terminate_for_frame(id, BadMessageReason::DetachMainFrame, context);
        }
        if self.tree.get(id).is_some_and(Frame::is_pending_deletion) {
            return;
        }
        if !self.allow_renderer_event(id, DisallowActivationReason::ChildFrameDetach, true) {
            return;
        }
        self.start_removal(id, UnloadKind::Detach);
    }

    fn update_unload_handler_state(&mut self, id: FrameId, has_unload_handler: bool) {
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        if !frame.lifecycle_state().has_committed_document() {
            let context = self.diagnostic_context(id).with("event", "UpdateUnloadHandlerState");
            return self.terminate_for_frame(
                id,
                BadMessageReason::InactiveFrameEventInSpeculativeState,
                context,
            );
        }
        frame.has_unload_handler = has_unload_handler;
    }

    fn update_before_unload_handler_state(&mut self, id: FrameId, has_handler: bool) {
        let Some(frame) = self.tree.get_mut(id) else {
            return;
        };
        if !frame.lifecycle_state().has_committed_document() {
            let context = self
                .diagnostic_context(id)
                .with("event", "UpdateBeforeUnloadHandlerState");
            return self.terminate_for_frame(
                id,
                BadMessageReason::InactiveFrameEventInSpeculativeState,
                context,
            );
        }
        frame.has_before_unload_handler = has_handler;
    }

    fn dispatch_dom_event(&mut self, id: FrameId, event_id: u64, event: DomEventKind) {
        let (reason, allowed_while_prerendering) = match event {
            DomEventKind::RunModalDialog(_) => (DisallowActivationReason::ModalDialog, false),
            DomEventKind::FocusChanged => (DisallowActivationReason::DomEvent, false),
            _ => (DisallowActivationReason::DomEvent, true),
        };
        if !self.allow_renderer_event(id, reason, allowed_while_prerendering) {
            debug!("Dropping {event:?} from inactive frame {id:?}");
            return;
        }
        let Some(routing_id) = self.tree.get(id).map(|frame| frame.routing_id) else {
            return;
        };
        let msg = FrameHostToRendererMsg::DomEventAck(routing_id, event_id);
        if let Err(error) = self.send_to_frame(id, msg) {
            debug!("Could not acknowledge {event:?}: {error}");
        }
    }

    fn begin_navigation_from_renderer(&mut self, id: FrameId, url: Url, has_user_gesture: bool) {
        if !self.allow_renderer_event(id, DisallowActivationReason::Navigation, false) {
            return;
        }
        if self.should_ignore_incoming_renderer_request(id, has_user_gesture) {
            debug!("Ignoring navigation to {url} without a user gesture");
            return;
        }
        if let Some(frame) = self.tree.get(id) {
            self.delegate.request_navigation(frame.token, url, has_user_gesture);
        }
    }

    /// A renderer-initiated navigation without a user gesture does not get to
    /// interrupt a navigation the browser started, or a history navigation.
    pub fn should_ignore_incoming_renderer_request(
        &self,
        id: FrameId,
        has_user_gesture: bool,
    ) -> bool {
        if has_user_gesture {
            return false;
        }
        [Some(id), self.tree.speculative_frame(id)]
            .into_iter()
            .flatten()
            .filter_map(|id| self.tree.get(id))
            .flat_map(|frame| frame.pending_requests.iter())
            .any(|request| request.is_browser_initiated() || request.navigation_type.is_history())
    }

    /// The policies that apply to subresources of `id`: those of the document
    /// about to be committed if there is one, and of the committed document
    /// otherwise.
    pub fn policy_snapshot_for_pending_or_last_committed(
        &self,
        id: FrameId,
    ) -> Option<PolicySnapshot> {
        let frame = self.tree.get(id)?;
        Some(match frame.pending_requests.most_recent_committing() {
            Some(request) => PolicySnapshot::for_pending_navigation(request),
            None => PolicySnapshot::for_last_committed(frame),
        })
    }

    fn update_subresource_factories(&mut self, id: FrameId) {
        let reason = DisallowActivationReason::SubresourceFactoryRequest;
        if !self.allow_renderer_event(id, reason, true) {
            return;
        }
        let Some(snapshot) = self.policy_snapshot_for_pending_or_last_committed(id) else {
            return;
        };
        let Some(frame) = self.tree.get(id) else {
            return;
        };
        let Some(process) = self.processes.get(&frame.process_id) else {
            return;
        };
        let document_url = frame
            .pending_requests
            .most_recent_committing()
            .map_or(&frame.last_committed_url, NavigationRequest::url);
        let factories = SubresourceFactoryBuilder::new(&snapshot, process, document_url)
            .disable_web_security(self.prefs.disable_web_security)
            .build();
        let msg = FrameHostToRendererMsg::UpdateSubresourceLoaderFactories(
            frame.routing_id,
            Box::new(factories),
        );
        if let Err(error) = process.send(msg) {
            debug!("Could not update subresource loaders of {}: {error}", frame.token);
        }
    }

    /// Terminate a renderer that sent a message it could not legitimately send.
    pub fn terminate_renderer(
        &mut self,
        process_id: RendererProcessId,
        reason: BadMessageReason,
        context: DiagnosticContext,
    ) {
        let Some(process) = self.processes.get_mut(&process_id) else {
            return;
        };
        if !process.is_alive() {
            return;
        }
        error!("Terminating renderer process {process_id}: {reason} [{context}]");
        process.mark_terminated(reason);
        self.delegate.notify_renderer_terminated(process_id, reason, &context);
        self.renderer_process_gone(process_id);
    }

    /// Clean up after a renderer process that went away. Frames that are not
    /// shown are destroyed. A main frame that is shown stays in place without
    /// a live document, so that the browser can navigate it again.
    pub fn renderer_process_gone(&mut self, process_id: RendererProcessId) {
        if let Some(process) = self.processes.get_mut(&process_id) {
            process.mark_gone();
        }
        warn!("Renderer process {process_id} went away");
        self.forget_process_in_before_unload_waits(process_id);

        let mut frames: Vec<(u32, FrameId)> = self
            .tree
            .iter()
            .filter(|(_, frame)| frame.process_id == process_id)
            .map(|(id, _)| (self.tree.depth(id).unwrap_or_default(), id))
            .collect();
        frames.sort();

        for (_, id) in frames {
            let Some(frame) = self.tree.get(id) else {
                continue;
            };
            match frame.lifecycle_state() {
                LifecycleStateImpl::Speculative | LifecycleStateImpl::PendingCommit => {
                    self.discard_speculative_frame(id)
                },
                LifecycleStateImpl::RunningUnloadHandlers => {
                    if frame.is_waiting_for_unload_ack() {
                        self.abandon_unload(id);
                    } else {
                        self.set_lifecycle_state(id, LifecycleStateImpl::ReadyToBeDeleted);
                        self.check_removal_completed(id);
                    }
                },
                LifecycleStateImpl::ReadyToBeDeleted => self.check_removal_completed(id),
                LifecycleStateImpl::InBackForwardCache => {
                    let page = self.tree.main_frame_of(id);
                    self.evict_page(page, EvictionReason::RendererProcessGone);
                },
                LifecycleStateImpl::Prerendering => {
                    let page = self.tree.main_frame_of(id);
                    self.cancel_prerendered_page(
                        page,
                        DisallowActivationReason::RendererProcessGone,
                    );
                },
                LifecycleStateImpl::Active if self.tree.is_main_frame(id) => {
                    self.cancel_pending_navigations(id);
                    if let Some(frame) = self.tree.get_mut(id) {
                        frame.is_render_frame_live = false;
                    }
                    for child in self.tree.children(id).to_vec() {
                        self.start_removal(child, UnloadKind::Detach);
                    }
                },
                LifecycleStateImpl::Active => self.start_removal(id, UnloadKind::Detach),
            }
        }
    }
}
