/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::anyhow;
use crossbeam_channel::{Receiver, unbounded};
use frame_host::{
    BackForwardCache, BadMessageReason, CommitDetails, DiagnosticContext, DiagnosticMismatch,
    DisallowActivationReason, EvictionReason, FrameHostDelegate, FrameHostManager,
    FrameHostManagerBuilder, FrameId, LifecycleStateImpl, NavigationMetrics, NavigationRequest,
    Preferences, ProcessLock, RendererProcess, UnloadOutcome,
};
use frame_host_traits::{
    DidCommitProvisionalLoadParams, DocumentPolicy, DocumentSequenceNumber, EmbeddingToken,
    FrameHostToRendererMsg, FrameToken, ItemSequenceNumber, LifecycleState, NavigationRequestId,
    NavigationType, PageState, RendererProcessId, RendererToFrameHostMsg, RoutingId,
};
use url::Url;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn url(spec: &str) -> Url {
    Url::parse(spec).unwrap_or_else(|error| unreachable!("{spec} is not a valid URL: {error}"))
}

/// Preferences for tests that provoke inconsistencies on purpose.
pub fn test_preferences() -> Preferences {
    let mut prefs = Preferences::default();
    prefs.hard_fail = false;
    prefs.assert_on_commit_param_mismatch = false;
    prefs
}

#[derive(Default)]
pub struct RecordingDelegate {
    pub lifecycle_changes: RefCell<Vec<(FrameToken, LifecycleState, LifecycleState)>>,
    pub commits: RefCell<Vec<CommitDetails>>,
    pub deleted: RefCell<Vec<FrameToken>>,
    pub unloads: RefCell<Vec<(FrameToken, UnloadOutcome)>>,
    pub terminations: RefCell<Vec<(RendererProcessId, BadMessageReason, DiagnosticContext)>>,
    pub mismatches: RefCell<Vec<DiagnosticMismatch>>,
    pub cancelled_prerenders: RefCell<Vec<(FrameToken, DisallowActivationReason)>>,
    pub navigation_requests: RefCell<Vec<(FrameToken, Url, bool)>>,
    pub cancelled_navigations: RefCell<Vec<(FrameToken, NavigationRequestId)>>,
    pub navigation_metrics: RefCell<Vec<(FrameToken, NavigationMetrics)>>,
}

impl RecordingDelegate {
    pub fn termination_reasons(&self) -> Vec<BadMessageReason> {
        self.terminations
            .borrow()
            .iter()
            .map(|(_, reason, _)| *reason)
            .collect()
    }

    pub fn was_deleted(&self, token: FrameToken) -> bool {
        self.deleted.borrow().contains(&token)
    }
}

impl FrameHostDelegate for RecordingDelegate {
    fn notify_lifecycle_changed(
        &self,
        frame: FrameToken,
        old: LifecycleState,
        new: LifecycleState,
    ) {
        self.lifecycle_changes.borrow_mut().push((frame, old, new));
    }

    fn notify_navigation_committed(&self, details: &CommitDetails) {
        self.commits.borrow_mut().push(details.clone());
    }

    fn notify_frame_deleted(&self, frame: FrameToken) {
        self.deleted.borrow_mut().push(frame);
    }

    fn notify_unload_completed(&self, local_root: FrameToken, outcome: UnloadOutcome) {
        self.unloads.borrow_mut().push((local_root, outcome));
    }

    fn notify_renderer_terminated(
        &self,
        process: RendererProcessId,
        reason: BadMessageReason,
        context: &DiagnosticContext,
    ) {
        self.terminations
            .borrow_mut()
            .push((process, reason, context.clone()));
    }

    fn record_commit_mismatch(&self, _frame: FrameToken, mismatch: &DiagnosticMismatch) {
        self.mismatches.borrow_mut().push(mismatch.clone());
    }

    fn cancel_prerendering(&self, page: FrameToken, reason: DisallowActivationReason) {
        self.cancelled_prerenders.borrow_mut().push((page, reason));
    }

    fn request_navigation(&self, frame: FrameToken, url: Url, has_user_gesture: bool) {
        self.navigation_requests
            .borrow_mut()
            .push((frame, url, has_user_gesture));
    }

    fn notify_navigation_cancelled(&self, frame: FrameToken, navigation: NavigationRequestId) {
        self.cancelled_navigations.borrow_mut().push((frame, navigation));
    }

    fn record_navigation_metrics(&self, frame: FrameToken, metrics: &NavigationMetrics) {
        self.navigation_metrics.borrow_mut().push((frame, metrics.clone()));
    }
}

#[derive(Default)]
pub struct RecordingBackForwardCache {
    pub accepts_pages: Cell<bool>,
    pub evictions: RefCell<Vec<(FrameToken, EvictionReason)>>,
}

impl BackForwardCache for RecordingBackForwardCache {
    fn can_store(&self, _page: FrameToken) -> bool {
        self.accepts_pages.get()
    }

    fn evict(&self, page: FrameToken, reason: EvictionReason) {
        self.evictions.borrow_mut().push((page, reason));
    }
}

/// The far end of a renderer process's channel.
pub struct TestRenderer {
    pub id: RendererProcessId,
    pub receiver: Receiver<FrameHostToRendererMsg>,
}

impl TestRenderer {
    pub fn take_messages(&self) -> Vec<FrameHostToRendererMsg> {
        self.receiver.try_iter().collect()
    }
}

pub struct FrameHostTest {
    pub manager: FrameHostManager,
    pub delegate: Rc<RecordingDelegate>,
    pub cache: Rc<RecordingBackForwardCache>,
    next_routing_id: u32,
}

impl FrameHostTest {
    pub fn new() -> FrameHostTest {
        FrameHostTest::with_preferences(test_preferences())
    }

    pub fn with_preferences(prefs: Preferences) -> FrameHostTest {
        init_logging();
        let delegate = Rc::new(RecordingDelegate::default());
        let cache = Rc::new(RecordingBackForwardCache::default());
        let manager = FrameHostManagerBuilder::new()
            .preferences(prefs)
            .delegate(delegate.clone())
            .back_forward_cache(cache.clone())
            .build();
        FrameHostTest {
            manager,
            delegate,
            cache,
            next_routing_id: 1,
        }
    }

    pub fn next_routing_id(&mut self) -> RoutingId {
        let routing_id = RoutingId(self.next_routing_id);
        self.next_routing_id += 1;
        routing_id
    }

    pub fn add_renderer(&mut self, id: u32) -> TestRenderer {
        self.add_renderer_with_lock(id, ProcessLock::Unlocked)
    }

    pub fn add_renderer_with_lock(&mut self, id: u32, lock: ProcessLock) -> TestRenderer {
        let (sender, receiver) = unbounded();
        let id = RendererProcessId(id);
        self.manager
            .add_renderer_process(RendererProcess::new(id, sender, lock));
        TestRenderer { id, receiver }
    }

    pub fn create_main_frame(&mut self, renderer: &TestRenderer) -> anyhow::Result<FrameId> {
        let routing_id = self.next_routing_id();
        Ok(self
            .manager
            .create_main_frame(renderer.id, routing_id, FrameToken::new())?)
    }

    pub fn create_speculative_frame(
        &mut self,
        position: FrameId,
        renderer: &TestRenderer,
    ) -> anyhow::Result<FrameId> {
        let routing_id = self.next_routing_id();
        Ok(self
            .manager
            .create_speculative_frame(position, renderer.id, routing_id, FrameToken::new())?)
    }

    /// Have the renderer of `parent` create a child frame in the same process.
    pub fn create_child(&mut self, parent: FrameId) -> anyhow::Result<FrameId> {
        let (process_id, parent_routing_id) = {
            let frame = self.frame(parent)?;
            (frame.process_id(), frame.routing_id())
        };
        let routing_id = self.next_routing_id();
        let token = FrameToken::new();
        self.manager.handle_renderer_message(
            process_id,
            RendererToFrameHostMsg::CreateChildFrame(parent_routing_id, routing_id, token),
        );
        self.manager
            .find_frame(token)
            .ok_or_else(|| anyhow!("child frame {token} was not created"))
    }

    pub fn frame(&self, id: FrameId) -> anyhow::Result<&frame_host::Frame> {
        self.manager
            .frame(id)
            .ok_or_else(|| anyhow!("frame {id:?} does not exist"))
    }

    pub fn state(&self, id: FrameId) -> Option<LifecycleStateImpl> {
        self.manager.frame(id).map(|frame| frame.lifecycle_state())
    }

    pub fn token(&self, id: FrameId) -> anyhow::Result<FrameToken> {
        Ok(self.frame(id)?.token())
    }

    /// Deliver `msg` as if the renderer hosting `id` sent it about `id`.
    pub fn from_renderer_of(
        &mut self,
        id: FrameId,
        msg: impl FnOnce(RoutingId) -> RendererToFrameHostMsg,
    ) -> anyhow::Result<()> {
        let frame = self.frame(id)?;
        let (process_id, routing_id) = (frame.process_id(), frame.routing_id());
        self.manager.handle_renderer_message(process_id, msg(routing_id));
        Ok(())
    }

    /// The parameters an honest renderer reports after committing `request`
    /// in its target frame.
    pub fn params_for(&self, request: &NavigationRequest) -> DidCommitProvisionalLoadParams {
        let is_main_frame = self.manager.tree().is_main_frame(request.target_frame());
        commit_params_for(request, is_main_frame)
    }

    /// Send the commit of `request` and have the renderer report it as expected.
    pub fn commit(&mut self, request: NavigationRequest) -> anyhow::Result<()> {
        let target = request.target_frame();
        let params = self.params_for(&request);
        let is_same_document = request.is_same_document();
        let is_activation = request.is_page_activation();
        self.manager.begin_commit(request)?;
        self.from_renderer_of(target, |routing_id| {
            let params = Box::new(params);
            if is_same_document {
                RendererToFrameHostMsg::DidCommitSameDocumentNavigation(routing_id, params)
            } else if is_activation {
                RendererToFrameHostMsg::DidCommitPageActivation(routing_id, params)
            } else {
                RendererToFrameHostMsg::DidCommitProvisionalLoad(routing_id, params)
            }
        })
    }

    /// Navigate `position` to `url` in a new speculative frame hosted by `renderer`.
    pub fn navigate_in_speculative_frame(
        &mut self,
        position: FrameId,
        renderer: &TestRenderer,
        url_spec: &str,
    ) -> anyhow::Result<FrameId> {
        let speculative = self.create_speculative_frame(position, renderer)?;
        let request = ready_request(position, url_spec)?.commit_in(speculative);
        self.commit(request)?;
        Ok(speculative)
    }
}

/// A cross-document navigation of `frame` that received its response.
pub fn ready_request(frame: FrameId, url_spec: &str) -> anyhow::Result<NavigationRequest> {
    let mut request = NavigationRequest::new(frame, url(url_spec));
    request.did_receive_response(200)?;
    Ok(request)
}

/// The parameters an honest renderer reports after committing `request`.
pub fn commit_params_for(
    request: &NavigationRequest,
    is_main_frame: bool,
) -> DidCommitProvisionalLoadParams {
    let creates_document = !request.is_same_document() && !request.is_page_activation();
    let did_create_new_entry = if request.should_replace_current_entry() {
        is_main_frame && !request.is_same_document() && !request.navigation_type().is_history()
    } else {
        matches!(
            request.navigation_type(),
            NavigationType::DifferentDocument | NavigationType::SameDocument
        )
    };
    DidCommitProvisionalLoadParams {
        navigation_token: request.token(),
        url: request.url().clone(),
        origin: request.origin_to_commit().clone(),
        method: request.method().clone(),
        post_id: request.post_id().unwrap_or(-1),
        http_status_code: if request.is_page_activation() {
            200
        } else {
            request.response_code().unwrap_or(0)
        },
        transition: request.transition(),
        should_replace_current_entry: request.should_replace_current_entry(),
        did_create_new_entry,
        history_list_was_cleared: false,
        embedding_token: creates_document.then(EmbeddingToken::new),
        document_policy: DocumentPolicy::default(),
        page_state: PageState::default(),
        item_sequence_number: ItemSequenceNumber(1),
        document_sequence_number: DocumentSequenceNumber(1),
        is_history_api_navigation: false,
        is_renderer_initiated: false,
    }
}
