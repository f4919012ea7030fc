/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The browser's record of a single navigation attempt.

use std::time::Instant;

use frame_host_traits::{
    ClientSecurityState, DocumentSequenceNumber, ImmutableOrigin, IsolationInfo,
    IsolationRequestType, ItemSequenceNumber, NavigationRequestId, NavigationToken,
    NavigationType, PageActivationKind, PageState, PageTransition, PageTransitionType,
    TrustTokenRedemption,
};
use http::Method;
use log::warn;
use url::Url;

use crate::frame_tree::FrameId;
use crate::navigation_metrics::NavigationTiming;

/// Progress of a navigation. States only ever move forward; `Committed` and
/// `Failed` are terminal.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum NavigationState {
    Started,
    ResponseReceived,
    /// The commit is held until renderers ran the beforeunload handlers of the
    /// documents it replaces.
    WaitingForBeforeUnload,
    /// The commit was sent to the renderer.
    ReadyToCommit,
    Committed,
    Failed,
}

impl NavigationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NavigationState::Committed | NavigationState::Failed)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("navigation {id} cannot move from {from:?} to {to:?}")]
pub struct NavigationStateError {
    pub id: NavigationRequestId,
    pub from: NavigationState,
    pub to: NavigationState,
}

/// The session history entry a navigation commits into, as the browser recorded
/// it when the navigation started.
#[derive(Clone, Debug)]
pub struct FrameEntry {
    pub item_sequence_number: ItemSequenceNumber,
    pub document_sequence_number: DocumentSequenceNumber,
    pub page_state: PageState,
    /// For subframe history navigations: the main frame document that the
    /// history entry belongs to.
    pub main_frame_document_sequence_number: Option<DocumentSequenceNumber>,
    pub main_frame_url: Option<Url>,
    pub main_frame_origin: Option<ImmutableOrigin>,
}

/// A navigation in flight. Owned by the pending request registry of the frame it
/// will commit in, and by the frame's last committed navigation slot after it
/// commits.
#[derive(Debug)]
pub struct NavigationRequest {
    pub(crate) id: NavigationRequestId,
    pub(crate) token: NavigationToken,
    /// The position in the frame tree being navigated.
    pub(crate) frame: FrameId,
    /// The frame that will commit, if it is not `frame` itself.
    pub(crate) commit_frame: Option<FrameId>,
    pub(crate) url: Url,
    pub(crate) origin_to_commit: ImmutableOrigin,
    pub(crate) isolation_info: IsolationInfo,
    pub(crate) client_security_state: ClientSecurityState,
    pub(crate) trust_token_redemption: TrustTokenRedemption,
    pub(crate) state: NavigationState,
    pub(crate) start_time: Instant,
    pub(crate) redirect_chain: Vec<Url>,
    pub(crate) method: Method,
    pub(crate) post_id: Option<i64>,
    pub(crate) response_code: Option<u16>,
    pub(crate) is_same_document: bool,
    pub(crate) page_activation: Option<PageActivationKind>,
    pub(crate) navigation_type: NavigationType,
    pub(crate) transition: PageTransition,
    pub(crate) should_replace_current_entry: bool,
    pub(crate) should_clear_history_list: bool,
    pub(crate) frame_entry: Option<FrameEntry>,
    pub(crate) is_error_page: bool,
    pub(crate) error_code: Option<i32>,
    pub(crate) error_page_content: Option<String>,
    pub(crate) is_load_data_with_base_url: bool,
    pub(crate) is_archive_document: bool,
    pub(crate) is_renderer_initiated: bool,
    pub(crate) has_user_gesture: bool,
    pub(crate) timing: NavigationTiming,
}

impl NavigationRequest {
    /// A browser-initiated, cross-document navigation of `frame` to `url`.
    pub fn new(frame: FrameId, url: Url) -> NavigationRequest {
        let origin = ImmutableOrigin::from_url(&url);
        NavigationRequest {
            id: NavigationRequestId::new(),
            token: NavigationToken::new(),
            frame,
            commit_frame: None,
            isolation_info: IsolationInfo::new(
                IsolationRequestType::MainFrame,
                origin.clone(),
                origin.clone(),
            ),
            origin_to_commit: origin,
            client_security_state: ClientSecurityState::default(),
            trust_token_redemption: TrustTokenRedemption::Allowed,
            state: NavigationState::Started,
            start_time: Instant::now(),
            redirect_chain: vec![url.clone()],
            url,
            method: Method::GET,
            post_id: None,
            response_code: None,
            is_same_document: false,
            page_activation: None,
            navigation_type: NavigationType::DifferentDocument,
            transition: PageTransition::new(PageTransitionType::Link),
            should_replace_current_entry: false,
            should_clear_history_list: false,
            frame_entry: None,
            is_error_page: false,
            error_code: None,
            error_page_content: None,
            is_load_data_with_base_url: false,
            is_archive_document: false,
            is_renderer_initiated: false,
            has_user_gesture: false,
            timing: NavigationTiming::default(),
        }
    }

    /// Commit in `frame` (usually a speculative frame) rather than the navigated
    /// position itself.
    pub fn commit_in(mut self, frame: FrameId) -> NavigationRequest {
        self.commit_frame = Some(frame);
        self
    }

    pub fn same_document(mut self) -> NavigationRequest {
        self.is_same_document = true;
        self.navigation_type = NavigationType::SameDocument;
        self
    }

    pub fn page_activation(mut self, kind: PageActivationKind) -> NavigationRequest {
        self.page_activation = Some(kind);
        self.navigation_type = match kind {
            PageActivationKind::BackForwardCacheRestore => NavigationType::HistoryDifferentDocument,
            PageActivationKind::PrerenderActivation => NavigationType::DifferentDocument,
        };
        self
    }

    pub fn with_origin_to_commit(mut self, origin: ImmutableOrigin) -> NavigationRequest {
        self.origin_to_commit = origin;
        self
    }

    pub fn with_isolation_info(mut self, isolation_info: IsolationInfo) -> NavigationRequest {
        self.isolation_info = isolation_info;
        self
    }

    pub fn with_client_security_state(mut self, state: ClientSecurityState) -> NavigationRequest {
        self.client_security_state = state;
        self
    }

    pub fn with_trust_token_redemption(
        mut self,
        redemption: TrustTokenRedemption,
    ) -> NavigationRequest {
        self.trust_token_redemption = redemption;
        self
    }

    pub fn with_method(mut self, method: Method, post_id: Option<i64>) -> NavigationRequest {
        self.method = method;
        self.post_id = post_id;
        self
    }

    pub fn with_navigation_type(mut self, navigation_type: NavigationType) -> NavigationRequest {
        self.navigation_type = navigation_type;
        self
    }

    pub fn with_transition(mut self, transition: PageTransition) -> NavigationRequest {
        self.transition = transition;
        self
    }

    pub fn with_frame_entry(mut self, entry: FrameEntry) -> NavigationRequest {
        self.frame_entry = Some(entry);
        self
    }

    pub fn replacing_current_entry(mut self) -> NavigationRequest {
        self.should_replace_current_entry = true;
        self
    }

    pub fn clearing_history_list(mut self) -> NavigationRequest {
        self.should_clear_history_list = true;
        self
    }

    pub fn load_data_with_base_url(mut self) -> NavigationRequest {
        self.is_load_data_with_base_url = true;
        self
    }

    pub fn archive_document(mut self) -> NavigationRequest {
        self.is_archive_document = true;
        self
    }

    pub fn renderer_initiated(mut self, has_user_gesture: bool) -> NavigationRequest {
        self.is_renderer_initiated = true;
        self.has_user_gesture = has_user_gesture;
        self
    }

    pub fn id(&self) -> NavigationRequestId {
        self.id
    }

    pub fn token(&self) -> NavigationToken {
        self.token
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// The frame the commit is sent to.
    pub fn target_frame(&self) -> FrameId {
        self.commit_frame.unwrap_or(self.frame)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn origin_to_commit(&self) -> &ImmutableOrigin {
        &self.origin_to_commit
    }

    pub fn isolation_info(&self) -> &IsolationInfo {
        &self.isolation_info
    }

    pub fn client_security_state(&self) -> &ClientSecurityState {
        &self.client_security_state
    }

    pub fn trust_token_redemption(&self) -> TrustTokenRedemption {
        self.trust_token_redemption
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn redirect_chain(&self) -> &[Url] {
        &self.redirect_chain
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn post_id(&self) -> Option<i64> {
        self.post_id
    }

    pub fn navigation_type(&self) -> NavigationType {
        self.navigation_type
    }

    pub fn transition(&self) -> PageTransition {
        self.transition
    }

    pub fn should_replace_current_entry(&self) -> bool {
        self.should_replace_current_entry
    }

    pub fn response_code(&self) -> Option<u16> {
        self.response_code
    }

    pub fn is_same_document(&self) -> bool {
        self.is_same_document
    }

    pub fn page_activation_kind(&self) -> Option<PageActivationKind> {
        self.page_activation
    }

    pub fn is_page_activation(&self) -> bool {
        self.page_activation.is_some()
    }

    pub fn is_error_page(&self) -> bool {
        self.is_error_page
    }

    pub fn is_renderer_initiated(&self) -> bool {
        self.is_renderer_initiated
    }

    /// Whether the navigation was started by the browser (the address bar, a
    /// bookmark or session history) rather than by page content.
    pub fn is_browser_initiated(&self) -> bool {
        !self.is_renderer_initiated
    }

    pub fn timing(&self) -> &NavigationTiming {
        &self.timing
    }

    pub fn frame_entry(&self) -> Option<&FrameEntry> {
        self.frame_entry.as_ref()
    }

    /// Record the final response of the navigation.
    pub fn did_receive_response(&mut self, status_code: u16) -> Result<(), NavigationStateError> {
        self.set_state(NavigationState::ResponseReceived)?;
        self.response_code = Some(status_code);
        Ok(())
    }

    /// Follow a redirect to `url`. Only possible before the response is received.
    pub fn did_redirect(&mut self, url: Url) -> Result<(), NavigationStateError> {
        if self.state != NavigationState::Started {
            return Err(NavigationStateError {
                id: self.id,
                from: self.state,
                to: NavigationState::Started,
            });
        }
        self.origin_to_commit = ImmutableOrigin::from_url(&url);
        self.redirect_chain.push(url.clone());
        self.url = url;
        Ok(())
    }

    /// Turn this navigation into an error page for `error_code`. Error pages
    /// always commit with an opaque origin derived from the URL they replace.
    pub fn fail_with_error_page(&mut self, error_code: i32) {
        self.is_error_page = true;
        self.error_code = Some(error_code);
        self.origin_to_commit = ImmutableOrigin::from_url(&self.url).derive_new_opaque();
        self.isolation_info = IsolationInfo::create_transient();
        self.trust_token_redemption = TrustTokenRedemption::Forbidden;
        self.response_code = None;
    }

    pub fn set_error_page_content(&mut self, content: String) {
        self.error_page_content = Some(content);
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error_code
    }

    pub fn ready_to_commit(&mut self) -> Result<(), NavigationStateError> {
        self.set_state(NavigationState::ReadyToCommit)
    }

    /// Give up on a navigation that will never commit. A navigation that
    /// already finished keeps its state.
    pub(crate) fn fail(&mut self) {
        if let Err(error) = self.set_state(NavigationState::Failed) {
            warn!("Cannot fail navigation: {error}");
        }
    }

    pub(crate) fn set_state(&mut self, to: NavigationState) -> Result<(), NavigationStateError> {
        if self.state.is_terminal() || to < self.state {
            return Err(NavigationStateError {
                id: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
