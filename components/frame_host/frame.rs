/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use frame_host_traits::{
    ClientSecurityState, DocumentPolicy, DocumentSequenceNumber, EmbeddingToken, FrameToken,
    ImmutableOrigin, IsolationInfo, IsolationRequestType, LifecycleState, NavigationToken,
    RendererProcessId, RoutingId, TrustTokenRedemption,
};
use http::Method;
use rustc_hash::FxHashSet;
use url::Url;

use crate::lifecycle::{Lifecycle, LifecycleStateImpl};
use crate::navigation_request::NavigationRequest;
use crate::pending_requests::PendingRequestRegistry;
use crate::policy_snapshot::PolicySnapshot;
use crate::unload::UnloadTicket;

/// The browser-side host of one document in one renderer process.
///
/// Tree structure (parent, children, speculative frames) is owned by the
/// [`crate::frame_tree::FrameTree`] that holds the frame.
#[derive(Debug)]
pub struct Frame {
    pub(crate) token: FrameToken,
    pub(crate) process_id: RendererProcessId,
    pub(crate) routing_id: RoutingId,
    pub(crate) lifecycle: Lifecycle,

    pub(crate) last_committed_url: Url,
    pub(crate) last_committed_origin: ImmutableOrigin,
    pub(crate) last_http_method: Method,
    pub(crate) last_http_status_code: u16,
    pub(crate) last_post_id: i64,
    pub(crate) document_sequence_number: Option<DocumentSequenceNumber>,
    pub(crate) embedding_token: Option<EmbeddingToken>,
    pub(crate) document_policy: DocumentPolicy,
    /// The policy the embedder requires of any document committed in this frame.
    pub(crate) required_document_policy: DocumentPolicy,

    pub(crate) isolation_info: IsolationInfo,
    pub(crate) client_security_state: ClientSecurityState,
    pub(crate) trust_token_redemption: TrustTokenRedemption,

    pub(crate) is_on_initial_empty_document: bool,
    pub(crate) is_error_document: bool,
    pub(crate) is_archive_document: bool,
    pub(crate) in_prerendered_page: bool,
    pub(crate) has_unload_handler: bool,
    pub(crate) has_before_unload_handler: bool,
    /// Cleared when the renderer process hosting the frame goes away while the
    /// frame stays in the tree.
    pub(crate) is_render_frame_live: bool,

    pub(crate) pending_requests: PendingRequestRegistry,
    pub(crate) last_committed_navigation: Option<NavigationRequest>,
    /// Commits the renderer was told to abandon. A late commit report for one of
    /// these is a race, not misbehavior.
    pub(crate) undone_commits: FxHashSet<NavigationToken>,
    pub(crate) unload_ticket: Option<UnloadTicket>,
}

impl Frame {
    /// A frame showing its initial empty document.
    pub(crate) fn new(
        token: FrameToken,
        process_id: RendererProcessId,
        routing_id: RoutingId,
        initial_state: LifecycleStateImpl,
    ) -> Frame {
        let origin = ImmutableOrigin::new_opaque();
        Frame {
            token,
            process_id,
            routing_id,
            lifecycle: Lifecycle::new(initial_state),
            last_committed_url: about_blank(),
            isolation_info: IsolationInfo::new(
                IsolationRequestType::MainFrame,
                origin.clone(),
                origin.clone(),
            ),
            last_committed_origin: origin,
            last_http_method: Method::GET,
            last_http_status_code: 0,
            last_post_id: -1,
            document_sequence_number: None,
            embedding_token: None,
            document_policy: DocumentPolicy::default(),
            required_document_policy: DocumentPolicy::default(),
            client_security_state: ClientSecurityState::default(),
            trust_token_redemption: TrustTokenRedemption::Forbidden,
            is_on_initial_empty_document: true,
            is_error_document: false,
            is_archive_document: false,
            in_prerendered_page: false,
            has_unload_handler: false,
            has_before_unload_handler: false,
            is_render_frame_live: true,
            pending_requests: PendingRequestRegistry::default(),
            last_committed_navigation: None,
            undone_commits: FxHashSet::default(),
            unload_ticket: None,
        }
    }

    /// Give a new child frame's initial empty document the origin and network
    /// state of its parent's document.
    pub(crate) fn inherit_from_parent(&mut self, parent: &Frame) {
        self.last_committed_origin = parent.last_committed_origin.clone();
        self.isolation_info = IsolationInfo {
            request_type: IsolationRequestType::SubFrame,
            top_frame_origin: parent.isolation_info.top_frame_origin.clone(),
            frame_origin: Some(parent.last_committed_origin.clone()),
            nonce: parent.isolation_info.nonce,
        };
        self.client_security_state = parent.client_security_state.clone();
        self.trust_token_redemption = parent.trust_token_redemption;
        self.in_prerendered_page = parent.in_prerendered_page;
    }

    pub fn token(&self) -> FrameToken {
        self.token
    }

    pub fn process_id(&self) -> RendererProcessId {
        self.process_id
    }

    pub fn routing_id(&self) -> RoutingId {
        self.routing_id
    }

    pub fn lifecycle_state(&self) -> LifecycleStateImpl {
        self.lifecycle.state()
    }

    /// The coarse lifecycle state exposed to observers.
    pub fn public_lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state().to_public()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.state().is_active()
    }

    pub fn is_inactive(&self) -> bool {
        self.lifecycle.state().is_inactive()
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.lifecycle.state().is_pending_deletion()
    }

    pub fn is_in_back_forward_cache(&self) -> bool {
        self.lifecycle.state().is_in_back_forward_cache()
    }

    pub fn is_prerendering(&self) -> bool {
        self.lifecycle.state().is_prerendering()
    }

    pub fn last_committed_url(&self) -> &Url {
        &self.last_committed_url
    }

    pub fn last_committed_origin(&self) -> &ImmutableOrigin {
        &self.last_committed_origin
    }

    pub fn last_http_method(&self) -> &Method {
        &self.last_http_method
    }

    pub fn last_http_status_code(&self) -> u16 {
        self.last_http_status_code
    }

    pub fn document_sequence_number(&self) -> Option<DocumentSequenceNumber> {
        self.document_sequence_number
    }

    pub fn embedding_token(&self) -> Option<EmbeddingToken> {
        self.embedding_token
    }

    pub fn document_policy(&self) -> &DocumentPolicy {
        &self.document_policy
    }

    pub fn set_required_document_policy(&mut self, policy: DocumentPolicy) {
        self.required_document_policy = policy;
    }

    pub fn is_on_initial_empty_document(&self) -> bool {
        self.is_on_initial_empty_document
    }

    pub fn is_error_document(&self) -> bool {
        self.is_error_document
    }

    pub fn is_archive_document(&self) -> bool {
        self.is_archive_document
    }

    pub fn in_prerendered_page(&self) -> bool {
        self.in_prerendered_page
    }

    pub fn has_unload_handler(&self) -> bool {
        self.has_unload_handler
    }

    pub fn has_before_unload_handler(&self) -> bool {
        self.has_before_unload_handler
    }

    pub fn is_render_frame_live(&self) -> bool {
        self.is_render_frame_live
    }

    pub fn pending_requests(&self) -> &PendingRequestRegistry {
        &self.pending_requests
    }

    /// Whether the renderer was told to abandon the commit of `token`, and has
    /// not committed a new document since.
    pub fn is_commit_undone(&self, token: NavigationToken) -> bool {
        self.undone_commits.contains(&token)
    }

    pub fn last_committed_navigation(&self) -> Option<&NavigationRequest> {
        self.last_committed_navigation.as_ref()
    }

    pub fn unload_ticket(&self) -> Option<&UnloadTicket> {
        self.unload_ticket.as_ref()
    }

    /// Whether an unload message was sent and its acknowledgement is outstanding.
    pub fn is_waiting_for_unload_ack(&self) -> bool {
        self.unload_ticket
            .as_ref()
            .is_some_and(UnloadTicket::is_waiting_for_ack)
    }

    /// The policy snapshot of the document this frame last committed.
    pub fn policy_snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::for_last_committed(self)
    }
}

pub(crate) fn about_blank() -> Url {
    Url::parse("about:blank").unwrap_or_else(|_| unreachable!("about:blank is a valid URL"))
}
