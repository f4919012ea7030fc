/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Messages exchanged between the frame host and renderer processes.

use std::path::PathBuf;
use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::id::{
    DocumentSequenceNumber, EmbeddingToken, FrameToken, ItemSequenceNumber, NavigationToken,
    RoutingId,
};
use crate::loader::SubresourceLoaderFactories;
use crate::origin::ImmutableOrigin;
use crate::page_transition::{NavigationType, PageTransition};
use crate::policy::DocumentPolicy;

/// Serialized state of a history entry. Opaque to the browser, except for the
/// list of local files it references, which a renderer would read on restore.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PageState {
    pub encoded: Vec<u8>,
    pub referenced_files: Vec<PathBuf>,
}

/// How a page activation reuses an already rendered document.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PageActivationKind {
    BackForwardCacheRestore,
    PrerenderActivation,
}

/// Everything a renderer needs to commit a navigation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CommitNavigationParams {
    pub routing_id: RoutingId,
    pub navigation_token: NavigationToken,
    pub url: Url,
    pub origin_to_commit: ImmutableOrigin,
    #[serde(with = "crate::method_serde")]
    pub method: Method,
    pub post_id: Option<i64>,
    pub is_same_document: bool,
    pub page_activation: Option<PageActivationKind>,
    pub navigation_type: NavigationType,
    pub transition: PageTransition,
    pub should_replace_current_entry: bool,
    pub should_clear_history_list: bool,
    pub page_state: Option<PageState>,
    /// `None` for same-document navigations and page activations, which keep
    /// the loaders of the existing document.
    pub subresource_loader_factories: Option<SubresourceLoaderFactories>,
}

/// Everything a renderer needs to commit an error page in place of a navigation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CommitFailedNavigationParams {
    pub routing_id: RoutingId,
    pub navigation_token: NavigationToken,
    pub url: Url,
    pub error_code: i32,
    pub error_page_content: Option<String>,
    pub subresource_loader_factories: SubresourceLoaderFactories,
}

/// What a renderer claims about a navigation it just committed. Every field is
/// untrusted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DidCommitProvisionalLoadParams {
    /// The token of the navigation being committed. Renderer-initiated
    /// same-document navigations may not have one the browser knows about.
    pub navigation_token: NavigationToken,
    pub url: Url,
    pub origin: ImmutableOrigin,
    #[serde(with = "crate::method_serde")]
    pub method: Method,
    pub post_id: i64,
    pub http_status_code: u16,
    pub transition: PageTransition,
    pub should_replace_current_entry: bool,
    pub did_create_new_entry: bool,
    pub history_list_was_cleared: bool,
    pub embedding_token: Option<EmbeddingToken>,
    pub document_policy: DocumentPolicy,
    pub page_state: PageState,
    pub item_sequence_number: ItemSequenceNumber,
    pub document_sequence_number: DocumentSequenceNumber,
    /// Set for same-document commits caused by `history.pushState()` or
    /// `history.replaceState()`.
    pub is_history_api_navigation: bool,
    /// Set for same-document commits the renderer started on its own, such as
    /// following a fragment link.
    pub is_renderer_initiated: bool,
}

/// Why a renderer is asked to unload a frame.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum UnloadKind {
    /// The frame was removed from the tree.
    Detach,
    /// The frame's document is being replaced by one in another frame host.
    NavigatedAway,
}

/// The answer of a renderer that ran the beforeunload handlers of a frame and its
/// same-process descendants.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BeforeUnloadReply {
    /// Whether the navigation may go on. False if the user chose to stay.
    pub proceed: bool,
    /// How long the handlers ran, as measured by the renderer.
    pub handler_duration: Duration,
}

/// Renderer-originated events that require an active document.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DomEventKind {
    DomContentLoaded,
    Load,
    FocusChanged,
    RunModalDialog(String),
    TitleChanged(String),
}

/// Messages from the frame host to a renderer process.
#[derive(Debug, Deserialize, Serialize)]
pub enum FrameHostToRendererMsg {
    /// Commit a navigation. Answered by one of the `DidCommit*` messages.
    CommitNavigation(Box<CommitNavigationParams>),
    /// Commit an error page. Answered by `DidCommitProvisionalLoad`.
    CommitFailedNavigation(Box<CommitFailedNavigationParams>),
    /// Unload the frame and every same-process descendant. Answered by `UnloadAck`.
    Unload(RoutingId, UnloadKind),
    /// Run the beforeunload handlers of the frame and every same-process
    /// descendant. Set when the navigation is a reload. Answered by
    /// `BeforeUnloadCompleted`.
    BeforeUnload(RoutingId, bool),
    /// Abandon a commit that the browser no longer wants. Not answered.
    UndoCommitNavigation(RoutingId, NavigationToken),
    /// A renderer-originated event was accepted.
    DomEventAck(RoutingId, u64),
    /// Replace the subresource loaders of the current document.
    UpdateSubresourceLoaderFactories(RoutingId, Box<SubresourceLoaderFactories>),
}

/// Messages from a renderer process to the frame host.
#[derive(Debug, Deserialize, Serialize)]
pub enum RendererToFrameHostMsg {
    DidCommitProvisionalLoad(RoutingId, Box<DidCommitProvisionalLoadParams>),
    DidCommitPageActivation(RoutingId, Box<DidCommitProvisionalLoadParams>),
    DidCommitSameDocumentNavigation(RoutingId, Box<DidCommitProvisionalLoadParams>),
    UnloadAck(RoutingId),
    /// A document created an iframe. (parent, child routing id, child token)
    CreateChildFrame(RoutingId, RoutingId, FrameToken),
    /// The frame removed itself from its parent document.
    DetachChildFrame(RoutingId),
    UpdateUnloadHandlerState(RoutingId, bool),
    UpdateBeforeUnloadHandlerState(RoutingId, bool),
    BeforeUnloadCompleted(RoutingId, BeforeUnloadReply),
    /// A DOM-level event that needs the browser's involvement. (frame, event id, event)
    DispatchDomEvent(RoutingId, u64, DomEventKind),
    /// The document asked to navigate. (frame, url, has user gesture)
    BeginNavigation(RoutingId, Url, bool),
    RequestSubresourceFactories(RoutingId),
}

impl RendererToFrameHostMsg {
    /// The frame this message is about.
    pub fn routing_id(&self) -> RoutingId {
        match *self {
            RendererToFrameHostMsg::DidCommitProvisionalLoad(routing_id, _) |
            RendererToFrameHostMsg::DidCommitPageActivation(routing_id, _) |
            RendererToFrameHostMsg::DidCommitSameDocumentNavigation(routing_id, _) |
            RendererToFrameHostMsg::UnloadAck(routing_id) |
            RendererToFrameHostMsg::CreateChildFrame(routing_id, ..) |
            RendererToFrameHostMsg::DetachChildFrame(routing_id) |
            RendererToFrameHostMsg::UpdateUnloadHandlerState(routing_id, _) |
            RendererToFrameHostMsg::UpdateBeforeUnloadHandlerState(routing_id, _) |
            RendererToFrameHostMsg::BeforeUnloadCompleted(routing_id, _) |
            RendererToFrameHostMsg::DispatchDomEvent(routing_id, ..) |
            RendererToFrameHostMsg::BeginNavigation(routing_id, ..) |
            RendererToFrameHostMsg::RequestSubresourceFactories(routing_id) => routing_id,
        }
    }
}
