/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use frame_host_traits::{
    FrameToken, ImmutableOrigin, LifecycleState, NavigationRequestId, PageActivationKind,
    RendererProcessId,
};
use url::Url;

use crate::bad_message::{BadMessageReason, DiagnosticContext};
use crate::commit_validator::DiagnosticMismatch;
use crate::navigation_metrics::NavigationMetrics;

/// How the removal of a group of frames finished.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnloadOutcome {
    /// The renderer acknowledged the unload.
    Acknowledged,
    /// The renderer did not acknowledge the unload in time.
    TimedOut,
    /// No frame of the group had an unload handler, so no unload was sent.
    NotRequired,
    /// The renderer process went away before acknowledging.
    ProcessGone,
}

/// Why a page that is not shown could not handle a renderer event, and had to
/// be evicted from the back/forward cache or have its prerendering cancelled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DisallowActivationReason {
    DomEvent,
    ModalDialog,
    Navigation,
    ChildFrameCreation,
    ChildFrameDetach,
    SubresourceFactoryRequest,
    CommitWhileInactive,
    RendererProcessGone,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EvictionReason {
    DisallowActivation(DisallowActivationReason),
    RendererProcessGone,
}

/// A navigation that was committed.
#[derive(Clone, Debug)]
pub struct CommitDetails {
    pub frame: FrameToken,
    pub navigation_request_id: Option<NavigationRequestId>,
    pub url: Url,
    pub origin: ImmutableOrigin,
    pub is_main_frame: bool,
    pub is_same_document: bool,
    pub page_activation: Option<PageActivationKind>,
    pub did_create_new_entry: bool,
}

/// Receives notifications from the frame host, and carries out the decisions it
/// leaves to its embedder. Every method has a default implementation that does
/// nothing.
pub trait FrameHostDelegate {
    /// The coarse lifecycle state of a frame changed.
    fn notify_lifecycle_changed(
        &self,
        _frame: FrameToken,
        _old: LifecycleState,
        _new: LifecycleState,
    ) {
    }

    fn notify_navigation_committed(&self, _details: &CommitDetails) {}

    /// A frame was removed from its frame tree and destroyed.
    fn notify_frame_deleted(&self, _frame: FrameToken) {}

    /// The unload of the frames below `local_root` finished.
    fn notify_unload_completed(&self, _local_root: FrameToken, _outcome: UnloadOutcome) {}

    /// A renderer process was terminated for sending a bad message.
    fn notify_renderer_terminated(
        &self,
        _process: RendererProcessId,
        _reason: BadMessageReason,
        _context: &DiagnosticContext,
    ) {
    }

    /// A renderer reported a commit parameter that differs from what the
    /// browser expected. This is telemetry; the commit was accepted.
    fn record_commit_mismatch(&self, _frame: FrameToken, _mismatch: &DiagnosticMismatch) {}

    /// A prerendered page tried to do something that requires being shown.
    fn cancel_prerendering(&self, _page: FrameToken, _reason: DisallowActivationReason) {}

    /// A document asked to navigate. Starting the navigation is up to the embedder.
    fn request_navigation(&self, _frame: FrameToken, _url: Url, _has_user_gesture: bool) {}

    /// A beforeunload handler of the document in `frame` kept a navigation from
    /// going on. The navigation was cancelled.
    fn notify_navigation_cancelled(&self, _frame: FrameToken, _navigation: NavigationRequestId) {}

    /// Timing of a navigation committed in a main frame.
    fn record_navigation_metrics(&self, _frame: FrameToken, _metrics: &NavigationMetrics) {}
}

pub(crate) struct DefaultFrameHostDelegate;

impl FrameHostDelegate for DefaultFrameHostDelegate {}

/// The storage side of the back/forward cache.
pub trait BackForwardCache {
    /// Whether the page whose main frame is `page` may be stored.
    fn can_store(&self, _page: FrameToken) -> bool {
        false
    }

    /// The frame host is about to destroy a stored page.
    fn evict(&self, _page: FrameToken, _reason: EvictionReason) {}
}

pub(crate) struct NoBackForwardCache;

impl BackForwardCache for NoBackForwardCache {}
