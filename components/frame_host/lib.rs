/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! The browser-side host of document frames.
//!
//! Every document shown in a frame is hosted by a renderer process, and the
//! browser keeps a [`Frame`] for it. This crate tracks the lifecycle of those
//! frames, commits navigations into them, checks what renderers claim to have
//! committed, and removes frames from their tree once renderers have unloaded
//! them.

mod bad_message;
mod before_unload;
mod commit_validator;
mod delegate;
mod errors;
mod frame;
mod frame_host_manager;
mod frame_tree;
mod lifecycle;
mod navigation_metrics;
mod navigation_request;
mod pending_requests;
mod policy_snapshot;
mod prefs;
mod process;
mod registry;
mod subresource_factories;
mod timer_scheduler;
mod unload;
mod url_admissibility;

pub use crate::bad_message::{BadMessageReason, CommitRejection, DiagnosticContext};
pub use crate::commit_validator::{
    CommitValidationContext, CommitValidator, CommitVerdict, DiagnosticMismatch,
    ExpectedCommitParams,
};
pub use crate::delegate::{
    BackForwardCache, CommitDetails, DisallowActivationReason, EvictionReason, FrameHostDelegate,
    UnloadOutcome,
};
pub use crate::errors::FrameHostError;
pub use crate::frame::Frame;
pub use crate::frame_host_manager::{
    FrameHostManager, FrameHostManagerBuilder, FrameHostMsg, NavigatorToFrameHostMsg,
};
pub use crate::frame_tree::{FrameId, FrameTree, FrameTreeError};
pub use crate::lifecycle::{IllegalLifecycleTransition, Lifecycle, LifecycleStateImpl};
pub use crate::navigation_metrics::{NavigationMetrics, NavigationTiming};
pub use crate::navigation_request::{
    FrameEntry, NavigationRequest, NavigationState, NavigationStateError,
};
pub use crate::pending_requests::PendingRequestRegistry;
pub use crate::policy_snapshot::PolicySnapshot;
pub use crate::prefs::{Preferences, PrefsError};
pub use crate::process::{
    ProcessLock, ProcessSecurityPolicy, ProcessState, RendererProcess, SiteKey,
};
pub use crate::registry::FrameRegistry;
pub use crate::subresource_factories::SubresourceFactoryBuilder;
pub use crate::timer_scheduler::{TimerEvent, TimerId, TimerScheduler};
pub use crate::unload::{UnloadCoordinator, UnloadGroup, UnloadTicket};
pub use crate::url_admissibility::{
    can_commit_origin_and_url, is_debug_scheme, is_privileged_ui_url, is_renderer_debug_url,
    CommitCheckContext, PRIVILEGED_UI_SCHEME,
};
