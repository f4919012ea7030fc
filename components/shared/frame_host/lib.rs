/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! Types shared between the browser-side frame host and renderer processes.
//!
//! Everything in this crate crosses the process boundary in one direction or
//! the other, so it is all plain data that can be serialized. Anything that
//! arrives from a renderer must be treated as a claim, never as a fact.

pub mod id;
pub mod lifecycle;
pub mod loader;
pub mod messages;
pub mod method_serde;
pub mod origin;
pub mod page_transition;
pub mod policy;

pub use crate::id::{
    DocumentSequenceNumber, EmbeddingToken, FrameToken, ItemSequenceNumber, NavigationRequestId,
    NavigationToken, RendererProcessId, RoutingId,
};
pub use crate::lifecycle::LifecycleState;
pub use crate::loader::{
    LoaderFactoryBinding, LoaderFactoryKind, LoaderFactoryParams, SubresourceLoaderFactories,
};
pub use crate::messages::{
    BeforeUnloadReply, CommitFailedNavigationParams, CommitNavigationParams,
    DidCommitProvisionalLoadParams, DomEventKind, FrameHostToRendererMsg, PageActivationKind,
    PageState, RendererToFrameHostMsg, UnloadKind,
};
pub use crate::origin::{ImmutableOrigin, OpaqueOrigin, SchemeHostPort};
pub use crate::page_transition::{
    NavigationType, PageTransition, PageTransitionQualifiers, PageTransitionType,
};
pub use crate::policy::{
    ClientSecurityState, CrossOriginEmbedderPolicy, DocumentPolicy, DocumentPolicyValue,
    IpAddressSpace, IsolationInfo, IsolationRequestType, PrivateNetworkRequestPolicy,
    TrustTokenRedemption,
};
