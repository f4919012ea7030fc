/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Identifiers used by the frame host. Tokens are random and unguessable, so that a
//! renderer cannot forge a reference to an object it was never told about. Plain
//! numeric ids are only meaningful together with the process that they belong to.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! random_token {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new, unguessable token.
            #[allow(clippy::new_without_default)]
            pub fn new() -> $name {
                $name(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                write!(fmt, "{}({})", stringify!($name), self.0.simple())
            }
        }
    };
}

random_token! {
    /// Identifies a frame for the whole life of its renderer-side object.
    FrameToken
}

random_token! {
    /// The 128-bit random token of a single navigation attempt.
    NavigationToken
}

random_token! {
    /// Correlates a committed document with the context embedding it. A new one
    /// is generated for every cross-document commit.
    EmbeddingToken
}

/// The id of a renderer process, as assigned by the process host.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RendererProcessId(pub u32);

impl fmt::Display for RendererProcessId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "process#{}", self.0)
    }
}

/// A per-process identifier of a frame. Only unique when combined with a
/// [`RendererProcessId`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RoutingId(pub u32);

impl fmt::Display for RoutingId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "routing#{}", self.0)
    }
}

static NEXT_NAVIGATION_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// The identity of a navigation request inside the browser process. These are
/// never sent to a renderer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct NavigationRequestId(u64);

impl NavigationRequestId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> NavigationRequestId {
        NavigationRequestId(NEXT_NAVIGATION_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NavigationRequestId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "navigation#{}", self.0)
    }
}

/// Identifies a document within a session history item. Same-document
/// navigations keep it; cross-document navigations get a new one.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct DocumentSequenceNumber(pub i64);

/// Identifies a session history item.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ItemSequenceNumber(pub i64);
