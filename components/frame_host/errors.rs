/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use frame_host_traits::{NavigationRequestId, RendererProcessId};

use crate::frame_tree::{FrameId, FrameTreeError};
use crate::lifecycle::LifecycleStateImpl;
use crate::navigation_request::NavigationStateError;

/// Errors returned to the browser-side caller of the frame host. Renderer
/// misbehavior is never reported through this type; it terminates the renderer.
#[derive(Debug, thiserror::Error)]
pub enum FrameHostError {
    #[error("no frame {0:?}")]
    NoSuchFrame(FrameId),
    #[error("no renderer process {0}")]
    NoSuchProcess(RendererProcessId),
    #[error("renderer process {0} is not alive")]
    ProcessNotAlive(RendererProcessId),
    #[error("renderer process {0} disconnected")]
    RendererDisconnected(RendererProcessId),
    #[error("no navigation {0} is tracked by frame {1:?}")]
    NoSuchNavigation(NavigationRequestId, FrameId),
    #[error("frame {frame:?} cannot {operation} while {state}")]
    InvalidState {
        frame: FrameId,
        operation: &'static str,
        state: LifecycleStateImpl,
    },
    #[error("frame {0:?} is a main frame")]
    IsMainFrame(FrameId),
    #[error("frame {0:?} is not the root of a page")]
    NotPageRoot(FrameId),
    #[error("frame {0:?} is the primary main frame")]
    IsPrimaryMainFrame(FrameId),
    #[error("frame token or routing id is already registered: {0}")]
    DuplicateFrame(String),
    #[error(transparent)]
    FrameTree(#[from] FrameTreeError),
    #[error(transparent)]
    NavigationState(#[from] NavigationStateError),
}
