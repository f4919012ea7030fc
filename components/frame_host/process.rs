/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The frame host's view of a renderer process: a channel to it, and what the
//! process is allowed to do.

use std::path::{Component, Path, PathBuf};

use crossbeam_channel::Sender;
use frame_host_traits::{FrameHostToRendererMsg, ImmutableOrigin, RendererProcessId, SchemeHostPort};
use log::warn;
use rustc_hash::FxHashSet;
use url::{Host, Url};

use crate::bad_message::BadMessageReason;
use crate::errors::FrameHostError;

/// A site: the scheme and host of an origin, ignoring the port.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SiteKey {
    pub scheme: String,
    pub host: Host,
}

impl SiteKey {
    pub fn from_url(url: &Url) -> Option<SiteKey> {
        SchemeHostPort::from_url(url).map(|tuple| SiteKey::from_tuple(&tuple))
    }

    pub fn from_tuple(tuple: &SchemeHostPort) -> SiteKey {
        SiteKey {
            scheme: tuple.scheme.clone(),
            host: tuple.host.clone(),
        }
    }

    pub fn matches(&self, tuple: &SchemeHostPort) -> bool {
        self.scheme == tuple.scheme && self.host == tuple.host
    }
}

/// Which documents a process may host.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ProcessLock {
    /// The process may host documents of any site.
    #[default]
    Unlocked,
    /// The process may only host documents of one site, and opaque documents
    /// derived from it.
    LockedToSite(SiteKey),
    /// The process only hosts error pages.
    ErrorPage,
}

impl ProcessLock {
    /// The lock for a process hosting documents from `url`.
    pub fn for_url(url: &Url) -> ProcessLock {
        SiteKey::from_url(url)
            .map(ProcessLock::LockedToSite)
            .unwrap_or_default()
    }

    /// Whether a document at `url` may be shown in the process.
    pub fn allows_url(&self, url: &Url) -> bool {
        match self {
            ProcessLock::Unlocked | ProcessLock::ErrorPage => true,
            ProcessLock::LockedToSite(site) => match SchemeHostPort::from_url(url) {
                Some(tuple) => site.matches(&tuple),
                // URLs without a tuple (about:blank, data:) inherit or get opaque
                // origins; the origin check decides.
                None => true,
            },
        }
    }

    /// Whether a document with `origin` may be hosted in the process.
    pub fn allows_origin(&self, origin: &ImmutableOrigin) -> bool {
        match self {
            ProcessLock::Unlocked => true,
            ProcessLock::ErrorPage => origin.is_opaque(),
            ProcessLock::LockedToSite(site) => origin
                .tuple_or_precursor()
                .is_none_or(|tuple| site.matches(tuple)),
        }
    }

    pub fn is_error_page(&self) -> bool {
        *self == ProcessLock::ErrorPage
    }
}

/// Capabilities granted to a process beyond what its lock implies.
#[derive(Clone, Debug, Default)]
pub struct ProcessSecurityPolicy {
    granted_files: FxHashSet<PathBuf>,
    granted_directories: Vec<PathBuf>,
    pub can_load_data_with_base_url: bool,
    /// The process hosts privileged browser UI pages.
    pub has_privileged_ui_bindings: bool,
}

impl ProcessSecurityPolicy {
    pub fn grant_file(&mut self, path: impl Into<PathBuf>) {
        self.granted_files.insert(path.into());
    }

    pub fn grant_directory(&mut self, path: impl Into<PathBuf>) {
        self.granted_directories.push(path.into());
    }

    /// Paths are compared lexically, so relative paths and paths with `..`
    /// components are never readable.
    pub fn can_read_file(&self, path: &Path) -> bool {
        if !path.is_absolute() ||
            path.components()
                .any(|component| matches!(component, Component::ParentDir))
        {
            return false;
        }
        self.granted_files.contains(path) ||
            self.granted_directories
                .iter()
                .any(|directory| path.starts_with(directory))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessState {
    Alive,
    /// The frame host killed the process for sending a bad message.
    Terminated(BadMessageReason),
    /// The process exited or crashed.
    Gone,
}

/// A renderer process, as seen from the frame host.
#[derive(Debug)]
pub struct RendererProcess {
    id: RendererProcessId,
    sender: Sender<FrameHostToRendererMsg>,
    lock: ProcessLock,
    security_policy: ProcessSecurityPolicy,
    state: ProcessState,
}

impl RendererProcess {
    pub fn new(
        id: RendererProcessId,
        sender: Sender<FrameHostToRendererMsg>,
        lock: ProcessLock,
    ) -> RendererProcess {
        RendererProcess {
            id,
            sender,
            lock,
            security_policy: ProcessSecurityPolicy::default(),
            state: ProcessState::Alive,
        }
    }

    pub fn with_security_policy(
        mut self,
        security_policy: ProcessSecurityPolicy,
    ) -> RendererProcess {
        self.security_policy = security_policy;
        self
    }

    pub fn id(&self) -> RendererProcessId {
        self.id
    }

    pub fn lock(&self) -> &ProcessLock {
        &self.lock
    }

    pub fn security_policy(&self) -> &ProcessSecurityPolicy {
        &self.security_policy
    }

    pub fn security_policy_mut(&mut self) -> &mut ProcessSecurityPolicy {
        &mut self.security_policy
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == ProcessState::Alive
    }

    /// Send a message to the renderer.
    pub fn send(&self, msg: FrameHostToRendererMsg) -> Result<(), FrameHostError> {
        if !self.is_alive() {
            return Err(FrameHostError::ProcessNotAlive(self.id));
        }
        self.sender.send(msg).map_err(|_| {
            warn!("Renderer process {} disconnected", self.id);
            FrameHostError::RendererDisconnected(self.id)
        })
    }

    pub(crate) fn mark_terminated(&mut self, reason: BadMessageReason) {
        if self.is_alive() {
            self.state = ProcessState::Terminated(reason);
        }
    }

    pub(crate) fn mark_gone(&mut self) {
        if self.is_alive() {
            self.state = ProcessState::Gone;
        }
    }
}
