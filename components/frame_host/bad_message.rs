/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Reasons for terminating a misbehaving renderer process.

use std::fmt;

/// Why a renderer process is terminated. Each reason has a stable numeric code
/// for crash reporting, so variants must only ever be appended.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BadMessageReason {
    /// A committed origin claimed a debug-only scheme.
    DebugSchemeOrigin,
    /// An error page or a restricted document claimed a non-opaque origin.
    RestrictedDocumentNonOpaqueOrigin,
    /// A same-document commit claimed an origin other than the current one.
    CrossOriginSameDocumentCommit,
    /// The process is not allowed to commit the URL.
    CannotCommitUrl,
    /// The process is not allowed to commit the origin, or the origin cannot be
    /// derived from the URL.
    CannotCommitOrigin,
    /// A renderer debug URL can never be committed.
    RendererDebugUrl,
    PrivilegedUrlInUnprivilegedProcess,
    UnprivilegedUrlInPrivilegedProcess,
    /// The history state references files the process was never granted.
    CanAccessFilesOfPageState,
    MissingEmbeddingToken,
    ReusedEmbeddingToken,
    UnexpectedEmbeddingToken,
    DocumentPolicyMismatch,
    SameDocumentCommitInNonCurrentFrame,
    SubframeHistoryMainFrameMismatch,
    SubframeHistoryMainFrameNotCommittable,
    /// A commit that matches no navigation the browser knows about.
    CommitWithUnknownNavigation,
    /// A commit for a navigation that was never sent to the renderer.
    CommitBeforeReadyToCommit,
    CommitInSpeculativeFrame,
    /// A same-document or activation commit for a frame awaiting its first commit.
    UnexpectedCommitInPendingCommitFrame,
    /// The kind of commit message does not match whether the navigation was a
    /// page activation.
    PageActivationCommitMismatch,
    /// A speculative or pending-commit frame sent an event that needs a document.
    InactiveFrameEventInSpeculativeState,
    DuplicateFrameToken,
    DetachMainFrame,
}

impl BadMessageReason {
    pub fn code(self) -> u32 {
        match self {
            BadMessageReason::DebugSchemeOrigin => 1,
            BadMessageReason::RestrictedDocumentNonOpaqueOrigin => 2,
            BadMessageReason::CrossOriginSameDocumentCommit => 3,
            BadMessageReason::CannotCommitUrl => 4,
            BadMessageReason::CannotCommitOrigin => 5,
            BadMessageReason::RendererDebugUrl => 6,
            BadMessageReason::PrivilegedUrlInUnprivilegedProcess => 7,
            BadMessageReason::UnprivilegedUrlInPrivilegedProcess => 8,
            BadMessageReason::CanAccessFilesOfPageState => 9,
            BadMessageReason::MissingEmbeddingToken => 10,
            BadMessageReason::ReusedEmbeddingToken => 11,
            BadMessageReason::UnexpectedEmbeddingToken => 12,
            BadMessageReason::DocumentPolicyMismatch => 13,
            BadMessageReason::SameDocumentCommitInNonCurrentFrame => 14,
            BadMessageReason::SubframeHistoryMainFrameMismatch => 15,
            BadMessageReason::SubframeHistoryMainFrameNotCommittable => 16,
            BadMessageReason::CommitWithUnknownNavigation => 17,
            BadMessageReason::CommitBeforeReadyToCommit => 18,
            BadMessageReason::CommitInSpeculativeFrame => 19,
            BadMessageReason::UnexpectedCommitInPendingCommitFrame => 20,
            BadMessageReason::PageActivationCommitMismatch => 21,
            BadMessageReason::InactiveFrameEventInSpeculativeState => 22,
            BadMessageReason::DuplicateFrameToken => 23,
            BadMessageReason::DetachMainFrame => 24,
        }
    }
}

impl fmt::Display for BadMessageReason {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{:?} ({})", self, self.code())
    }
}

/// Key/value pairs describing the circumstances of a rejected message, attached
/// to crash reports.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiagnosticContext {
    entries: Vec<(&'static str, String)>,
}

impl DiagnosticContext {
    pub fn new() -> DiagnosticContext {
        DiagnosticContext::default()
    }

    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> DiagnosticContext {
        self.entries.push((key, value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> &[(&'static str, String)] {
        &self.entries
    }
}

impl fmt::Display for DiagnosticContext {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for (index, (key, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                fmt.write_str(", ")?;
            }
            write!(fmt, "{key}={value}")?;
        }
        Ok(())
    }
}

/// A renderer message that failed validation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{reason}: {context}")]
pub struct CommitRejection {
    pub reason: BadMessageReason,
    pub context: DiagnosticContext,
}

impl CommitRejection {
    pub fn new(reason: BadMessageReason, context: DiagnosticContext) -> CommitRejection {
        CommitRejection { reason, context }
    }
}
