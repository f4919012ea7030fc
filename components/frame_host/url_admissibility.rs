/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Whether a renderer process may commit a given URL and origin.

use frame_host_traits::ImmutableOrigin;
use url::Url;

use crate::bad_message::{BadMessageReason, CommitRejection, DiagnosticContext};
use crate::process::RendererProcess;

/// The scheme of privileged browser UI pages.
pub const PRIVILEGED_UI_SCHEME: &str = "servo";

/// `about:` URLs that make the renderer misbehave on purpose.
const DEBUG_ABOUT_PATHS: [&str; 3] = ["crash", "kill", "hang"];

/// Whether `url` is handled by the renderer as a debugging command rather than
/// loaded as a document. Such URLs can never be committed.
pub fn is_renderer_debug_url(url: &Url) -> bool {
    match url.scheme() {
        "javascript" | "view-source" => true,
        "about" => DEBUG_ABOUT_PATHS.contains(&url.path()),
        _ => false,
    }
}

/// Whether `scheme` is only ever used by debug URLs, and so can never be the
/// scheme of a committed origin.
pub fn is_debug_scheme(scheme: &str) -> bool {
    matches!(scheme, "javascript" | "view-source")
}

pub fn is_privileged_ui_url(url: &Url) -> bool {
    url.scheme() == PRIVILEGED_UI_SCHEME
}

fn is_about_blank_or_srcdoc(url: &Url) -> bool {
    url.scheme() == "about" && (url.path() == "blank" || url.path() == "srcdoc")
}

/// The facts about a commit that the URL and origin rules depend on.
#[derive(Clone, Copy, Debug)]
pub struct CommitCheckContext<'a> {
    pub process: &'a RendererProcess,
    pub is_load_data_with_base_url: bool,
    /// An archive document's subframe, hosted in its main frame's process.
    pub is_archive_subframe_in_main_frame_process: bool,
    pub disable_web_security: bool,
}

/// Decide whether the process of `context` may commit `url` with `origin`.
pub fn can_commit_origin_and_url(
    context: &CommitCheckContext,
    origin: &ImmutableOrigin,
    url: &Url,
) -> Result<(), CommitRejection> {
    let diagnostics = || {
        DiagnosticContext::new()
            .with("process", context.process.id())
            .with("url", url)
            .with("origin", origin)
    };

    if is_renderer_debug_url(url) {
        return Err(CommitRejection::new(
            BadMessageReason::RendererDebugUrl,
            diagnostics(),
        ));
    }
    if context.disable_web_security {
        return Ok(());
    }
    let policy = context.process.security_policy();
    if context.is_load_data_with_base_url && policy.can_load_data_with_base_url {
        return Ok(());
    }
    if context.is_archive_subframe_in_main_frame_process {
        return Ok(());
    }

    // Error pages of any URL commit in the error page process, with an
    // opaque origin.
    let lock = context.process.lock();
    if !lock.is_error_page() {
        if is_privileged_ui_url(url) && !policy.has_privileged_ui_bindings {
            return Err(CommitRejection::new(
                BadMessageReason::PrivilegedUrlInUnprivilegedProcess,
                diagnostics(),
            ));
        }
        if policy.has_privileged_ui_bindings &&
            !is_privileged_ui_url(url) &&
            !is_about_blank_or_srcdoc(url)
        {
            return Err(CommitRejection::new(
                BadMessageReason::UnprivilegedUrlInPrivilegedProcess,
                diagnostics(),
            ));
        }
    }

    if !lock.allows_url(url) {
        return Err(CommitRejection::new(
            BadMessageReason::CannotCommitUrl,
            diagnostics().with("lock", format_args!("{lock:?}")),
        ));
    }
    if !lock.allows_origin(origin) {
        return Err(CommitRejection::new(
            BadMessageReason::CannotCommitOrigin,
            diagnostics().with("lock", format_args!("{lock:?}")),
        ));
    }
    if !origin.can_be_derived_from(url) {
        return Err(CommitRejection::new(
            BadMessageReason::CannotCommitOrigin,
            diagnostics().with("cause", "origin cannot be derived from url"),
        ));
    }
    Ok(())
}
