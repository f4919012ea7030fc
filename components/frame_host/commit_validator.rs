/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Validation of the commit reports that renderers send.
//!
//! A renderer may be compromised, so everything it reports about a commit is
//! checked against what the browser computed independently. Failing a gating
//! check terminates the renderer. The remaining parameters are only compared,
//! and any differences are reported as diagnostics.

use std::fmt;

use frame_host_traits::{
    DidCommitProvisionalLoadParams, ImmutableOrigin, NavigationType, PageTransition,
};
use http::Method;
use url::Url;

use crate::bad_message::{BadMessageReason, CommitRejection, DiagnosticContext};
use crate::frame::Frame;
use crate::navigation_request::{NavigationRequest, NavigationState};
use crate::prefs::Preferences;
use crate::process::RendererProcess;
use crate::url_admissibility::{CommitCheckContext, can_commit_origin_and_url, is_debug_scheme};

/// What the validator needs to know about the committing frame.
#[derive(Clone, Copy)]
pub struct CommitValidationContext<'a> {
    pub frame: &'a Frame,
    pub process: &'a RendererProcess,
    pub is_main_frame: bool,
    /// Whether the frame occupies its tree position, rather than being a
    /// speculative or replaced frame.
    pub is_current_frame: bool,
    /// The main frame of the page and its process, for subframes.
    pub main_frame: Option<(&'a Frame, &'a RendererProcess)>,
    pub prefs: &'a Preferences,
}

/// A commit parameter whose reported value differs from the browser's.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiagnosticMismatch {
    pub field: &'static str,
    pub expected: String,
    pub reported: String,
}

impl fmt::Display for DiagnosticMismatch {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}: expected {}, renderer reported {}",
            self.field, self.expected, self.reported
        )
    }
}

/// The result of a commit that passed every gating check.
#[derive(Debug, Default)]
pub struct CommitVerdict {
    pub mismatches: Vec<DiagnosticMismatch>,
}

/// The browser's own idea of the commit parameters. `None` means the value
/// cannot be computed without trusting the renderer.
#[derive(Debug, Default)]
pub struct ExpectedCommitParams {
    pub method: Option<Method>,
    pub post_id: Option<i64>,
    pub http_status_code: Option<u16>,
    pub should_replace_current_entry: Option<bool>,
    pub did_create_new_entry: Option<bool>,
    pub transition: Option<PageTransition>,
    pub history_list_was_cleared: Option<bool>,
    pub origin: Option<ImmutableOrigin>,
}

pub struct CommitValidator;

impl CommitValidator {
    /// Run every gating check on a commit report, then compare the non-gating
    /// parameters. `request` is `None` only for renderer-initiated same-document
    /// navigations that the browser did not know about in advance.
    pub fn validate(
        context: &CommitValidationContext,
        request: Option<&NavigationRequest>,
        params: &DidCommitProvisionalLoadParams,
        is_same_document: bool,
    ) -> Result<CommitVerdict, CommitRejection> {
        if let Some(request) = request {
            if request.state() != NavigationState::ReadyToCommit {
                return Err(CommitRejection::new(
                    BadMessageReason::CommitBeforeReadyToCommit,
                    base_context(context, params).with(
                        "state",
                        format_args!("{:?}", request.state()),
                    ),
                ));
            }
        }
        check_origin(context, request, params, is_same_document)?;
        check_url(context, request, params)?;
        check_page_state_files(context, params)?;
        check_embedding_token(context, request, params, is_same_document)?;
        check_document_policy(context, params)?;
        check_same_document_frame(context, params, is_same_document)?;
        check_subframe_history(context, request, params)?;

        let expected = CommitValidator::recompute(context, request, params, is_same_document);
        Ok(CommitVerdict {
            mismatches: compare(&expected, params),
        })
    }

    /// Compute the commit parameters the renderer should report.
    pub fn recompute(
        context: &CommitValidationContext,
        request: Option<&NavigationRequest>,
        params: &DidCommitProvisionalLoadParams,
        is_same_document: bool,
    ) -> ExpectedCommitParams {
        let frame = context.frame;
        let Some(request) = request else {
            // A same-document navigation the renderer started on its own keeps
            // the document's request details.
            let (method, post_id) = if params.is_history_api_navigation {
                (Method::GET, -1)
            } else {
                (frame.last_http_method.clone(), frame.last_post_id)
            };
            return ExpectedCommitParams {
                method: Some(method),
                post_id: Some(post_id),
                http_status_code: Some(frame.last_http_status_code),
                history_list_was_cleared: Some(false),
                origin: Some(frame.last_committed_origin.clone()),
                ..Default::default()
            };
        };

        let post_id = if request.method == Method::POST {
            request.post_id.unwrap_or(-1)
        } else {
            -1
        };
        let http_status_code = if request.is_page_activation() {
            200
        } else if is_same_document {
            frame.last_http_status_code
        } else {
            request.response_code.unwrap_or(0)
        };
        // Replacements only get a new entry when a main frame loads a new document.
        let did_create_new_entry = if request.navigation_type.is_history() {
            false
        } else if request.should_replace_current_entry {
            context.is_main_frame && !is_same_document
        } else {
            !matches!(
                request.navigation_type,
                NavigationType::Reload | NavigationType::Restore
            )
        };
        // Error pages and page activations keep origins the browser does not pick.
        let origin = if is_same_document {
            Some(frame.last_committed_origin.clone())
        } else if request.is_error_page() || request.is_page_activation() {
            None
        } else {
            Some(request.origin_to_commit.clone())
        };

        // The initial empty document, and navigations that stay on it, are
        // never the result of a request with a body.
        let stays_on_initial_empty_document = frame.is_on_initial_empty_document &&
            (is_same_document || is_about_blank(&request.url));
        let method = if stays_on_initial_empty_document {
            Method::GET
        } else {
            request.method.clone()
        };

        ExpectedCommitParams {
            method: Some(method),
            post_id: Some(post_id),
            http_status_code: Some(http_status_code),
            should_replace_current_entry: Some(request.should_replace_current_entry),
            did_create_new_entry: Some(did_create_new_entry),
            transition: Some(request.transition),
            history_list_was_cleared: Some(request.should_clear_history_list),
            origin,
        }
    }
}

fn is_about_blank(url: &Url) -> bool {
    url.scheme() == "about" && url.path() == "blank"
}

fn base_context(
    context: &CommitValidationContext,
    params: &DidCommitProvisionalLoadParams,
) -> DiagnosticContext {
    DiagnosticContext::new()
        .with("frame", context.frame.token())
        .with("process", context.process.id())
        .with("lifecycle_state", context.frame.lifecycle_state())
        .with("url", &params.url)
        .with("origin", &params.origin)
        .with("last_committed_origin", &context.frame.last_committed_origin)
}

fn check_origin(
    context: &CommitValidationContext,
    request: Option<&NavigationRequest>,
    params: &DidCommitProvisionalLoadParams,
    is_same_document: bool,
) -> Result<(), CommitRejection> {
    let origin = &params.origin;
    if origin
        .tuple_or_precursor()
        .is_some_and(|tuple| is_debug_scheme(&tuple.scheme))
    {
        return Err(CommitRejection::new(
            BadMessageReason::DebugSchemeOrigin,
            base_context(context, params),
        ));
    }

    let is_restricted_document = request.is_some_and(NavigationRequest::is_error_page) ||
        context.process.lock().is_error_page();
    if is_restricted_document && !origin.is_opaque() {
        return Err(CommitRejection::new(
            BadMessageReason::RestrictedDocumentNonOpaqueOrigin,
            base_context(context, params),
        ));
    }

    if is_same_document && *origin != context.frame.last_committed_origin {
        return Err(CommitRejection::new(
            BadMessageReason::CrossOriginSameDocumentCommit,
            base_context(context, params),
        ));
    }
    Ok(())
}

fn check_url(
    context: &CommitValidationContext,
    request: Option<&NavigationRequest>,
    params: &DidCommitProvisionalLoadParams,
) -> Result<(), CommitRejection> {
    let is_archive_subframe_in_main_frame_process = !context.is_main_frame &&
        context.main_frame.is_some_and(|(main_frame, main_frame_process)| {
            main_frame.is_archive_document && main_frame_process.id() == context.process.id()
        });
    let check_context = CommitCheckContext {
        process: context.process,
        is_load_data_with_base_url: request
            .is_some_and(|request| request.is_load_data_with_base_url),
        is_archive_subframe_in_main_frame_process,
        disable_web_security: context.prefs.disable_web_security,
    };
    can_commit_origin_and_url(&check_context, &params.origin, &params.url).map_err(|rejection| {
        CommitRejection::new(
            rejection.reason,
            base_context(context, params).with(
                "process_lock",
                format_args!("{:?}", context.process.lock()),
            ),
        )
    })
}

fn check_page_state_files(
    context: &CommitValidationContext,
    params: &DidCommitProvisionalLoadParams,
) -> Result<(), CommitRejection> {
    let policy = context.process.security_policy();
    match params
        .page_state
        .referenced_files
        .iter()
        .find(|path| !policy.can_read_file(path))
    {
        Some(path) => Err(CommitRejection::new(
            BadMessageReason::CanAccessFilesOfPageState,
            base_context(context, params).with("file", path.display()),
        )),
        None => Ok(()),
    }
}

fn check_embedding_token(
    context: &CommitValidationContext,
    request: Option<&NavigationRequest>,
    params: &DidCommitProvisionalLoadParams,
    is_same_document: bool,
) -> Result<(), CommitRejection> {
    let expects_new_document =
        !is_same_document && !request.is_some_and(NavigationRequest::is_page_activation);
    let reason = match (expects_new_document, params.embedding_token) {
        (true, None) => BadMessageReason::MissingEmbeddingToken,
        (true, Some(token)) if Some(token) == context.frame.embedding_token => {
            BadMessageReason::ReusedEmbeddingToken
        },
        (false, Some(_)) => BadMessageReason::UnexpectedEmbeddingToken,
        _ => return Ok(()),
    };
    Err(CommitRejection::new(reason, base_context(context, params)))
}

fn check_document_policy(
    context: &CommitValidationContext,
    params: &DidCommitProvisionalLoadParams,
) -> Result<(), CommitRejection> {
    match params
        .document_policy
        .first_incompatible_feature(&context.frame.required_document_policy)
    {
        Some(feature) => Err(CommitRejection::new(
            BadMessageReason::DocumentPolicyMismatch,
            base_context(context, params).with("feature", feature),
        )),
        None => Ok(()),
    }
}

fn check_same_document_frame(
    context: &CommitValidationContext,
    params: &DidCommitProvisionalLoadParams,
    is_same_document: bool,
) -> Result<(), CommitRejection> {
    if is_same_document && !context.is_current_frame {
        return Err(CommitRejection::new(
            BadMessageReason::SameDocumentCommitInNonCurrentFrame,
            base_context(context, params),
        ));
    }
    Ok(())
}

/// A history navigation of a subframe restores the subframe's part of a session
/// history entry. The entry must belong to the document currently shown in the
/// main frame.
fn check_subframe_history(
    context: &CommitValidationContext,
    request: Option<&NavigationRequest>,
    params: &DidCommitProvisionalLoadParams,
) -> Result<(), CommitRejection> {
    if context.is_main_frame {
        return Ok(());
    }
    let Some(request) = request else {
        return Ok(());
    };
    if !request.navigation_type.is_history() {
        return Ok(());
    }
    let (Some(entry), Some((main_frame, main_frame_process))) =
        (request.frame_entry(), context.main_frame)
    else {
        return Ok(());
    };

    if let Some(recorded) = entry.main_frame_document_sequence_number {
        if main_frame.document_sequence_number != Some(recorded) {
            return Err(CommitRejection::new(
                BadMessageReason::SubframeHistoryMainFrameMismatch,
                base_context(context, params)
                    .with("recorded_main_frame_dsn", recorded.0)
                    .with(
                        "main_frame_dsn",
                        format_args!("{:?}", main_frame.document_sequence_number),
                    ),
            ));
        }
    }

    if let (Some(url), Some(origin)) = (&entry.main_frame_url, &entry.main_frame_origin) {
        let check_context = CommitCheckContext {
            process: main_frame_process,
            is_load_data_with_base_url: false,
            is_archive_subframe_in_main_frame_process: false,
            disable_web_security: context.prefs.disable_web_security,
        };
        if let Err(rejection) = can_commit_origin_and_url(&check_context, origin, url) {
            return Err(CommitRejection::new(
                BadMessageReason::SubframeHistoryMainFrameNotCommittable,
                base_context(context, params)
                    .with("main_frame_url", url)
                    .with("main_frame_origin", origin)
                    .with("cause", rejection.reason),
            ));
        }
    }
    Ok(())
}

fn compare(
    expected: &ExpectedCommitParams,
    params: &DidCommitProvisionalLoadParams,
) -> Vec<DiagnosticMismatch> {
    let mut mismatches = vec![];
    let mut check = |field: &'static str, expected: Option<String>, reported: String| {
        if let Some(expected) = expected {
            if expected != reported {
                mismatches.push(DiagnosticMismatch {
                    field,
                    expected,
                    reported,
                });
            }
        }
    };
    check(
        "method",
        expected.method.as_ref().map(ToString::to_string),
        params.method.to_string(),
    );
    check(
        "post_id",
        expected.post_id.map(|id| id.to_string()),
        params.post_id.to_string(),
    );
    check(
        "http_status_code",
        expected.http_status_code.map(|code| code.to_string()),
        params.http_status_code.to_string(),
    );
    check(
        "should_replace_current_entry",
        expected.should_replace_current_entry.map(|value| value.to_string()),
        params.should_replace_current_entry.to_string(),
    );
    check(
        "did_create_new_entry",
        expected.did_create_new_entry.map(|value| value.to_string()),
        params.did_create_new_entry.to_string(),
    );
    check(
        "transition",
        expected.transition.map(|transition| format!("{transition:?}")),
        format!("{:?}", params.transition),
    );
    check(
        "history_list_was_cleared",
        expected.history_list_was_cleared.map(|value| value.to_string()),
        params.history_list_was_cleared.to_string(),
    );
    // Opaque origins all serialize alike, so compare them as values.
    if let Some(origin) = expected.origin.as_ref().filter(|origin| **origin != params.origin) {
        mismatches.push(DiagnosticMismatch {
            field: "origin",
            expected: format!("{origin:?}"),
            reported: format!("{:?}", params.origin),
        });
    }
    mismatches
}
