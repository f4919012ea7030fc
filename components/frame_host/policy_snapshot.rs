/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The security-relevant state of a document, captured in one value so that
//! everything derived from it (subresource loaders in particular) agrees on it.

use frame_host_traits::{
    ClientSecurityState, ImmutableOrigin, IsolationInfo, TrustTokenRedemption,
};

use crate::frame::Frame;
use crate::navigation_request::NavigationRequest;

/// The origin, network isolation key, client security state and trust token
/// permission of one document, either committed or about to be.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicySnapshot {
    origin: ImmutableOrigin,
    isolation_info: IsolationInfo,
    client_security_state: ClientSecurityState,
    trust_token_redemption: TrustTokenRedemption,
    is_error_page: bool,
}

impl PolicySnapshot {
    /// The snapshot of the document `frame` last committed.
    pub fn for_last_committed(frame: &Frame) -> PolicySnapshot {
        PolicySnapshot::new(
            frame.last_committed_origin.clone(),
            frame.isolation_info.clone(),
            frame.client_security_state.clone(),
            frame.trust_token_redemption,
            frame.is_error_document,
        )
    }

    /// The snapshot the document of `request` will have once it commits.
    pub fn for_pending_navigation(request: &NavigationRequest) -> PolicySnapshot {
        PolicySnapshot::new(
            request.origin_to_commit.clone(),
            request.isolation_info.clone(),
            request.client_security_state.clone(),
            request.trust_token_redemption,
            request.is_error_page,
        )
    }

    fn new(
        origin: ImmutableOrigin,
        isolation_info: IsolationInfo,
        client_security_state: ClientSecurityState,
        trust_token_redemption: TrustTokenRedemption,
        is_error_page: bool,
    ) -> PolicySnapshot {
        // Error pages share no network state with anything, and cannot redeem
        // trust tokens.
        if is_error_page {
            let isolation_info = if isolation_info.is_transient() {
                isolation_info
            } else {
                IsolationInfo::create_transient()
            };
            return PolicySnapshot {
                origin,
                isolation_info,
                client_security_state,
                trust_token_redemption: TrustTokenRedemption::Forbidden,
                is_error_page,
            };
        }
        PolicySnapshot {
            origin,
            isolation_info,
            client_security_state,
            trust_token_redemption,
            is_error_page,
        }
    }

    pub fn origin(&self) -> &ImmutableOrigin {
        &self.origin
    }

    pub fn isolation_info(&self) -> &IsolationInfo {
        &self.isolation_info
    }

    pub fn client_security_state(&self) -> &ClientSecurityState {
        &self.client_security_state
    }

    pub fn trust_token_redemption(&self) -> TrustTokenRedemption {
        self.trust_token_redemption
    }

    pub fn is_error_page(&self) -> bool {
        self.is_error_page
    }
}
