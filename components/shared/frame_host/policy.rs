/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Security policy values computed by the browser for a document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::origin::ImmutableOrigin;

/// <https://html.spec.whatwg.org/multipage/#coep>
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CrossOriginEmbedderPolicy {
    #[default]
    UnsafeNone,
    RequireCorp,
    Credentialless,
}

/// <https://wicg.github.io/private-network-access/#ip-address-space>
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum IpAddressSpace {
    Local,
    Private,
    Public,
    #[default]
    Unknown,
}

/// What to do with requests from a less private address space to a more private one.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PrivateNetworkRequestPolicy {
    #[default]
    Allow,
    BlockFromInsecureToMorePrivate,
    WarnFromInsecureToMorePrivate,
    PreflightBlock,
    PreflightWarn,
}

/// The security state of the client issuing subresource requests.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClientSecurityState {
    pub is_secure_context: bool,
    pub ip_address_space: IpAddressSpace,
    pub cross_origin_embedder_policy: CrossOriginEmbedderPolicy,
    pub private_network_request_policy: PrivateNetworkRequestPolicy,
}

/// Whether a document may redeem trust tokens.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TrustTokenRedemption {
    Allowed,
    #[default]
    Forbidden,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum IsolationRequestType {
    MainFrame,
    SubFrame,
    Other,
}

/// The key used to partition network state (caches, connections) for a document.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IsolationInfo {
    pub request_type: IsolationRequestType,
    pub top_frame_origin: Option<ImmutableOrigin>,
    pub frame_origin: Option<ImmutableOrigin>,
    /// Set for documents whose network state must not be shared with anybody else.
    pub nonce: Option<Uuid>,
}

impl IsolationInfo {
    pub fn new(
        request_type: IsolationRequestType,
        top_frame_origin: ImmutableOrigin,
        frame_origin: ImmutableOrigin,
    ) -> IsolationInfo {
        IsolationInfo {
            request_type,
            top_frame_origin: Some(top_frame_origin),
            frame_origin: Some(frame_origin),
            nonce: None,
        }
    }

    /// A fresh isolation key that shares nothing with any other document.
    pub fn create_transient() -> IsolationInfo {
        let opaque = ImmutableOrigin::new_opaque();
        IsolationInfo {
            request_type: IsolationRequestType::Other,
            top_frame_origin: Some(opaque.clone()),
            frame_origin: Some(opaque),
            nonce: Some(Uuid::new_v4()),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.nonce.is_some() &&
            self.top_frame_origin
                .as_ref()
                .is_some_and(ImmutableOrigin::is_opaque)
    }
}

/// The value of a single document policy feature.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum DocumentPolicyValue {
    /// A feature that is either enabled (`true`) or disabled.
    Bool(bool),
    /// A threshold where a lower value is stricter.
    Threshold(f64),
}

impl DocumentPolicyValue {
    /// Whether this value is at least as strict as `required`. Values of different
    /// kinds are never comparable.
    pub fn is_at_least_as_strict_as(&self, required: &DocumentPolicyValue) -> bool {
        match (*self, *required) {
            (DocumentPolicyValue::Bool(value), DocumentPolicyValue::Bool(required)) => {
                required || !value
            },
            (DocumentPolicyValue::Threshold(value), DocumentPolicyValue::Threshold(required)) => {
                value <= required
            },
            _ => false,
        }
    }
}

/// <https://wicg.github.io/document-policy/>
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DocumentPolicy {
    pub features: BTreeMap<String, DocumentPolicyValue>,
}

impl DocumentPolicy {
    pub fn with_feature(mut self, name: &str, value: DocumentPolicyValue) -> DocumentPolicy {
        self.features.insert(name.to_owned(), value);
        self
    }

    /// Whether a document declaring this policy satisfies `required`: every
    /// required feature must be declared at least as strictly.
    pub fn is_compatible_with(&self, required: &DocumentPolicy) -> bool {
        required.features.iter().all(|(name, required_value)| {
            self.features
                .get(name)
                .is_some_and(|value| value.is_at_least_as_strict_as(required_value))
        })
    }

    /// The first required feature that this policy does not satisfy.
    pub fn first_incompatible_feature<'a>(&self, required: &'a DocumentPolicy) -> Option<&'a str> {
        required
            .features
            .iter()
            .find(|(name, required_value)| {
                !self
                    .features
                    .get(*name)
                    .is_some_and(|value| value.is_at_least_as_strict_as(required_value))
            })
            .map(|(name, _)| name.as_str())
    }
}
