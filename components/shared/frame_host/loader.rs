/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::RendererProcessId;
use crate::origin::ImmutableOrigin;
use crate::policy::{ClientSecurityState, IsolationInfo, TrustTokenRedemption};

/// The kind of loader a factory binding hands out.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LoaderFactoryKind {
    Network,
    File,
    Blob,
    /// A factory that fails every request. Used where a document must not be
    /// able to load anything.
    Disconnected,
}

/// The browser-enforced parameters of one loader factory. A renderer cannot
/// change these; every request it makes through the factory is checked against them.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LoaderFactoryParams {
    pub process_id: RendererProcessId,
    /// Requests through this factory must claim this initiator.
    pub request_initiator_origin_lock: ImmutableOrigin,
    pub isolation_info: IsolationInfo,
    pub client_security_state: ClientSecurityState,
    pub trust_token_redemption: TrustTokenRedemption,
    pub disable_web_security: bool,
    /// Whether the factory may be used for requests the browser itself trusts.
    /// Never set for factories handed to a renderer.
    pub is_trusted: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LoaderFactoryBinding {
    pub kind: LoaderFactoryKind,
    pub params: LoaderFactoryParams,
}

/// The complete set of subresource loaders given to a newly committed document.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubresourceLoaderFactories {
    pub default_factory: LoaderFactoryBinding,
    /// Factories for schemes that the network factory does not handle.
    pub scheme_specific_factories: BTreeMap<String, LoaderFactoryBinding>,
    pub bypass_redirect_checks: bool,
}

impl SubresourceLoaderFactories {
    pub fn factory_for_scheme(&self, scheme: &str) -> &LoaderFactoryBinding {
        self.scheme_specific_factories
            .get(scheme)
            .unwrap_or(&self.default_factory)
    }
}
