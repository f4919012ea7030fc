/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::BTreeMap;

use frame_host_traits::{
    LoaderFactoryBinding, LoaderFactoryKind, LoaderFactoryParams, SubresourceLoaderFactories,
};
use url::Url;

use crate::policy_snapshot::PolicySnapshot;
use crate::process::RendererProcess;

/// Derives the subresource loaders of a document from its policy snapshot, so
/// that every request the document makes is bound to the document's origin and
/// network isolation key.
pub struct SubresourceFactoryBuilder<'a> {
    snapshot: &'a PolicySnapshot,
    process: &'a RendererProcess,
    document_url: &'a Url,
    disable_web_security: bool,
}

impl<'a> SubresourceFactoryBuilder<'a> {
    pub fn new(
        snapshot: &'a PolicySnapshot,
        process: &'a RendererProcess,
        document_url: &'a Url,
    ) -> SubresourceFactoryBuilder<'a> {
        SubresourceFactoryBuilder {
            snapshot,
            process,
            document_url,
            disable_web_security: false,
        }
    }

    pub fn disable_web_security(
        mut self,
        disable_web_security: bool,
    ) -> SubresourceFactoryBuilder<'a> {
        self.disable_web_security = disable_web_security;
        self
    }

    fn params(&self) -> LoaderFactoryParams {
        LoaderFactoryParams {
            process_id: self.process.id(),
            request_initiator_origin_lock: self.snapshot.origin().clone(),
            isolation_info: self.snapshot.isolation_info().clone(),
            client_security_state: self.snapshot.client_security_state().clone(),
            trust_token_redemption: self.snapshot.trust_token_redemption(),
            disable_web_security: self.disable_web_security,
            is_trusted: false,
        }
    }

    pub fn build(&self) -> SubresourceLoaderFactories {
        let binding = |kind| LoaderFactoryBinding {
            kind,
            params: self.params(),
        };

        // Error pages cannot load anything.
        let default_kind = if self.snapshot.is_error_page() {
            LoaderFactoryKind::Disconnected
        } else {
            LoaderFactoryKind::Network
        };

        let mut scheme_specific_factories = BTreeMap::new();
        scheme_specific_factories.insert("blob".to_owned(), binding(LoaderFactoryKind::Blob));
        // Only documents loaded from files may load other files.
        if self.document_url.scheme() == "file" && !self.snapshot.is_error_page() {
            scheme_specific_factories.insert("file".to_owned(), binding(LoaderFactoryKind::File));
        }

        SubresourceLoaderFactories {
            default_factory: binding(default_kind),
            scheme_specific_factories,
            bypass_redirect_checks: false,
        }
    }
}
