/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// How the user (or page) caused a navigation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PageTransitionType {
    Link,
    Typed,
    AutoBookmark,
    /// A subframe navigation the user did not ask for, e.g. a new iframe loading.
    AutoSubframe,
    /// A subframe navigation the user explicitly asked for.
    ManualSubframe,
    Generated,
    AutoToplevel,
    FormSubmit,
    Reload,
    Keyword,
    KeywordGenerated,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
    pub struct PageTransitionQualifiers: u32 {
        const FORWARD_BACK = 1 << 0;
        const FROM_ADDRESS_BAR = 1 << 1;
        const HOME_PAGE = 1 << 2;
        const FROM_API = 1 << 3;
        const CHAIN_START = 1 << 4;
        const CHAIN_END = 1 << 5;
        const CLIENT_REDIRECT = 1 << 6;
        const SERVER_REDIRECT = 1 << 7;
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct PageTransition {
    pub core: PageTransitionType,
    pub qualifiers: PageTransitionQualifiers,
}

impl PageTransition {
    pub fn new(core: PageTransitionType) -> PageTransition {
        PageTransition {
            core,
            qualifiers: PageTransitionQualifiers::empty(),
        }
    }

    pub fn with_qualifiers(mut self, qualifiers: PageTransitionQualifiers) -> PageTransition {
        self.qualifiers |= qualifiers;
        self
    }

    pub fn is_main_frame(&self) -> bool {
        !matches!(
            self.core,
            PageTransitionType::AutoSubframe | PageTransitionType::ManualSubframe
        )
    }

    pub fn is_forward_back(&self) -> bool {
        self.qualifiers.contains(PageTransitionQualifiers::FORWARD_BACK)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum NavigationType {
    /// A regular navigation to a new document.
    DifferentDocument,
    /// A fragment or History API navigation within the current document.
    SameDocument,
    /// A traversal to a history entry holding a different document.
    HistoryDifferentDocument,
    /// A traversal to a history entry holding the current document.
    HistorySameDocument,
    Reload,
    /// Restoring a session, e.g. after a crash.
    Restore,
}

impl NavigationType {
    pub fn is_history(&self) -> bool {
        matches!(
            *self,
            NavigationType::HistoryDifferentDocument | NavigationType::HistorySameDocument
        )
    }

    pub fn is_same_document(&self) -> bool {
        matches!(
            *self,
            NavigationType::SameDocument | NavigationType::HistorySameDocument
        )
    }
}
