/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use serde::{Deserialize, Serialize};
use url::{Host, Origin, Url};
use uuid::Uuid;

/// The (scheme, host, port) triple of a tuple origin.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SchemeHostPort {
    pub scheme: String,
    pub host: Host,
    pub port: u16,
}

impl SchemeHostPort {
    pub fn new(scheme: &str, host: Host, port: u16) -> SchemeHostPort {
        SchemeHostPort {
            scheme: scheme.to_owned(),
            host,
            port,
        }
    }

    /// Returns the tuple of `url`, if it has one.
    pub fn from_url(url: &Url) -> Option<SchemeHostPort> {
        match url.origin() {
            Origin::Tuple(scheme, host, port) => Some(SchemeHostPort { scheme, host, port }),
            Origin::Opaque(_) => None,
        }
    }
}

impl fmt::Display for SchemeHostPort {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let tuple = Origin::Tuple(self.scheme.clone(), self.host.clone(), self.port);
        fmt.write_str(&tuple.ascii_serialization())
    }
}

/// Opaque identifier for documents without a serializable origin, such as
/// sandboxed frames or `data:` documents. The precursor records which tuple
/// origin the opaque origin was derived from, if any, so that it can still be
/// checked against the site a process is locked to.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct OpaqueOrigin {
    nonce: Uuid,
    precursor: Option<SchemeHostPort>,
}

impl OpaqueOrigin {
    pub fn precursor(&self) -> Option<&SchemeHostPort> {
        self.precursor.as_ref()
    }
}

/// The origin of an URL
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ImmutableOrigin {
    /// A globally unique identifier
    Opaque(OpaqueOrigin),

    /// Consists of the URL's scheme, host and port
    Tuple(SchemeHostPort),
}

impl ImmutableOrigin {
    /// The origin a document loaded from `url` would get, absent sandboxing.
    pub fn from_url(url: &Url) -> ImmutableOrigin {
        match SchemeHostPort::from_url(url) {
            Some(tuple) => ImmutableOrigin::Tuple(tuple),
            None => ImmutableOrigin::new_opaque(),
        }
    }

    /// Creates a new opaque origin that is only equal to itself.
    pub fn new_opaque() -> ImmutableOrigin {
        ImmutableOrigin::Opaque(OpaqueOrigin {
            nonce: Uuid::new_v4(),
            precursor: None,
        })
    }

    /// Creates a new opaque origin whose precursor is this origin's tuple (or this
    /// origin's own precursor, if it is already opaque).
    pub fn derive_new_opaque(&self) -> ImmutableOrigin {
        ImmutableOrigin::Opaque(OpaqueOrigin {
            nonce: Uuid::new_v4(),
            precursor: self.tuple_or_precursor().cloned(),
        })
    }

    pub fn is_opaque(&self) -> bool {
        matches!(*self, ImmutableOrigin::Opaque(..))
    }

    /// Return whether this origin is a (scheme, host, port) tuple
    /// (as opposed to an opaque origin).
    pub fn is_tuple(&self) -> bool {
        matches!(*self, ImmutableOrigin::Tuple(..))
    }

    /// The tuple of a tuple origin, or the precursor tuple of an opaque one.
    pub fn tuple_or_precursor(&self) -> Option<&SchemeHostPort> {
        match *self {
            ImmutableOrigin::Tuple(ref tuple) => Some(tuple),
            ImmutableOrigin::Opaque(ref opaque) => opaque.precursor(),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        match *self {
            ImmutableOrigin::Opaque(_) => None,
            ImmutableOrigin::Tuple(ref tuple) => Some(&*tuple.scheme),
        }
    }

    pub fn host(&self) -> Option<&Host> {
        match *self {
            ImmutableOrigin::Opaque(_) => None,
            ImmutableOrigin::Tuple(ref tuple) => Some(&tuple.host),
        }
    }

    pub fn port(&self) -> Option<u16> {
        match *self {
            ImmutableOrigin::Opaque(_) => None,
            ImmutableOrigin::Tuple(ref tuple) => Some(tuple.port),
        }
    }

    pub fn same_origin(&self, other: &ImmutableOrigin) -> bool {
        self == other
    }

    /// Whether a document at `url` could legitimately have this origin.
    ///
    /// `about:blank` and `about:srcdoc` inherit their origin from another
    /// document, so they are compatible with any origin. Opaque origins are
    /// compatible with any URL that either has no tuple or whose tuple is the
    /// opaque origin's precursor (e.g. a sandboxed document).
    pub fn can_be_derived_from(&self, url: &Url) -> bool {
        if url.scheme() == "about" && (url.path() == "blank" || url.path() == "srcdoc") {
            return true;
        }
        match (self, SchemeHostPort::from_url(url)) {
            (ImmutableOrigin::Tuple(tuple), Some(url_tuple)) => *tuple == url_tuple,
            (ImmutableOrigin::Tuple(_), None) => false,
            (ImmutableOrigin::Opaque(opaque), Some(url_tuple)) => {
                opaque.precursor().is_none_or(|precursor| *precursor == url_tuple)
            },
            (ImmutableOrigin::Opaque(_), None) => true,
        }
    }

    /// <https://html.spec.whatwg.org/multipage/#ascii-serialisation-of-an-origin>
    pub fn ascii_serialization(&self) -> String {
        match *self {
            ImmutableOrigin::Opaque(_) => "null".to_owned(),
            ImmutableOrigin::Tuple(ref tuple) => tuple.to_string(),
        }
    }
}

impl fmt::Display for ImmutableOrigin {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ImmutableOrigin::Tuple(ref tuple) => write!(fmt, "{tuple}"),
            ImmutableOrigin::Opaque(ref opaque) => match opaque.precursor() {
                Some(precursor) => write!(fmt, "null [precursor: {precursor}]"),
                None => fmt.write_str("null"),
            },
        }
    }
}
