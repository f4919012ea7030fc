/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Preferences of the frame host, read from the same kind of JSON preferences
//! file as the rest of the engine. Missing keys keep their default values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("could not read preferences from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid preferences: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Preferences {
    /// How long a renderer gets to run unload handlers before the frames being
    /// removed are deleted anyway.
    #[serde(rename = "frame_host.unload_timeout_ms")]
    pub unload_timeout_ms: u64,
    /// How long a navigation waits for beforeunload handlers before it
    /// proceeds anyway.
    #[serde(rename = "frame_host.before_unload_timeout_ms")]
    pub before_unload_timeout_ms: u64,
    /// Skip the process lock checks when committing.
    #[serde(rename = "frame_host.disable_web_security")]
    pub disable_web_security: bool,
    /// Fail an assertion when the frame host detects an internal inconsistency,
    /// instead of logging it and carrying on.
    #[serde(rename = "frame_host.hard_fail")]
    pub hard_fail: bool,
    /// Fail an assertion when a renderer reports commit parameters that differ
    /// from what the browser expected.
    #[serde(rename = "frame_host.assert_on_commit_param_mismatch")]
    pub assert_on_commit_param_mismatch: bool,
    #[serde(rename = "frame_host.back_forward_cache.enabled")]
    pub back_forward_cache_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Preferences {
        Preferences {
            unload_timeout_ms: 500,
            before_unload_timeout_ms: 1000,
            disable_web_security: false,
            hard_fail: cfg!(debug_assertions),
            assert_on_commit_param_mismatch: false,
            back_forward_cache_enabled: true,
        }
    }
}

impl Preferences {
    pub fn from_json(json: &str) -> Result<Preferences, PrefsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Preferences, PrefsError> {
        let json = fs::read_to_string(path).map_err(|source| PrefsError::Io {
            path: path.to_owned(),
            source,
        })?;
        Preferences::from_json(&json)
    }

    pub fn unload_timeout(&self) -> Duration {
        Duration::from_millis(self.unload_timeout_ms)
    }

    pub fn before_unload_timeout(&self) -> Duration {
        Duration::from_millis(self.before_unload_timeout_ms)
    }
}
