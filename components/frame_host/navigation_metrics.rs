/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Timing of navigations, from the browser's point of view. Renderer clocks are
//! never compared with the browser's: the only renderer-reported value is how
//! long beforeunload handlers ran, which is a duration.

use std::fmt;
use std::time::{Duration, Instant};

use frame_host_traits::NavigationRequestId;
use url::Url;

use crate::navigation_request::NavigationRequest;

/// When a navigation went through each stage. Filled in by the frame host.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NavigationTiming {
    pub before_unload_sent: Option<Instant>,
    /// When the last renderer asked to run beforeunload handlers answered.
    pub before_unload_completed: Option<Instant>,
    /// The longest time one renderer reported spending in beforeunload handlers.
    pub before_unload_handler_duration: Option<Duration>,
    pub commit_sent: Option<Instant>,
}

impl NavigationTiming {
    pub(crate) fn record_before_unload_reply(&mut self, handler_duration: Duration) {
        self.before_unload_handler_duration = Some(
            self.before_unload_handler_duration
                .map_or(handler_duration, |longest| longest.max(handler_duration)),
        );
    }
}

/// How long the stages of a committed main frame navigation took.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationMetrics {
    pub navigation: NavigationRequestId,
    pub url: Url,
    /// Time spent in beforeunload handlers.
    pub before_unload_duration: Option<Duration>,
    /// Time beforeunload messages spent in flight and queued in renderers.
    pub before_unload_queueing_duration: Option<Duration>,
    /// From asking renderers to run beforeunload handlers to sending the commit.
    pub before_unload_to_commit_sent: Option<Duration>,
    /// From sending the commit to the renderer reporting it.
    pub commit_duration: Option<Duration>,
    /// From the start of the navigation to the renderer reporting the commit.
    pub total_duration: Duration,
}

impl NavigationMetrics {
    pub fn for_commit(request: &NavigationRequest, committed_at: Instant) -> NavigationMetrics {
        let timing = request.timing();
        let before_unload_round_trip = timing
            .before_unload_sent
            .zip(timing.before_unload_completed)
            .map(|(sent, completed)| completed.saturating_duration_since(sent));
        NavigationMetrics {
            navigation: request.id(),
            url: request.url().clone(),
            before_unload_duration: timing.before_unload_handler_duration,
            before_unload_queueing_duration: before_unload_round_trip.map(|round_trip| {
                let handler_duration = timing.before_unload_handler_duration.unwrap_or_default();
                round_trip.saturating_sub(handler_duration)
            }),
            before_unload_to_commit_sent: timing
                .before_unload_sent
                .zip(timing.commit_sent)
                .map(|(sent, commit_sent)| commit_sent.saturating_duration_since(sent)),
            commit_duration: timing
                .commit_sent
                .map(|sent| committed_at.saturating_duration_since(sent)),
            total_duration: committed_at.saturating_duration_since(request.start_time()),
        }
    }
}

impl fmt::Display for NavigationMetrics {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "navigation {} to {} took {:?}",
            self.navigation, self.url, self.total_duration
        )?;
        if let Some(duration) = self.before_unload_duration {
            write!(fmt, ", beforeunload {duration:?}")?;
        }
        if let Some(duration) = self.before_unload_queueing_duration {
            write!(fmt, ", beforeunload queueing {duration:?}")?;
        }
        if let Some(duration) = self.before_unload_to_commit_sent {
            write!(fmt, ", beforeunload to commit {duration:?}")?;
        }
        if let Some(duration) = self.commit_duration {
            write!(fmt, ", commit {duration:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_tree::FrameId;

    fn request() -> NavigationRequest {
        NavigationRequest::new(
            FrameId::for_testing(0, 0),
            Url::parse("https://a.test/").expect("valid url"),
        )
    }

    #[test]
    fn stages_are_measured_from_browser_timestamps() {
        let mut request = request();
        let start = request.start_time();
        request.timing = NavigationTiming {
            before_unload_sent: Some(start + Duration::from_millis(10)),
            before_unload_completed: Some(start + Duration::from_millis(60)),
            before_unload_handler_duration: Some(Duration::from_millis(30)),
            commit_sent: Some(start + Duration::from_millis(70)),
        };

        let metrics = NavigationMetrics::for_commit(&request, start + Duration::from_millis(100));
        assert_eq!(metrics.before_unload_duration, Some(Duration::from_millis(30)));
        assert_eq!(metrics.before_unload_queueing_duration, Some(Duration::from_millis(20)));
        assert_eq!(metrics.before_unload_to_commit_sent, Some(Duration::from_millis(60)));
        assert_eq!(metrics.commit_duration, Some(Duration::from_millis(30)));
        assert_eq!(metrics.total_duration, Duration::from_millis(100));
    }

    #[test]
    fn navigations_without_beforeunload_only_time_the_commit() {
        let mut request = request();
        let start = request.start_time();
        request.timing.commit_sent = Some(start + Duration::from_millis(5));

        let metrics = NavigationMetrics::for_commit(&request, start + Duration::from_millis(8));
        assert_eq!(metrics.before_unload_duration, None);
        assert_eq!(metrics.before_unload_queueing_duration, None);
        assert_eq!(metrics.before_unload_to_commit_sent, None);
        assert_eq!(metrics.commit_duration, Some(Duration::from_millis(3)));
    }

    #[test]
    fn the_slowest_renderer_is_kept() {
        let mut timing = NavigationTiming::default();
        timing.record_before_unload_reply(Duration::from_millis(12));
        timing.record_before_unload_reply(Duration::from_millis(40));
        timing.record_before_unload_reply(Duration::from_millis(3));
        assert_eq!(timing.before_unload_handler_duration, Some(Duration::from_millis(40)));
    }
}
