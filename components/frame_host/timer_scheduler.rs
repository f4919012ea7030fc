/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cmp::{self, Ord};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use frame_host_traits::NavigationRequestId;
use rustc_hash::FxHashSet;

use crate::frame_tree::FrameId;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerId(u64);

/// What to do when a timer fires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerEvent {
    /// The renderer took too long to acknowledge an unload of this frame.
    UnloadDeadline(FrameId),
    /// Renderers took too long to run beforeunload handlers for this navigation.
    BeforeUnloadDeadline(NavigationRequestId),
}

#[derive(Debug)]
struct ScheduledTimer {
    id: TimerId,
    for_time: Instant,
    event: TimerEvent,
}

impl Ord for ScheduledTimer {
    fn cmp(&self, other: &ScheduledTimer) -> cmp::Ordering {
        match self.for_time.cmp(&other.for_time).reverse() {
            cmp::Ordering::Equal => self.id.cmp(&other.id).reverse(),
            ordering => ordering,
        }
    }
}

impl PartialOrd for ScheduledTimer {
    fn partial_cmp(&self, other: &ScheduledTimer) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for ScheduledTimer {}
impl PartialEq for ScheduledTimer {
    fn eq(&self, other: &ScheduledTimer) -> bool {
        self.id == other.id
    }
}

/// Deadlines of the frame host. Nothing here sleeps: the owner asks for the
/// timers that elapsed by a given instant, and uses [`TimerScheduler::next_deadline`]
/// to decide when to ask next.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    queue: BinaryHeap<ScheduledTimer>,
    cancelled: FxHashSet<TimerId>,
    next_id: u64,
}

impl TimerScheduler {
    pub fn schedule(&mut self, now: Instant, delay: Duration, event: TimerEvent) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.queue.push(ScheduledTimer {
            id,
            for_time: deadline_after(now, delay),
            event,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.cancelled.insert(id);
    }

    /// Remove and return the timers due at `now`, earliest first.
    pub fn take_elapsed(&mut self, now: Instant) -> Vec<(TimerId, TimerEvent)> {
        let mut elapsed = vec![];
        while self.queue.peek().is_some_and(|timer| timer.for_time <= now) {
            let Some(timer) = self.queue.pop() else {
                break;
            };
            if !self.cancelled.remove(&timer.id) {
                elapsed.push((timer.id, timer.event));
            }
        }
        elapsed
    }

    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(timer) = self.queue.peek() {
            if !self.cancelled.contains(&timer.id) {
                return Some(timer.for_time);
            }
            let id = timer.id;
            self.queue.pop();
            self.cancelled.remove(&id);
        }
        None
    }

    pub fn is_empty(&mut self) -> bool {
        self.next_deadline().is_none()
    }
}

/// `now + delay`, saturated to the latest instant the platform can represent
/// near `now`.
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    if let Some(deadline) = now.checked_add(delay) {
        return deadline;
    }
    let mut deadline = now;
    let mut step = delay;
    while !step.is_zero() {
        match deadline.checked_add(step) {
            Some(later) => deadline = later,
            None => step /= 2,
        }
    }
    deadline
}
