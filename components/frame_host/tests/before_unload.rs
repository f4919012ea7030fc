/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use std::time::{Duration, Instant};

use anyhow::ensure;
use common::{FrameHostTest, TestRenderer, ready_request};
use frame_host::{BadMessageReason, FrameId, LifecycleStateImpl, NavigationState};
use frame_host_traits::{
    BeforeUnloadReply, FrameHostToRendererMsg, NavigationRequestId, NavigationType,
    RendererToFrameHostMsg,
};

fn add_before_unload_handler(test: &mut FrameHostTest, frame: FrameId) -> anyhow::Result<()> {
    test.from_renderer_of(frame, |routing_id| {
        RendererToFrameHostMsg::UpdateBeforeUnloadHandlerState(routing_id, true)
    })
}

fn reply(test: &mut FrameHostTest, frame: FrameId, proceed: bool) -> anyhow::Result<()> {
    test.from_renderer_of(frame, |routing_id| {
        RendererToFrameHostMsg::BeforeUnloadCompleted(
            routing_id,
            BeforeUnloadReply {
                proceed,
                handler_duration: Duration::from_millis(5),
            },
        )
    })
}

fn before_unload_count(renderer: &TestRenderer) -> usize {
    renderer
        .take_messages()
        .iter()
        .filter(|msg| matches!(msg, FrameHostToRendererMsg::BeforeUnload(..)))
        .count()
}

fn sent_commit(renderer: &TestRenderer) -> bool {
    renderer
        .take_messages()
        .iter()
        .any(|msg| matches!(msg, FrameHostToRendererMsg::CommitNavigation(_)))
}

fn request_state(
    test: &FrameHostTest,
    frame: FrameId,
    id: NavigationRequestId,
) -> anyhow::Result<Option<NavigationState>> {
    Ok(test
        .frame(frame)?
        .pending_requests()
        .get(id)
        .map(|request| request.state()))
}

/// A shown main frame in `renderer` whose document has a beforeunload handler.
fn main_frame_with_handler(
    test: &mut FrameHostTest,
    renderer: &TestRenderer,
) -> anyhow::Result<FrameId> {
    let main_frame = test.create_main_frame(renderer)?;
    test.commit(ready_request(main_frame, "https://a.test/")?)?;
    add_before_unload_handler(test, main_frame)?;
    renderer.take_messages();
    Ok(main_frame)
}

#[test]
fn test_commit_waits_for_before_unload_handlers() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = main_frame_with_handler(&mut test, &renderer)?;

    let request = ready_request(main_frame, "https://a.test/next")?;
    let id = request.id();
    let params = test.params_for(&request);
    test.manager.begin_commit(request)?;

    let messages = renderer.take_messages();
    ensure!(matches!(messages.as_slice(), [FrameHostToRendererMsg::BeforeUnload(_, false)]));
    ensure!(test.manager.is_waiting_for_before_unload(id));
    ensure!(request_state(&test, main_frame, id)? == Some(NavigationState::WaitingForBeforeUnload));
    ensure!(test.manager.next_timer_deadline().is_some());

    reply(&mut test, main_frame, true)?;
    ensure!(sent_commit(&renderer));
    ensure!(!test.manager.is_waiting_for_before_unload(id));
    ensure!(request_state(&test, main_frame, id)? == Some(NavigationState::ReadyToCommit));
    ensure!(test.manager.next_timer_deadline().is_none());

    test.from_renderer_of(main_frame, |routing_id| {
        RendererToFrameHostMsg::DidCommitProvisionalLoad(routing_id, Box::new(params))
    })?;
    ensure!(test.delegate.terminations.borrow().is_empty());
    ensure!(test.delegate.commits.borrow().len() == 2);

    let metrics = test.delegate.navigation_metrics.borrow();
    let Some((_, metrics)) = metrics.last() else {
        anyhow::bail!("no metrics were recorded");
    };
    ensure!(metrics.navigation == id);
    ensure!(metrics.before_unload_duration == Some(Duration::from_millis(5)));
    ensure!(metrics.before_unload_queueing_duration.is_some());
    ensure!(metrics.before_unload_to_commit_sent.is_some());
    ensure!(metrics.commit_duration.is_some());
    Ok(())
}

#[test]
fn test_staying_on_the_page_cancels_the_navigation() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = main_frame_with_handler(&mut test, &renderer)?;

    let request = ready_request(main_frame, "https://a.test/next")?;
    let id = request.id();
    test.manager.begin_commit(request)?;
    ensure!(before_unload_count(&renderer) == 1);

    reply(&mut test, main_frame, false)?;
    ensure!(!sent_commit(&renderer));
    ensure!(request_state(&test, main_frame, id)?.is_none());
    ensure!(!test.manager.is_waiting_for_before_unload(id));
    ensure!(test.manager.next_timer_deadline().is_none());
    ensure!(*test.delegate.cancelled_navigations.borrow() == vec![(test.token(main_frame)?, id)]);

    // A second answer has nothing left to release.
    reply(&mut test, main_frame, true)?;
    ensure!(!sent_commit(&renderer));
    ensure!(test.delegate.terminations.borrow().is_empty());
    Ok(())
}

#[test]
fn test_each_process_runs_its_own_handlers() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let first = test.add_renderer(1);
    let second = test.add_renderer(2);
    let main_frame = main_frame_with_handler(&mut test, &first)?;
    let local_child = test.create_child(main_frame)?;
    add_before_unload_handler(&mut test, local_child)?;
    let child = test.create_child(main_frame)?;
    let remote_child = test.navigate_in_speculative_frame(child, &second, "https://b.test/")?;
    add_before_unload_handler(&mut test, remote_child)?;
    first.take_messages();
    second.take_messages();

    let request = ready_request(main_frame, "https://a.test/next")?;
    let id = request.id();
    test.manager.begin_commit(request)?;
    // The main frame runs the handlers of its same-process child too.
    ensure!(before_unload_count(&first) == 1);
    ensure!(before_unload_count(&second) == 1);

    reply(&mut test, main_frame, true)?;
    ensure!(test.manager.is_waiting_for_before_unload(id));
    ensure!(!sent_commit(&first));

    reply(&mut test, remote_child, true)?;
    ensure!(!test.manager.is_waiting_for_before_unload(id));
    ensure!(sent_commit(&first));
    Ok(())
}

#[test]
fn test_renderer_initiated_navigations_skip_the_initiator() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let first = test.add_renderer(1);
    let second = test.add_renderer(2);
    let main_frame = main_frame_with_handler(&mut test, &first)?;

    let request = ready_request(main_frame, "https://a.test/next")?.renderer_initiated(true);
    let id = request.id();
    test.manager.begin_commit(request)?;
    ensure!(!test.manager.is_waiting_for_before_unload(id));
    ensure!(sent_commit(&first));
    test.manager.cancel_request(main_frame, id)?;

    let child = test.create_child(main_frame)?;
    let remote_child = test.navigate_in_speculative_frame(child, &second, "https://b.test/")?;
    add_before_unload_handler(&mut test, remote_child)?;
    first.take_messages();
    second.take_messages();

    let request = ready_request(main_frame, "https://a.test/other")?.renderer_initiated(true);
    let id = request.id();
    test.manager.begin_commit(request)?;
    ensure!(before_unload_count(&first) == 0);
    ensure!(before_unload_count(&second) == 1);
    reply(&mut test, remote_child, true)?;
    ensure!(sent_commit(&first));
    ensure!(request_state(&test, main_frame, id)? == Some(NavigationState::ReadyToCommit));
    Ok(())
}

#[test]
fn test_unanswered_handlers_do_not_hold_the_navigation_forever() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = main_frame_with_handler(&mut test, &renderer)?;

    let request = ready_request(main_frame, "https://a.test/")?
        .with_navigation_type(NavigationType::Reload);
    let id = request.id();
    test.manager.begin_commit(request)?;
    let messages = renderer.take_messages();
    ensure!(matches!(messages.as_slice(), [FrameHostToRendererMsg::BeforeUnload(_, true)]));

    test.manager.handle_elapsed_timers(Instant::now());
    ensure!(test.manager.is_waiting_for_before_unload(id));

    let timeout = test.manager.preferences().before_unload_timeout();
    test.manager
        .handle_elapsed_timers(Instant::now() + timeout + Duration::from_millis(1));
    ensure!(!test.manager.is_waiting_for_before_unload(id));
    ensure!(sent_commit(&renderer));
    ensure!(request_state(&test, main_frame, id)? == Some(NavigationState::ReadyToCommit));

    // The late answer is ignored.
    reply(&mut test, main_frame, false)?;
    ensure!(request_state(&test, main_frame, id)? == Some(NavigationState::ReadyToCommit));
    ensure!(test.delegate.cancelled_navigations.borrow().is_empty());
    Ok(())
}

#[test]
fn test_commit_reported_before_handlers_ran_terminates_the_renderer() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = main_frame_with_handler(&mut test, &renderer)?;

    let request = ready_request(main_frame, "https://a.test/next")?;
    let id = request.id();
    let params = test.params_for(&request);
    test.manager.begin_commit(request)?;
    test.from_renderer_of(main_frame, |routing_id| {
        RendererToFrameHostMsg::DidCommitProvisionalLoad(routing_id, Box::new(params))
    })?;

    ensure!(
        test.delegate.termination_reasons() ==
            vec![BadMessageReason::CommitBeforeReadyToCommit]
    );
    ensure!(!test.manager.is_waiting_for_before_unload(id));
    ensure!(test.manager.next_timer_deadline().is_none());
    ensure!(test.delegate.commits.borrow().len() == 1);
    Ok(())
}

#[test]
fn test_discarding_the_speculative_frame_releases_the_wait() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let first = test.add_renderer(1);
    let second = test.add_renderer(2);
    let main_frame = main_frame_with_handler(&mut test, &first)?;
    let speculative = test.create_speculative_frame(main_frame, &second)?;

    let request = ready_request(main_frame, "https://b.test/")?.commit_in(speculative);
    let id = request.id();
    test.manager.begin_commit(request)?;
    ensure!(before_unload_count(&first) == 1);
    ensure!(!sent_commit(&second));
    ensure!(test.state(speculative) == Some(LifecycleStateImpl::Speculative));

    test.manager.destroy_speculative_frame(speculative)?;
    ensure!(!test.manager.is_waiting_for_before_unload(id));
    ensure!(test.manager.next_timer_deadline().is_none());

    reply(&mut test, main_frame, true)?;
    ensure!(test.delegate.terminations.borrow().is_empty());
    ensure!(test.state(main_frame) == Some(LifecycleStateImpl::Active));
    Ok(())
}

#[test]
fn test_handlers_of_speculative_frames_are_rejected() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let first = test.add_renderer(1);
    let second = test.add_renderer(2);
    let main_frame = test.create_main_frame(&first)?;
    let speculative = test.create_speculative_frame(main_frame, &second)?;

    add_before_unload_handler(&mut test, speculative)?;
    ensure!(
        test.delegate.termination_reasons() ==
            vec![BadMessageReason::InactiveFrameEventInSpeculativeState]
    );
    Ok(())
}

#[test]
fn test_metrics_are_recorded_for_main_frames_only() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = test.create_main_frame(&renderer)?;
    let request = ready_request(main_frame, "https://a.test/")?;
    let id = request.id();
    test.commit(request)?;

    {
        let metrics = test.delegate.navigation_metrics.borrow();
        ensure!(metrics.len() == 1);
        let (frame, metrics) = &metrics[0];
        ensure!(*frame == test.token(main_frame)?);
        ensure!(metrics.navigation == id);
        ensure!(metrics.url.as_str() == "https://a.test/");
        ensure!(metrics.before_unload_duration.is_none());
        ensure!(metrics.before_unload_to_commit_sent.is_none());
        ensure!(metrics.commit_duration.is_some());
    }

    let child = test.create_child(main_frame)?;
    test.commit(ready_request(child, "https://a.test/frame")?)?;
    ensure!(test.delegate.commits.borrow().len() == 2);
    ensure!(test.delegate.navigation_metrics.borrow().len() == 1);
    Ok(())
}
