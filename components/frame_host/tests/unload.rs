/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Removal of frames, with and without running unload handlers.

mod common;

use anyhow::{Context, ensure};
use common::{FrameHostTest, TestRenderer, ready_request};
use frame_host::{FrameHostError, FrameId, LifecycleStateImpl, UnloadOutcome};
use frame_host_traits::{FrameHostToRendererMsg, RendererToFrameHostMsg, UnloadKind};

fn add_unload_handler(test: &mut FrameHostTest, id: FrameId) -> Result<(), anyhow::Error> {
    test.from_renderer_of(id, |routing_id| {
        RendererToFrameHostMsg::UpdateUnloadHandlerState(routing_id, true)
    })
}

fn page_with_child(
    test: &mut FrameHostTest,
) -> Result<(TestRenderer, FrameId, FrameId), anyhow::Error> {
    let renderer = test.add_renderer(1);
    let main_frame = test.create_main_frame(&renderer)?;
    test.commit(ready_request(main_frame, "https://a.test/")?)?;
    let child = test.create_child(main_frame)?;
    renderer.take_messages();
    Ok((renderer, main_frame, child))
}

#[test]
fn test_detach_without_unload_handlers_deletes_immediately() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (renderer, main_frame, child) = page_with_child(&mut test)?;
    let child_token = test.token(child)?;

    test.manager.detach(child)?;

    ensure!(test.state(child).is_none());
    ensure!(test.delegate.was_deleted(child_token));
    ensure!(*test.delegate.unloads.borrow() == vec![(child_token, UnloadOutcome::NotRequired)]);
    ensure!(renderer.take_messages().is_empty());
    ensure!(test.manager.tree().children(main_frame).is_empty());
    ensure!(test.manager.next_timer_deadline().is_none());
    Ok(())
}

#[test]
fn test_unload_deadline_deletes_frames_of_unresponsive_renderer() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (renderer, _, child) = page_with_child(&mut test)?;
    add_unload_handler(&mut test, child)?;
    let child_token = test.token(child)?;
    let child_routing_id = test.frame(child)?.routing_id();

    test.manager.detach(child)?;
    ensure!(test.state(child) == Some(LifecycleStateImpl::RunningUnloadHandlers));
    let messages = renderer.take_messages();
    ensure!(matches!(
        messages.as_slice(),
        [FrameHostToRendererMsg::Unload(routing_id, UnloadKind::Detach)]
            if *routing_id == child_routing_id
    ));
    let ticket = test.frame(child)?.unload_ticket().context("no unload ticket")?;
    ensure!(ticket.is_waiting_for_ack());
    ensure!(ticket.kind() == UnloadKind::Detach);

    // Nothing happens before the deadline.
    let deadline = test.manager.next_timer_deadline().context("no unload deadline")?;
    test.manager
        .handle_elapsed_timers(deadline - std::time::Duration::from_millis(1));
    ensure!(test.state(child) == Some(LifecycleStateImpl::RunningUnloadHandlers));

    test.manager.handle_elapsed_timers(deadline);
    ensure!(test.state(child).is_none());
    ensure!(test.delegate.was_deleted(child_token));
    ensure!(*test.delegate.unloads.borrow() == vec![(child_token, UnloadOutcome::TimedOut)]);

    // An ack arriving late is ignored.
    test.manager
        .handle_renderer_message(renderer.id, RendererToFrameHostMsg::UnloadAck(child_routing_id));
    ensure!(test.delegate.unloads.borrow().len() == 1);
    ensure!(test.delegate.terminations.borrow().is_empty());
    Ok(())
}

#[test]
fn test_unload_ack_completes_removal() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (renderer, main_frame, child) = page_with_child(&mut test)?;
    add_unload_handler(&mut test, child)?;
    let child_token = test.token(child)?;
    let child_routing_id = test.frame(child)?.routing_id();

    test.from_renderer_of(child, RendererToFrameHostMsg::DetachChildFrame)?;
    ensure!(test.state(child) == Some(LifecycleStateImpl::RunningUnloadHandlers));
    renderer.take_messages();

    test.manager
        .handle_renderer_message(renderer.id, RendererToFrameHostMsg::UnloadAck(child_routing_id));
    ensure!(test.state(child).is_none());
    ensure!(*test.delegate.unloads.borrow() == vec![(child_token, UnloadOutcome::Acknowledged)]);
    ensure!(test.manager.next_timer_deadline().is_none());
    ensure!(test.state(main_frame) == Some(LifecycleStateImpl::Active));

    // A second ack has nothing left to acknowledge.
    test.manager
        .handle_renderer_message(renderer.id, RendererToFrameHostMsg::UnloadAck(child_routing_id));
    ensure!(test.delegate.unloads.borrow().len() == 1);
    Ok(())
}

#[test]
fn test_detaching_twice_is_harmless() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (renderer, _, child) = page_with_child(&mut test)?;
    add_unload_handler(&mut test, child)?;

    test.manager.detach(child)?;
    test.manager.detach(child)?;
    test.from_renderer_of(child, RendererToFrameHostMsg::DetachChildFrame)?;

    ensure!(renderer.take_messages().len() == 1);
    ensure!(test.state(child) == Some(LifecycleStateImpl::RunningUnloadHandlers));
    Ok(())
}

#[test]
fn test_main_frames_cannot_be_detached() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (_, main_frame, _) = page_with_child(&mut test)?;

    let result = test.manager.detach(main_frame);
    ensure!(matches!(result, Err(FrameHostError::IsMainFrame(_))));
    ensure!(test.state(main_frame) == Some(LifecycleStateImpl::Active));

    test.from_renderer_of(main_frame, RendererToFrameHostMsg::DetachChildFrame)?;
    ensure!(
        test.delegate.termination_reasons() ==
            vec![frame_host::BadMessageReason::DetachMainFrame]
    );
    Ok(())
}

#[test]
fn test_parent_waits_for_children_running_unload_handlers() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (first, main_frame, child) = page_with_child(&mut test)?;
    let second = test.add_renderer(2);

    // Move the child to another process, where it gets an unload handler.
    let remote_child = test.navigate_in_speculative_frame(child, &second, "https://b.test/")?;
    ensure!(test.state(child).is_none());
    ensure!(test.manager.tree().children(main_frame) == [remote_child]);
    add_unload_handler(&mut test, remote_child)?;
    let main_token = test.token(main_frame)?;
    let remote_token = test.token(remote_child)?;
    let remote_routing_id = test.frame(remote_child)?.routing_id();
    first.take_messages();
    second.take_messages();
    test.delegate.unloads.borrow_mut().clear();

    test.manager.unload(main_frame)?;

    // The main frame has no handler and is done, but stays until its child is.
    ensure!(first.take_messages().is_empty());
    ensure!(matches!(
        second.take_messages().as_slice(),
        [FrameHostToRendererMsg::Unload(_, UnloadKind::NavigatedAway)]
    ));
    ensure!(test.state(main_frame) == Some(LifecycleStateImpl::ReadyToBeDeleted));
    ensure!(test.state(remote_child) == Some(LifecycleStateImpl::RunningUnloadHandlers));
    ensure!(test.manager.tree().primary_main_frame().is_none());

    test.manager
        .handle_renderer_message(second.id, RendererToFrameHostMsg::UnloadAck(remote_routing_id));
    ensure!(test.state(remote_child).is_none());
    ensure!(test.state(main_frame).is_none());
    ensure!(
        *test.delegate.unloads.borrow() ==
            vec![
                (main_token, UnloadOutcome::NotRequired),
                (remote_token, UnloadOutcome::Acknowledged),
            ]
    );
    let deleted = test.delegate.deleted.borrow();
    ensure!(deleted.ends_with(&[remote_token, main_token]));
    Ok(())
}

#[test]
fn test_new_document_removes_children_of_the_previous_one() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (renderer, main_frame, child) = page_with_child(&mut test)?;
    add_unload_handler(&mut test, child)?;

    test.commit(ready_request(main_frame, "https://a.test/next")?)?;

    ensure!(test.state(main_frame) == Some(LifecycleStateImpl::Active));
    ensure!(test.state(child) == Some(LifecycleStateImpl::RunningUnloadHandlers));
    ensure!(
        renderer
            .take_messages()
            .iter()
            .any(|msg| matches!(msg, FrameHostToRendererMsg::Unload(_, UnloadKind::Detach)))
    );
    Ok(())
}

#[test]
fn test_repeated_ack_while_children_unload_changes_nothing() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let (first, _, child) = page_with_child(&mut test)?;
    let second = test.add_renderer(2);
    let grandchild = test.create_child(child)?;
    let remote_grandchild =
        test.navigate_in_speculative_frame(grandchild, &second, "https://b.test/")?;
    add_unload_handler(&mut test, child)?;
    add_unload_handler(&mut test, remote_grandchild)?;
    let child_token = test.token(child)?;
    let remote_token = test.token(remote_grandchild)?;
    let child_routing_id = test.frame(child)?.routing_id();
    let remote_routing_id = test.frame(remote_grandchild)?.routing_id();
    test.delegate.unloads.borrow_mut().clear();
    first.take_messages();
    second.take_messages();

    test.manager.detach(child)?;
    ensure!(first.take_messages().len() == 1);
    ensure!(second.take_messages().len() == 1);

    test.manager
        .handle_renderer_message(first.id, RendererToFrameHostMsg::UnloadAck(child_routing_id));
    ensure!(test.state(child) == Some(LifecycleStateImpl::ReadyToBeDeleted));
    ensure!(!test.frame(child)?.is_waiting_for_unload_ack());
    ensure!(*test.delegate.unloads.borrow() == vec![(child_token, UnloadOutcome::Acknowledged)]);

    // The frame stays until its child is gone, whatever its renderer says.
    test.manager
        .handle_renderer_message(first.id, RendererToFrameHostMsg::UnloadAck(child_routing_id));
    ensure!(test.state(child) == Some(LifecycleStateImpl::ReadyToBeDeleted));
    ensure!(test.state(remote_grandchild) == Some(LifecycleStateImpl::RunningUnloadHandlers));
    ensure!(test.delegate.unloads.borrow().len() == 1);
    ensure!(!test.delegate.was_deleted(child_token));
    ensure!(test.manager.next_timer_deadline().is_some());
    ensure!(test.delegate.terminations.borrow().is_empty());

    test.manager.handle_renderer_message(
        second.id,
        RendererToFrameHostMsg::UnloadAck(remote_routing_id),
    );
    ensure!(test.state(remote_grandchild).is_none());
    ensure!(test.state(child).is_none());
    ensure!(
        *test.delegate.unloads.borrow() ==
            vec![
                (child_token, UnloadOutcome::Acknowledged),
                (remote_token, UnloadOutcome::Acknowledged),
            ]
    );
    Ok(())
}
