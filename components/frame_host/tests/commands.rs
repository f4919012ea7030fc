/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, ensure};
use common::{FrameHostTest, ready_request, test_preferences};
use crossbeam_channel::unbounded;
use frame_host::{
    FrameHostError, FrameHostManagerBuilder, FrameHostMsg, FrameRegistry, FrameTreeError,
    LifecycleStateImpl, NavigatorToFrameHostMsg, ProcessLock, RendererProcess, UnloadOutcome,
};
use frame_host_traits::{
    FrameToken, NavigationRequestId, RendererProcessId, RendererToFrameHostMsg, RoutingId,
};

#[test]
fn test_frames_are_registered_in_the_injected_registry() -> Result<(), anyhow::Error> {
    common::init_logging();
    let registry = Rc::new(RefCell::new(FrameRegistry::new()));
    let mut manager = FrameHostManagerBuilder::new()
        .preferences(test_preferences())
        .registry(registry.clone())
        .build();
    let (sender, _receiver) = unbounded();
    manager.add_renderer_process(RendererProcess::new(
        RendererProcessId(1),
        sender,
        ProcessLock::Unlocked,
    ));

    let token = FrameToken::new();
    let main_frame = manager.create_main_frame(RendererProcessId(1), RoutingId(1), token)?;
    ensure!(registry.borrow().find_by_token(token) == Some(main_frame));
    ensure!(
        registry
            .borrow()
            .find_by_routing_id(RendererProcessId(1), RoutingId(1)) ==
            Some(main_frame)
    );

    let child_token = FrameToken::new();
    manager.handle_renderer_message(
        RendererProcessId(1),
        RendererToFrameHostMsg::CreateChildFrame(RoutingId(1), RoutingId(2), child_token),
    );
    let child = registry
        .borrow()
        .find_by_token(child_token)
        .context("child was not registered")?;
    ensure!(manager.tree().parent(child) == Some(main_frame));

    manager.detach(child)?;
    ensure!(!registry.borrow().is_registered(child_token));
    ensure!(registry.borrow().len() == 1);

    let result = manager.create_main_frame(RendererProcessId(1), RoutingId(3), token);
    ensure!(matches!(result, Err(FrameHostError::DuplicateFrame(_))));
    let result = manager.create_main_frame(RendererProcessId(1), RoutingId(1), FrameToken::new());
    ensure!(matches!(result, Err(FrameHostError::DuplicateFrame(_))));
    let result = manager.create_main_frame(RendererProcessId(2), RoutingId(1), FrameToken::new());
    ensure!(matches!(result, Err(FrameHostError::NoSuchProcess(_))));
    Ok(())
}

#[test]
fn test_queued_messages_are_handled_in_order() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = test.create_main_frame(&renderer)?;
    let child = test.create_child(main_frame)?;
    let child_routing_id = test.frame(child)?.routing_id();
    let child_token = test.token(child)?;

    let (sender, receiver) = unbounded();
    sender.send(FrameHostMsg::FromRenderer(
        renderer.id,
        RendererToFrameHostMsg::UpdateUnloadHandlerState(child_routing_id, true),
    ))?;
    // A failing command does not stop the queue.
    sender.send(FrameHostMsg::FromNavigator(NavigatorToFrameHostMsg::Detach(main_frame)))?;
    sender.send(FrameHostMsg::FromNavigator(NavigatorToFrameHostMsg::Detach(child)))?;
    sender.send(FrameHostMsg::FromRenderer(
        renderer.id,
        RendererToFrameHostMsg::UnloadAck(child_routing_id),
    ))?;
    test.manager.handle_pending_messages(&receiver);

    ensure!(test.state(child).is_none());
    ensure!(test.state(main_frame) == Some(LifecycleStateImpl::Active));
    ensure!(*test.delegate.unloads.borrow() == vec![(child_token, UnloadOutcome::Acknowledged)]);
    ensure!(test.manager.next_timer_deadline().is_none());
    Ok(())
}

#[test]
fn test_navigator_commands_report_errors() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = test.create_main_frame(&renderer)?;

    let result = test
        .manager
        .handle_message(FrameHostMsg::FromNavigator(NavigatorToFrameHostMsg::Detach(main_frame)));
    ensure!(matches!(result, Err(FrameHostError::IsMainFrame(_))));
    let result = test.manager.handle_message(FrameHostMsg::FromNavigator(
        NavigatorToFrameHostMsg::CancelRequest(main_frame, NavigationRequestId::new()),
    ));
    ensure!(matches!(result, Err(FrameHostError::NoSuchNavigation(..))));
    let result = test.manager.handle_message(FrameHostMsg::FromNavigator(
        NavigatorToFrameHostMsg::EnterBackForwardCache(main_frame),
    ));
    ensure!(matches!(result, Err(FrameHostError::IsPrimaryMainFrame(_))));
    Ok(())
}

#[test]
fn test_commands_on_missing_frames_fail() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let renderer = test.add_renderer(1);
    let main_frame = test.create_main_frame(&renderer)?;
    let child = test.create_child(main_frame)?;
    test.manager.detach(child)?;

    ensure!(matches!(test.manager.detach(child), Err(FrameHostError::NoSuchFrame(_))));
    ensure!(matches!(test.manager.unload(child), Err(FrameHostError::NoSuchFrame(_))));
    let result = test.manager.begin_commit(ready_request(child, "https://a.test/")?);
    ensure!(matches!(result, Err(FrameHostError::NoSuchFrame(_))));
    // A new frame reusing the slot is not reachable through the stale id.
    let reused = test.create_child(main_frame)?;
    ensure!(reused != child);
    ensure!(test.manager.frame(child).is_none());
    Ok(())
}

#[test]
fn test_speculative_frames_need_a_committed_position() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let first = test.add_renderer(1);
    let second = test.add_renderer(2);
    let main_frame = test.create_main_frame(&first)?;
    let speculative = test.create_speculative_frame(main_frame, &second)?;

    let routing_id = test.next_routing_id();
    let result = test
        .manager
        .create_speculative_frame(main_frame, second.id, routing_id, FrameToken::new());
    ensure!(matches!(
        result,
        Err(FrameHostError::FrameTree(FrameTreeError::SpeculativeFrameExists(_)))
    ));
    let routing_id = test.next_routing_id();
    let result = test
        .manager
        .create_speculative_frame(speculative, second.id, routing_id, FrameToken::new());
    ensure!(matches!(result, Err(FrameHostError::InvalidState { .. })));

    let result = test.manager.destroy_speculative_frame(main_frame);
    ensure!(matches!(result, Err(FrameHostError::InvalidState { .. })));
    test.manager.destroy_speculative_frame(speculative)?;
    ensure!(test.state(speculative).is_none());
    ensure!(test.manager.tree().speculative_frame(main_frame).is_none());
    Ok(())
}

#[test]
fn test_same_document_navigations_need_a_committed_document() -> Result<(), anyhow::Error> {
    let mut test = FrameHostTest::new();
    let first = test.add_renderer(1);
    let second = test.add_renderer(2);
    let main_frame = test.create_main_frame(&first)?;
    let speculative = test.create_speculative_frame(main_frame, &second)?;

    let request = ready_request(main_frame, "https://a.test/#top")?
        .same_document()
        .commit_in(speculative);
    let result = test.manager.begin_commit(request);
    ensure!(matches!(result, Err(FrameHostError::InvalidState { .. })));
    ensure!(test.state(speculative) == Some(LifecycleStateImpl::Speculative));
    Ok(())
}
