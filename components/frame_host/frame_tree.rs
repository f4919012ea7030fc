/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The frame tree: an arena of frames with parent/child and speculative links.
//!
//! Frames refer to each other through [`FrameId`]s rather than pointers. An id
//! carries the generation of its slot, so an id that outlives its frame can never
//! reach the frame that reuses the slot; lookups through a stale id simply fail.

use log::debug;

use crate::frame::Frame;
use crate::lifecycle::LifecycleStateImpl;

/// A generation-checked index into a [`FrameTree`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FrameId {
    index: u32,
    generation: u32,
}

impl FrameId {
    #[cfg(test)]
    pub(crate) fn for_testing(index: u32, generation: u32) -> FrameId {
        FrameId { index, generation }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FrameTreeError {
    #[error("frame {0:?} does not exist")]
    NoSuchFrame(FrameId),
    #[error("frame {0:?} already has a speculative frame")]
    SpeculativeFrameExists(FrameId),
    #[error("frame {0:?} is not a speculative frame")]
    NotSpeculative(FrameId),
    #[error("frame {0:?} still has children")]
    HasChildren(FrameId),
}

#[derive(Debug)]
struct Node {
    frame: Frame,
    parent: Option<FrameId>,
    children: Vec<FrameId>,
    depth: u32,
    /// The speculative frame that may replace this one.
    speculative: Option<FrameId>,
    /// For speculative frames: the frame whose tree position this one may take.
    speculative_for: Option<FrameId>,
    /// Set once another frame took this frame's tree position.
    replaced: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Default)]
pub struct FrameTree {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    /// The main frame of the page currently shown.
    primary_main_frame: Option<FrameId>,
}

impl FrameTree {
    pub fn new() -> FrameTree {
        FrameTree::default()
    }

    fn node(&self, id: FrameId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: FrameId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn insert_node(&mut self, node: Node) -> FrameId {
        match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                FrameId {
                    index,
                    generation: slot.generation,
                }
            },
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                FrameId {
                    index,
                    generation: 0,
                }
            },
        }
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.node(id).map(|node| &node.frame)
    }

    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.node_mut(id).map(|node| &mut node.frame)
    }

    pub fn contains(&self, id: FrameId) -> bool {
        self.node(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameId, &Frame)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    FrameId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    &node.frame,
                )
            })
        })
    }

    pub fn primary_main_frame(&self) -> Option<FrameId> {
        self.primary_main_frame
    }

    /// Show the page of `id`. The page previously shown is not changed.
    pub(crate) fn set_primary_main_frame(&mut self, id: Option<FrameId>) {
        if let Some(node) = id.and_then(|id| self.node_mut(id)) {
            node.replaced = false;
        }
        self.primary_main_frame = id;
    }

    /// Insert the main frame of a new page.
    pub fn insert_root(&mut self, frame: Frame) -> FrameId {
        self.insert_node(Node {
            frame,
            parent: None,
            children: vec![],
            depth: 0,
            speculative: None,
            speculative_for: None,
            replaced: false,
        })
    }

    /// Append a child to `parent`. The child's initial empty document inherits
    /// the parent's origin, and it starts out prerendering if its parent is.
    pub fn add_child(
        &mut self,
        parent: FrameId,
        mut frame: Frame,
    ) -> Result<FrameId, FrameTreeError> {
        let parent_node = self.node(parent).ok_or(FrameTreeError::NoSuchFrame(parent))?;
        frame.inherit_from_parent(&parent_node.frame);
        let initial_state = if parent_node.frame.is_prerendering() {
            LifecycleStateImpl::Prerendering
        } else {
            LifecycleStateImpl::Active
        };
        frame.lifecycle = crate::lifecycle::Lifecycle::new(initial_state);
        let depth = parent_node.depth + 1;

        let id = self.insert_node(Node {
            frame,
            parent: Some(parent),
            children: vec![],
            depth,
            speculative: None,
            speculative_for: None,
            replaced: false,
        });
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// Attach a speculative frame that may later take the tree position of
    /// `position`.
    pub fn attach_speculative(
        &mut self,
        position: FrameId,
        frame: Frame,
    ) -> Result<FrameId, FrameTreeError> {
        let position_node = self
            .node(position)
            .ok_or(FrameTreeError::NoSuchFrame(position))?;
        if position_node.speculative.is_some() {
            return Err(FrameTreeError::SpeculativeFrameExists(position));
        }
        let parent = position_node.parent;
        let depth = position_node.depth;
        let id = self.insert_node(Node {
            frame,
            parent,
            children: vec![],
            depth,
            speculative: None,
            speculative_for: Some(position),
            replaced: false,
        });
        if let Some(position_node) = self.node_mut(position) {
            position_node.speculative = Some(id);
        }
        Ok(id)
    }

    /// Make a speculative frame take the tree position of the frame it was
    /// created for. Returns the replaced frame, which keeps its parent link but
    /// is no longer one of its parent's children.
    pub fn swap_in_speculative(&mut self, speculative: FrameId) -> Result<FrameId, FrameTreeError> {
        let old = self
            .node(speculative)
            .ok_or(FrameTreeError::NoSuchFrame(speculative))?
            .speculative_for
            .ok_or(FrameTreeError::NotSpeculative(speculative))?;
        let parent = self.node(old).ok_or(FrameTreeError::NoSuchFrame(old))?.parent;

        if let Some(old_node) = self.node_mut(old) {
            old_node.speculative = None;
            old_node.replaced = true;
        }
        if let Some(node) = self.node_mut(speculative) {
            node.speculative_for = None;
        }
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.node_mut(parent) {
                    let slot = parent_node.children.iter_mut().find(|child| **child == old);
                    if let Some(slot) = slot {
                        *slot = speculative;
                    }
                }
            },
            None => {
                if self.primary_main_frame == Some(old) {
                    self.primary_main_frame = Some(speculative);
                }
            },
        }
        debug!("Frame {speculative:?} replaced {old:?}");
        Ok(old)
    }

    /// Mark `id` as no longer occupying its tree position, without a replacement.
    pub(crate) fn mark_replaced(&mut self, id: FrameId) {
        if let Some(node) = self.node_mut(id) {
            node.replaced = true;
        }
    }

    /// Remove a childless frame from the tree. Its slot is reused with a new
    /// generation, so existing ids for it become stale.
    pub fn remove(&mut self, id: FrameId) -> Result<Frame, FrameTreeError> {
        let node = self.node(id).ok_or(FrameTreeError::NoSuchFrame(id))?;
        if !node.children.is_empty() {
            return Err(FrameTreeError::HasChildren(id));
        }
        let parent = node.parent;
        let speculative_for = node.speculative_for;
        let speculative = node.speculative;

        if let Some(parent_node) = parent.and_then(|parent| self.node_mut(parent)) {
            parent_node.children.retain(|child| *child != id);
        }
        if let Some(position_node) = speculative_for.and_then(|position| self.node_mut(position)) {
            position_node.speculative = None;
        }
        let speculative_node = speculative.and_then(|speculative| self.node_mut(speculative));
        if let Some(speculative_node) = speculative_node {
            speculative_node.speculative_for = None;
        }
        if self.primary_main_frame == Some(id) {
            self.primary_main_frame = None;
        }

        let slot = &mut self.slots[id.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);
        slot.node
            .take()
            .map(|node| node.frame)
            .ok_or(FrameTreeError::NoSuchFrame(id))
    }

    pub fn parent(&self, id: FrameId) -> Option<FrameId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: FrameId) -> &[FrameId] {
        self.node(id).map(|node| &node.children[..]).unwrap_or(&[])
    }

    pub fn depth(&self, id: FrameId) -> Option<u32> {
        self.node(id).map(|node| node.depth)
    }

    pub fn speculative_frame(&self, position: FrameId) -> Option<FrameId> {
        self.node(position).and_then(|node| node.speculative)
    }

    pub fn speculative_for(&self, id: FrameId) -> Option<FrameId> {
        self.node(id).and_then(|node| node.speculative_for)
    }

    /// Whether `id` occupies its tree position: it is neither a speculative frame
    /// nor a frame that another frame replaced.
    pub fn is_current(&self, id: FrameId) -> bool {
        self.node(id)
            .is_some_and(|node| node.speculative_for.is_none() && !node.replaced)
    }

    pub fn is_main_frame(&self, id: FrameId) -> bool {
        self.node(id).is_some_and(|node| node.parent.is_none())
    }

    /// The main frame of the page that `id` belongs to.
    pub fn main_frame_of(&self, id: FrameId) -> FrameId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    pub fn previous_sibling(&self, id: FrameId) -> Option<FrameId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|sibling| *sibling == id)?;
        position.checked_sub(1).map(|index| siblings[index])
    }

    pub fn next_sibling(&self, id: FrameId) -> Option<FrameId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(position + 1).copied()
    }

    /// A frame is a local root if it is a main frame or is hosted in a different
    /// process than its parent.
    pub fn is_local_root(&self, id: FrameId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        match node.parent.and_then(|parent| self.get(parent)) {
            Some(parent) => parent.process_id != node.frame.process_id,
            None => true,
        }
    }

    /// The topmost frame of the same-process subtree containing `id`.
    pub fn local_root_of(&self, id: FrameId) -> FrameId {
        let mut current = id;
        while !self.is_local_root(current) {
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// All frames of the subtree rooted at `root`, parents before children.
    /// Speculative frames attached to frames of the subtree are included if asked
    /// for, directly after the frame they were created for.
    pub fn subtree(&self, root: FrameId, include_speculative: bool) -> Vec<FrameId> {
        let mut result = vec![];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            result.push(id);
            if include_speculative {
                if let Some(speculative) = node.speculative {
                    result.push(speculative);
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        result
    }

    /// All frames of the subtree rooted at `root`, children before parents.
    pub fn subtree_post_order(&self, root: FrameId, include_speculative: bool) -> Vec<FrameId> {
        let mut result = self.subtree(root, include_speculative);
        result.reverse();
        result
    }

    /// Main frames of every page, including cached and prerendered pages and
    /// replaced main frames that are still unloading.
    pub fn roots(&self) -> Vec<FrameId> {
        self.iter()
            .filter(|(id, _)| {
                self.node(*id)
                    .is_some_and(|node| node.parent.is_none() && node.speculative_for.is_none())
            })
            .map(|(id, _)| id)
            .collect()
    }
}
