//! Focus bookkeeping: the current focus target, one frame per blocking root
//! remembering where focus was before the frame's first overlay attached, and
//! the ring used to cycle focusable elements inside an overlay.

use std::collections::BTreeMap;
use std::fmt;

use crate::overlay::OverlayId;
use crate::owner::{ElementId, OwnerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FocusTarget {
    Owner(OwnerId),
    Element { owner: OwnerId, element: ElementId },
}

impl FocusTarget {
    pub fn owner(&self) -> OwnerId {
        match *self {
            FocusTarget::Owner(owner) | FocusTarget::Element { owner, .. } => owner,
        }
    }

    pub fn element(&self) -> Option<ElementId> {
        match *self {
            FocusTarget::Owner(_) => None,
            FocusTarget::Element { element, .. } => Some(element),
        }
    }
}

impl fmt::Display for FocusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusTarget::Owner(owner) => write!(f, "{owner}"),
            FocusTarget::Element { owner, element } => write!(f, "{owner}/element:{}", element.0),
        }
    }
}

impl From<OwnerId> for FocusTarget {
    fn from(owner: OwnerId) -> Self {
        FocusTarget::Owner(owner)
    }
}

#[derive(Debug, Clone)]
pub struct FocusRing<T: Copy + Eq> {
    order: Vec<T>,
    current: Option<T>,
}

impl<T: Copy + Eq> FocusRing<T> {
    pub fn new(current: Option<T>) -> Self {
        Self {
            order: Vec::new(),
            current,
        }
    }

    pub fn set_order(&mut self, order: Vec<T>) {
        self.order = order;
    }

    pub fn current(&self) -> Option<T> {
        self.current
    }

    pub fn set_current(&mut self, current: Option<T>) {
        self.current = current;
    }

    /// Step through `order`, wrapping at either end. An unset or unknown
    /// current item starts from the first (or last, going backwards).
    pub fn advance(&mut self, forward: bool) {
        if self.order.is_empty() {
            return;
        }
        let len = self.order.len() as isize;
        let next = match self
            .current
            .and_then(|current| self.order.iter().position(|item| *item == current))
        {
            Some(idx) => {
                let step = if forward { 1isize } else { -1isize };
                (idx as isize + step).rem_euclid(len) as usize
            }
            None if forward => 0,
            None => (len - 1) as usize,
        };
        self.current = Some(self.order[next]);
    }
}

/// Overlays sharing one blocking root, with the focus to restore once the
/// last of them closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusFrame {
    pub root: OwnerId,
    pub overlays: Vec<OverlayId>,
    pub restore: Option<FocusTarget>,
}

#[derive(Debug, Default)]
pub struct FocusCoordinator {
    current: Option<FocusTarget>,
    frames: BTreeMap<OwnerId, FocusFrame>,
}

impl FocusCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<FocusTarget> {
        self.current
    }

    /// Returns whether focus actually moved.
    pub fn set_current(&mut self, target: Option<FocusTarget>) -> bool {
        if self.current == target {
            return false;
        }
        tracing::debug!(
            from = ?self.current.map(|t| t.to_string()),
            to = ?target.map(|t| t.to_string()),
            "focus moved"
        );
        self.current = target;
        true
    }

    pub fn frame(&self, root: OwnerId) -> Option<&FocusFrame> {
        self.frames.get(&root)
    }

    /// Register `id` in its root's frame, capturing the current focus as the
    /// restore target when the frame is new.
    pub fn enter(&mut self, root: OwnerId, id: OverlayId) {
        let current = self.current;
        let frame = self.frames.entry(root).or_insert_with(|| FocusFrame {
            root,
            overlays: Vec::new(),
            restore: current,
        });
        if !frame.overlays.contains(&id) {
            frame.overlays.push(id);
        }
    }

    /// Drop `id` from its frame. When that empties the frame, the frame is
    /// discarded and its restore target returned.
    pub fn leave(&mut self, root: OwnerId, id: OverlayId) -> Option<FocusTarget> {
        let frame = self.frames.get_mut(&root)?;
        frame.overlays.retain(|other| *other != id);
        if !frame.overlays.is_empty() {
            return None;
        }
        self.frames.remove(&root).and_then(|frame| frame.restore)
    }

    /// Forget restore targets pointing into `owner`.
    pub fn forget_owner(&mut self, owner: OwnerId) {
        for frame in self.frames.values_mut() {
            if frame.restore.is_some_and(|t| t.owner() == owner) {
                frame.restore = None;
            }
        }
        if self.current.is_some_and(|t| t.owner() == owner) {
            self.current = None;
        }
    }

    /// Next or previous focusable of `owner`, starting from the current
    /// element when it belongs to `owner`.
    pub fn cycle(
        &self,
        owner: OwnerId,
        focusables: &[ElementId],
        forward: bool,
    ) -> Option<FocusTarget> {
        let current = self
            .current
            .filter(|t| t.owner() == owner)
            .and_then(|t| t.element());
        let mut ring = FocusRing::new(current);
        ring.set_order(focusables.to_vec());
        ring.advance(forward);
        ring.current()
            .map(|element| FocusTarget::Element { owner, element })
    }
}
