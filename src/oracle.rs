//! The layout collaborator as seen by the overlay engine.
//!
//! The engine never lays out views or parts itself. It asks a
//! [`GeometryOracle`] for bounding boxes and learns about activation,
//! attachment and geometry changes through [`OwnerEvent`]s pushed by the host.

use std::collections::BTreeMap;

use ratatui::prelude::Rect;

use crate::owner::{Area, ElementId, OwnerId, PartId, ViewId};

/// Sub-box of an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    /// Everything the owner occupies, chrome included.
    #[default]
    Full,
    /// The slot the owner's content is mounted into (below tabs/titles).
    Slot,
    /// The content area proper.
    Content,
}

/// Geometry queries answered by the layout engine.
///
/// Only views, parts and the root are resolved through the oracle; overlay
/// boxes are owned by the engine.
pub trait GeometryOracle {
    /// Current box of `owner`, or `None` when detached or not rendered.
    fn bounding_box(&self, owner: OwnerId, region: Region) -> Option<Rect>;

    /// The visible viewport (the terminal area).
    fn viewport(&self) -> Rect;

    /// Whether `owner` refers to a view/part that still exists.
    fn is_live(&self, owner: OwnerId) -> bool;

    /// Every view and part currently known to the layout.
    fn layout_owners(&self) -> Vec<OwnerId>;

    fn area_of(&self, _owner: OwnerId) -> Area {
        Area::Main
    }

    fn main_area_maximized(&self) -> bool {
        false
    }

    /// Layout parent of a view or part (e.g. the part hosting a view).
    fn parent_of(&self, _owner: OwnerId) -> Option<OwnerId> {
        None
    }

    /// Box of an anchor element, in the coordinate space of its outlet.
    fn element_box(&self, element: ElementId) -> Option<Rect>;

    /// Offset of the rendering outlet hosting `element`, for elements that
    /// live inside a nested rendering context.
    fn outlet_offset(&self, _element: ElementId) -> (i32, i32) {
        (0, 0)
    }
}

/// Transitions reported by the layout for a single owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerEvent {
    Activation { owner: OwnerId, active: bool },
    Attach { owner: OwnerId, attached: bool },
    Geometry(OwnerId),
    Destroyed(OwnerId),
}

impl OwnerEvent {
    pub fn owner(&self) -> OwnerId {
        match *self {
            OwnerEvent::Activation { owner, .. }
            | OwnerEvent::Attach { owner, .. }
            | OwnerEvent::Geometry(owner)
            | OwnerEvent::Destroyed(owner) => owner,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OwnerBox {
    full: Rect,
    slot: Option<Rect>,
    content: Option<Rect>,
    area: Area,
    parent: Option<OwnerId>,
}

#[derive(Debug, Clone, Copy)]
struct ElementBox {
    rect: Rect,
    outlet: (i32, i32),
}

/// Map-backed oracle fed by a host that already knows where everything is.
#[derive(Debug, Clone)]
pub struct LayoutOracle {
    root: Rect,
    viewport: Rect,
    owners: BTreeMap<OwnerId, OwnerBox>,
    elements: BTreeMap<ElementId, ElementBox>,
    main_area_maximized: bool,
}

impl LayoutOracle {
    pub fn new(root: Rect) -> Self {
        Self {
            root,
            viewport: root,
            owners: BTreeMap::new(),
            elements: BTreeMap::new(),
            main_area_maximized: false,
        }
    }

    pub fn set_root(&mut self, root: Rect) {
        self.root = root;
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn insert_view(&mut self, id: ViewId, rect: Rect, area: Area) {
        self.insert(OwnerId::View(id), rect, area);
    }

    pub fn insert_part(&mut self, id: PartId, rect: Rect, area: Area) {
        self.insert(OwnerId::Part(id), rect, area);
    }

    fn insert(&mut self, owner: OwnerId, rect: Rect, area: Area) {
        let parent = self.owners.get(&owner).and_then(|b| b.parent);
        self.owners.insert(
            owner,
            OwnerBox {
                full: rect,
                slot: None,
                content: None,
                area,
                parent,
            },
        );
    }

    /// Move or resize a known owner. Unknown owners are ignored.
    pub fn set_bounds(&mut self, owner: OwnerId, rect: Rect) {
        if let Some(entry) = self.owners.get_mut(&owner) {
            entry.full = rect;
            entry.slot = None;
            entry.content = None;
        }
    }

    pub fn set_content(&mut self, owner: OwnerId, rect: Rect) {
        if let Some(entry) = self.owners.get_mut(&owner) {
            entry.content = Some(rect);
        }
    }

    pub fn set_slot(&mut self, owner: OwnerId, rect: Rect) {
        if let Some(entry) = self.owners.get_mut(&owner) {
            entry.slot = Some(rect);
        }
    }

    pub fn set_parent(&mut self, owner: OwnerId, parent: OwnerId) {
        if let Some(entry) = self.owners.get_mut(&owner) {
            entry.parent = Some(parent);
        }
    }

    pub fn remove(&mut self, owner: OwnerId) {
        self.owners.remove(&owner);
    }

    pub fn set_element(&mut self, element: ElementId, rect: Rect) {
        let outlet = self.elements.get(&element).map_or((0, 0), |e| e.outlet);
        self.elements.insert(element, ElementBox { rect, outlet });
    }

    pub fn set_outlet_offset(&mut self, element: ElementId, dx: i32, dy: i32) {
        if let Some(entry) = self.elements.get_mut(&element) {
            entry.outlet = (dx, dy);
        }
    }

    pub fn remove_element(&mut self, element: ElementId) {
        self.elements.remove(&element);
    }

    pub fn set_main_area_maximized(&mut self, maximized: bool) {
        self.main_area_maximized = maximized;
    }
}

impl GeometryOracle for LayoutOracle {
    fn bounding_box(&self, owner: OwnerId, region: Region) -> Option<Rect> {
        if owner == OwnerId::Root {
            return Some(self.root);
        }
        let entry = self.owners.get(&owner)?;
        // Peripheral owners are not rendered while the main area is maximized.
        if self.main_area_maximized && entry.area == Area::Peripheral {
            return None;
        }
        Some(match region {
            Region::Full => entry.full,
            Region::Slot => entry.slot.unwrap_or(entry.full),
            Region::Content => entry.content.or(entry.slot).unwrap_or(entry.full),
        })
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn is_live(&self, owner: OwnerId) -> bool {
        owner == OwnerId::Root || self.owners.contains_key(&owner)
    }

    fn layout_owners(&self) -> Vec<OwnerId> {
        self.owners.keys().copied().collect()
    }

    fn area_of(&self, owner: OwnerId) -> Area {
        self.owners.get(&owner).map_or(Area::Main, |b| b.area)
    }

    fn main_area_maximized(&self) -> bool {
        self.main_area_maximized
    }

    fn parent_of(&self, owner: OwnerId) -> Option<OwnerId> {
        self.owners.get(&owner).and_then(|b| b.parent)
    }

    fn element_box(&self, element: ElementId) -> Option<Rect> {
        self.elements.get(&element).map(|e| e.rect)
    }

    fn outlet_offset(&self, element: ElementId) -> (i32, i32) {
        self.elements.get(&element).map_or((0, 0), |e| e.outlet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: u16, y: u16, width: u16, height: u16) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn content_falls_back_to_slot_then_full() {
        let mut oracle = LayoutOracle::new(rect(0, 0, 100, 40));
        let view = OwnerId::View(ViewId(1));
        oracle.insert_view(ViewId(1), rect(0, 0, 50, 20), Area::Main);
        assert_eq!(
            oracle.bounding_box(view, Region::Content),
            Some(rect(0, 0, 50, 20))
        );
        oracle.set_slot(view, rect(0, 1, 50, 19));
        assert_eq!(
            oracle.bounding_box(view, Region::Content),
            Some(rect(0, 1, 50, 19))
        );
        oracle.set_content(view, rect(1, 2, 48, 17));
        assert_eq!(
            oracle.bounding_box(view, Region::Content),
            Some(rect(1, 2, 48, 17))
        );
        assert_eq!(
            oracle.bounding_box(view, Region::Full),
            Some(rect(0, 0, 50, 20))
        );
    }

    #[test]
    fn peripheral_owners_detach_when_main_area_maximized() {
        let mut oracle = LayoutOracle::new(rect(0, 0, 100, 40));
        let part = OwnerId::Part(PartId(2));
        oracle.insert_part(PartId(2), rect(0, 0, 20, 40), Area::Peripheral);
        assert!(oracle.bounding_box(part, Region::Full).is_some());
        oracle.set_main_area_maximized(true);
        assert!(oracle.bounding_box(part, Region::Full).is_none());
        assert!(oracle.is_live(part));
    }

    #[test]
    fn reinserting_keeps_parent_link() {
        let mut oracle = LayoutOracle::new(rect(0, 0, 100, 40));
        oracle.insert_part(PartId(1), rect(0, 0, 50, 40), Area::Main);
        oracle.insert_view(ViewId(1), rect(0, 1, 50, 39), Area::Main);
        oracle.set_parent(OwnerId::View(ViewId(1)), OwnerId::Part(PartId(1)));
        oracle.insert_view(ViewId(1), rect(0, 1, 40, 39), Area::Main);
        assert_eq!(
            oracle.parent_of(OwnerId::View(ViewId(1))),
            Some(OwnerId::Part(PartId(1)))
        );
    }
}
