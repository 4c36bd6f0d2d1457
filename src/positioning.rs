//! Placement of dialogs, popups and notifications.
//!
//! Nothing here mutates the registry: the engine asks for a box and stores the
//! result on the node. Sizes are taken as-is from the node; they are only ever
//! clamped by the node's own constraints, never by the context box.

use crate::config::{EngineConfig, ModalScope};
use crate::geometry::{FloatRect, clamp_axis, clamp_within};
use crate::oracle::{GeometryOracle, Region};
use crate::overlay::{
    Align, DialogPlacement, HorizontalEdge, LifecycleState, OverlayKind, OverlayNode,
    OverlayRegistry, Placement, PopupAnchor, PopupPlacement, RelativeTo, VerticalEdge,
};
use crate::owner::{Area, OwnerId};

/// Result of placing a node: its new box and the placement record to store
/// alongside it (cascade level fixed, effective popup alignment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    pub bounds: FloatRect,
    pub placement: Placement,
}

pub struct PositioningEngine<'a, G: GeometryOracle> {
    registry: &'a OverlayRegistry,
    oracle: &'a G,
    config: &'a EngineConfig,
}

impl<'a, G: GeometryOracle> PositioningEngine<'a, G> {
    pub fn new(registry: &'a OverlayRegistry, oracle: &'a G, config: &'a EngineConfig) -> Self {
        Self {
            registry,
            oracle,
            config,
        }
    }

    pub fn place(&self, node: &OverlayNode) -> Placed {
        match node.placement {
            Placement::Dialog(dialog) => {
                let dialog = DialogPlacement {
                    cascade: Some(dialog.cascade.unwrap_or_else(|| self.cascade_level(node))),
                    ..dialog
                };
                Placed {
                    bounds: self.dialog_bounds(node, &dialog),
                    placement: Placement::Dialog(dialog),
                }
            }
            Placement::Popup(popup) => {
                let (bounds, effective_align) = self.popup_bounds(node, &popup);
                Placed {
                    bounds,
                    placement: Placement::Popup(PopupPlacement {
                        effective_align,
                        ..popup
                    }),
                }
            }
            Placement::Notification => Placed {
                bounds: self.notification_bounds(node),
                placement: Placement::Notification,
            },
        }
    }

    /// One step past the highest cascade among the older dialogs of the
    /// node's stack, so a new dialog never lands exactly on one below it.
    fn cascade_level(&self, node: &OverlayNode) -> u16 {
        let root = node.blocking_root();
        self.registry
            .list(|n| {
                n.seq < node.seq
                    && n.blocking_root() == root
                    && matches!(n.state, LifecycleState::Attached | LifecycleState::Hidden)
            })
            .iter()
            .filter_map(|n| match n.placement {
                Placement::Dialog(DialogPlacement { cascade, .. }) => cascade,
                _ => None,
            })
            .max()
            .map_or(0, |level| level.saturating_add(1))
    }

    fn viewport(&self) -> FloatRect {
        FloatRect::from(self.oracle.viewport())
    }

    /// Root box, or the viewport when modality is scoped to it.
    fn scope_box(&self) -> FloatRect {
        match self.config.modal_scope {
            ModalScope::Viewport => self.viewport(),
            ModalScope::Workbench => self
                .oracle
                .bounding_box(OwnerId::Root, Region::Full)
                .map_or_else(|| self.viewport(), FloatRect::from),
        }
    }

    fn owner_box(&self, owner: OwnerId, region: Region) -> Option<FloatRect> {
        match owner {
            OwnerId::Overlay(id) => self.registry.get(id).and_then(|n| n.bounds),
            _ => self.oracle.bounding_box(owner, region).map(FloatRect::from),
        }
    }

    /// Box a dialog is centered in.
    pub fn centering_box(&self, node: &OverlayNode) -> FloatRect {
        if node.is_application_blocking() {
            return self.scope_box();
        }
        let chain = self.registry.chain_from(node.context);
        let Some(&nearest) = chain.last() else {
            return self.scope_box();
        };
        if !nearest.is_layout() {
            return self.scope_box();
        }
        if self.oracle.area_of(nearest) == Area::Peripheral && self.oracle.main_area_maximized() {
            return self.scope_box();
        }
        self.oracle
            .bounding_box(nearest, Region::Content)
            .map_or_else(|| self.scope_box(), FloatRect::from)
    }

    /// Centered position plus cascade step, before any user offset.
    pub fn dialog_base(&self, node: &OverlayNode, cascade: u16) -> FloatRect {
        let frame = self.centering_box(node);
        let (step_x, step_y) = self.config.cascade_offset;
        let width = node.size.width;
        let height = node.size.height;
        let x = frame.x + (frame.width as i32 - width as i32) / 2 + cascade as i32 * step_x;
        let y = frame.y + (frame.height as i32 - height as i32) / 2 + cascade as i32 * step_y;
        FloatRect::new(x, y, width, height)
    }

    pub fn dialog_bounds(&self, node: &OverlayNode, dialog: &DialogPlacement) -> FloatRect {
        let base = self.dialog_base(node, dialog.cascade.unwrap_or(0));
        let (dx, dy) = dialog.offset.unwrap_or((0, 0));
        clamp_within(base.translate(dx, dy), self.viewport())
    }

    /// Box both point anchors and overflow checks are measured against.
    fn reference_box(&self, node: &OverlayNode, relative_to: RelativeTo) -> FloatRect {
        if relative_to == RelativeTo::Viewport || node.context == OwnerId::Root {
            return self.viewport();
        }
        self.owner_box(node.context, Region::Full)
            .unwrap_or_else(|| self.viewport())
    }

    fn relative_to(&self, node: &OverlayNode, anchor: &PopupAnchor) -> RelativeTo {
        match anchor {
            PopupAnchor::Point {
                relative_to: Some(relative_to),
                ..
            } => *relative_to,
            _ if node.context == OwnerId::Root => RelativeTo::Viewport,
            _ => RelativeTo::Context,
        }
    }

    /// Absolute anchor rectangle, or `None` for an element that is not
    /// rendered.
    pub fn anchor_rect(&self, node: &OverlayNode, anchor: &PopupAnchor) -> Option<FloatRect> {
        match anchor {
            PopupAnchor::Element(element) => {
                let rect = FloatRect::from(self.oracle.element_box(*element)?);
                let (dx, dy) = self.oracle.outlet_offset(*element);
                Some(rect.translate(dx, dy))
            }
            PopupAnchor::Point { point, .. } => {
                let reference = self.reference_box(node, self.relative_to(node, anchor));
                let y = match point.vertical {
                    VerticalEdge::Top(top) => reference.y + top,
                    VerticalEdge::Bottom(bottom) => reference.bottom() - bottom,
                };
                let x = match point.horizontal {
                    HorizontalEdge::Left(left) => reference.x + left,
                    HorizontalEdge::Right(right) => reference.right() - right,
                };
                Some(FloatRect::new(x, y, 0, 0))
            }
        }
    }

    /// Popup box and the alignment actually used.
    pub fn popup_bounds(&self, node: &OverlayNode, popup: &PopupPlacement) -> (FloatRect, Align) {
        let bounds = self.reference_box(node, self.relative_to(node, &popup.anchor));
        let Some(anchor) = self.anchor_rect(node, &popup.anchor) else {
            // Keep the last known box while the anchor element is gone.
            let fallback = node
                .bounds
                .unwrap_or_else(|| FloatRect::new(bounds.x, bounds.y, node.size.width, node.size.height));
            return (fallback, popup.effective_align);
        };
        let primary = align_against(anchor, node.size.width, node.size.height, popup.align);
        let flipped_align = popup.align.opposite();
        let flipped = align_against(anchor, node.size.width, node.size.height, flipped_align);
        let (rect, align) = if !overflows(primary, bounds, popup.align) {
            (primary, popup.align)
        } else if !overflows(flipped, bounds, flipped_align) {
            (flipped, flipped_align)
        } else {
            (clamp_within(primary, bounds), popup.align)
        };
        (clamp_cross_axis(rect, bounds, align), align)
    }

    /// Top-right slot of the viewport, below every older attached
    /// notification.
    pub fn notification_bounds(&self, node: &OverlayNode) -> FloatRect {
        let viewport = self.viewport();
        let gap = self.config.notification_gap as i32;
        let y = self
            .registry
            .list(|n| {
                n.kind == OverlayKind::Notification
                    && n.state == LifecycleState::Attached
                    && n.seq < node.seq
            })
            .iter()
            .fold(viewport.y + gap, |y, n| y + n.size.height as i32 + gap);
        let x = viewport.right() - node.size.width as i32 - gap;
        FloatRect::new(x.max(viewport.x), y, node.size.width, node.size.height)
    }
}

/// Popup box touching `anchor` on the `align` side and growing away from it,
/// centered on the anchor along the other axis.
fn align_against(anchor: FloatRect, width: u16, height: u16, align: Align) -> FloatRect {
    let (cx, cy) = anchor.center();
    let centered_x = cx - width as i32 / 2;
    let centered_y = cy - height as i32 / 2;
    match align {
        Align::North => FloatRect::new(centered_x, anchor.y - height as i32, width, height),
        Align::South => FloatRect::new(centered_x, anchor.bottom(), width, height),
        Align::East => FloatRect::new(anchor.right(), centered_y, width, height),
        Align::West => FloatRect::new(anchor.x - width as i32, centered_y, width, height),
    }
}

/// Keep the popup inside `bounds` across the alignment axis; the alignment
/// axis itself is settled by flipping.
fn clamp_cross_axis(rect: FloatRect, bounds: FloatRect, align: Align) -> FloatRect {
    if align.is_vertical() {
        FloatRect {
            x: clamp_axis(rect.x, rect.width, bounds.x, bounds.width),
            ..rect
        }
    } else {
        FloatRect {
            y: clamp_axis(rect.y, rect.height, bounds.y, bounds.height),
            ..rect
        }
    }
}

fn overflows(rect: FloatRect, bounds: FloatRect, align: Align) -> bool {
    if align.is_vertical() {
        rect.y < bounds.y || rect.bottom() > bounds.bottom()
    } else {
        rect.x < bounds.x || rect.right() > bounds.right()
    }
}
