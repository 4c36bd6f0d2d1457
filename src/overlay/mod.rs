//! Overlay nodes and the options used to open them.

pub mod registry;
pub mod result;

pub use registry::{OverlayRegistry, RegistryChange};
pub use result::{OverlayHandle, OverlayOutcome, OverlayResult};

use std::fmt;

use crate::geometry::FloatRect;
use crate::owner::{ElementId, OwnerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(u64);

impl OverlayId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Dialog,
    Popup,
    Notification,
}

/// Scope of interaction blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modality {
    None,
    /// Blocks the context chain down to the nearest view or part.
    #[default]
    ContextBlocking,
    /// Blocks the root and every view and part.
    ApplicationBlocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Queued,
    Attached,
    Hidden,
    Closed,
}

impl LifecycleState {
    /// Transitions only move forward, except that `Attached` and `Hidden` may
    /// alternate freely.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Queued, Attached)
                | (Queued, Hidden)
                | (Queued, Closed)
                | (Attached, Hidden)
                | (Attached, Closed)
                | (Hidden, Attached)
                | (Hidden, Closed)
        )
    }

    pub fn is_live(self) -> bool {
        !matches!(self, LifecycleState::Closed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Queued => "queued",
            LifecycleState::Attached => "attached",
            LifecycleState::Hidden => "hidden",
            LifecycleState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlaySize {
    pub width: u16,
    pub height: u16,
}

impl OverlaySize {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// User-settable size limits. When a minimum exceeds its maximum the minimum
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeConstraints {
    pub min_width: Option<u16>,
    pub max_width: Option<u16>,
    pub min_height: Option<u16>,
    pub max_height: Option<u16>,
}

impl SizeConstraints {
    pub fn width(mut self, min: Option<u16>, max: Option<u16>) -> Self {
        self.min_width = min;
        self.max_width = max;
        self
    }

    pub fn height(mut self, min: Option<u16>, max: Option<u16>) -> Self {
        self.min_height = min;
        self.max_height = max;
        self
    }

    pub fn clamp_width(&self, width: i32) -> u16 {
        clamp_dimension(width, self.min_width, self.max_width)
    }

    pub fn clamp_height(&self, height: i32) -> u16 {
        clamp_dimension(height, self.min_height, self.max_height)
    }

    pub fn clamp(&self, size: OverlaySize) -> OverlaySize {
        OverlaySize {
            width: self.clamp_width(size.width as i32),
            height: self.clamp_height(size.height as i32),
        }
    }
}

fn clamp_dimension(value: i32, min: Option<u16>, max: Option<u16>) -> u16 {
    // Max first, then min, so a conflicting min always has the last word.
    let mut v = value;
    if let Some(max) = max {
        v = v.min(max as i32);
    }
    if let Some(min) = min {
        v = v.max(min as i32);
    }
    v.clamp(1, u16::MAX as i32) as u16
}

/// Side of the anchor the popup is attached to; the popup grows away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    North,
    #[default]
    South,
    East,
    West,
}

impl Align {
    pub fn opposite(self) -> Self {
        match self {
            Align::North => Align::South,
            Align::South => Align::North,
            Align::East => Align::West,
            Align::West => Align::East,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Align::North | Align::South)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalEdge {
    Top(i32),
    Bottom(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalEdge {
    Left(i32),
    Right(i32),
}

/// A coordinate anchor expressed as distances from one vertical and one
/// horizontal edge of its reference box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPoint {
    pub vertical: VerticalEdge,
    pub horizontal: HorizontalEdge,
}

impl AnchorPoint {
    pub const fn top_left(top: i32, left: i32) -> Self {
        Self {
            vertical: VerticalEdge::Top(top),
            horizontal: HorizontalEdge::Left(left),
        }
    }

    pub const fn top_right(top: i32, right: i32) -> Self {
        Self {
            vertical: VerticalEdge::Top(top),
            horizontal: HorizontalEdge::Right(right),
        }
    }

    pub const fn bottom_left(bottom: i32, left: i32) -> Self {
        Self {
            vertical: VerticalEdge::Bottom(bottom),
            horizontal: HorizontalEdge::Left(left),
        }
    }

    pub const fn bottom_right(bottom: i32, right: i32) -> Self {
        Self {
            vertical: VerticalEdge::Bottom(bottom),
            horizontal: HorizontalEdge::Right(right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeTo {
    Viewport,
    Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupAnchor {
    /// A live element; its box is re-read on every reposition.
    Element(ElementId),
    /// A coordinate; `relative_to` defaults to the context when there is one.
    Point {
        point: AnchorPoint,
        relative_to: Option<RelativeTo>,
    },
}

impl PopupAnchor {
    pub fn point(point: AnchorPoint) -> Self {
        PopupAnchor::Point {
            point,
            relative_to: None,
        }
    }

    pub fn point_relative(point: AnchorPoint, relative_to: RelativeTo) -> Self {
        PopupAnchor::Point {
            point,
            relative_to: Some(relative_to),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseStrategy {
    pub on_escape: bool,
    pub on_focus_lost: bool,
}

impl Default for CloseStrategy {
    fn default() -> Self {
        Self {
            on_escape: true,
            on_focus_lost: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogPlacement {
    /// User drag offset relative to the computed default position.
    pub offset: Option<(i32, i32)>,
    /// Cascade level fixed when the dialog is first placed.
    pub cascade: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupPlacement {
    pub anchor: PopupAnchor,
    pub align: Align,
    /// Alignment actually used after flipping.
    pub effective_align: Align,
    pub close_strategy: CloseStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Dialog(DialogPlacement),
    Popup(PopupPlacement),
    Notification,
}

/// One open dialog, popup or notification.
#[derive(Debug, Clone)]
pub struct OverlayNode {
    pub(crate) id: OverlayId,
    pub(crate) kind: OverlayKind,
    pub(crate) context: OwnerId,
    pub(crate) modality: Modality,
    pub(crate) closable: bool,
    pub(crate) resizable: bool,
    pub(crate) preferred: OverlaySize,
    pub(crate) size: OverlaySize,
    pub(crate) constraints: SizeConstraints,
    pub(crate) placement: Placement,
    pub(crate) bounds: Option<FloatRect>,
    pub(crate) state: LifecycleState,
    pub(crate) stack_index: usize,
    pub(crate) seq: u64,
    pub(crate) label: String,
    pub(crate) focusables: Vec<ElementId>,
}

impl OverlayNode {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    pub fn context(&self) -> OwnerId {
        self.context
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn closable(&self) -> bool {
        self.closable
    }

    pub fn resizable(&self) -> bool {
        self.resizable
    }

    pub fn size(&self) -> OverlaySize {
        self.size
    }

    pub fn constraints(&self) -> SizeConstraints {
        self.constraints
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn bounds(&self) -> Option<FloatRect> {
        self.bounds
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn stack_index(&self) -> usize {
        self.stack_index
    }

    /// Creation order; strictly increasing across the registry.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn focusables(&self) -> &[ElementId] {
        &self.focusables
    }

    pub fn is_application_blocking(&self) -> bool {
        self.modality == Modality::ApplicationBlocking
    }

    /// The owner this node's stack is ordered against. Non-blocking overlays
    /// form a stack of their own.
    pub fn blocking_root(&self) -> OwnerId {
        match self.modality {
            Modality::None => OwnerId::Overlay(self.id),
            _ => self.context,
        }
    }

    pub fn popup(&self) -> Option<&PopupPlacement> {
        match &self.placement {
            Placement::Popup(p) => Some(p),
            _ => None,
        }
    }
}

/// Everything needed to register a node, independent of its kind.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub kind: OverlayKind,
    pub context: OwnerId,
    pub modality: Modality,
    pub closable: bool,
    pub resizable: bool,
    pub size: OverlaySize,
    pub constraints: SizeConstraints,
    pub placement: Placement,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct DialogOptions {
    pub context: Option<OwnerId>,
    pub modality: Modality,
    pub constraints: SizeConstraints,
    pub closable: Option<bool>,
    pub resizable: Option<bool>,
    pub size: Option<OverlaySize>,
    pub label: String,
}

impl DialogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, context: impl Into<OwnerId>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn constraints(mut self, constraints: SizeConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn closable(mut self, closable: bool) -> Self {
        self.closable = Some(closable);
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = Some(resizable);
        self
    }

    pub fn size(mut self, width: u16, height: u16) -> Self {
        self.size = Some(OverlaySize::new(width, height));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct PopupOptions {
    pub context: Option<OwnerId>,
    pub anchor: PopupAnchor,
    pub align: Align,
    pub close_strategy: CloseStrategy,
    pub constraints: SizeConstraints,
    pub size: Option<OverlaySize>,
    pub label: String,
}

impl PopupOptions {
    pub fn new(anchor: PopupAnchor) -> Self {
        Self {
            context: None,
            anchor,
            align: Align::default(),
            close_strategy: CloseStrategy::default(),
            constraints: SizeConstraints::default(),
            size: None,
            label: String::new(),
        }
    }

    pub fn context(mut self, context: impl Into<OwnerId>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn close_strategy(mut self, on_escape: bool, on_focus_lost: bool) -> Self {
        self.close_strategy = CloseStrategy {
            on_escape,
            on_focus_lost,
        };
        self
    }

    pub fn constraints(mut self, constraints: SizeConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn size(mut self, width: u16, height: u16) -> Self {
        self.size = Some(OverlaySize::new(width, height));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    pub size: Option<OverlaySize>,
    pub label: String,
}

impl NotificationOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            size: None,
            label: label.into(),
        }
    }

    pub fn size(mut self, width: u16, height: u16) -> Self {
        self.size = Some(OverlaySize::new(width, height));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_wins_over_conflicting_max() {
        let c = SizeConstraints::default().width(Some(500), Some(400));
        assert_eq!(c.clamp_width(100), 500);
        assert_eq!(c.clamp_width(450), 500);
        assert_eq!(c.clamp_width(9000), 500);
    }

    #[test]
    fn clamp_respects_bounds_and_floor() {
        let c = SizeConstraints::default().height(Some(3), Some(10));
        assert_eq!(c.clamp_height(1), 3);
        assert_eq!(c.clamp_height(12), 10);
        assert_eq!(SizeConstraints::default().clamp_height(-4), 1);
    }

    #[test]
    fn lifecycle_is_monotonic_except_hidden_attached() {
        use LifecycleState::*;
        assert!(Attached.can_transition_to(Hidden));
        assert!(Hidden.can_transition_to(Attached));
        assert!(!Attached.can_transition_to(Queued));
        assert!(!Closed.can_transition_to(Attached));
        assert!(Queued.can_transition_to(Closed));
    }

    #[test]
    fn opposite_alignment_swaps_axis_side() {
        assert_eq!(Align::East.opposite(), Align::West);
        assert_eq!(Align::North.opposite(), Align::South);
        assert!(Align::North.is_vertical());
        assert!(!Align::West.is_vertical());
    }
}
