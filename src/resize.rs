use crate::constants::DIALOG_HEADER_HEIGHT;
use crate::geometry::FloatRect;
use crate::overlay::{OverlayId, SizeConstraints};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeEdge {
    fn drags_left(self) -> bool {
        matches!(
            self,
            ResizeEdge::Left | ResizeEdge::TopLeft | ResizeEdge::BottomLeft
        )
    }

    fn drags_right(self) -> bool {
        matches!(
            self,
            ResizeEdge::Right | ResizeEdge::TopRight | ResizeEdge::BottomRight
        )
    }

    fn drags_top(self) -> bool {
        matches!(
            self,
            ResizeEdge::Top | ResizeEdge::TopLeft | ResizeEdge::TopRight
        )
    }

    fn drags_bottom(self) -> bool {
        matches!(
            self,
            ResizeEdge::Bottom | ResizeEdge::BottomLeft | ResizeEdge::BottomRight
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeHandle {
    pub id: OverlayId,
    pub rect: FloatRect,
    pub edge: ResizeEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragHandle {
    pub id: OverlayId,
    pub rect: FloatRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeDrag {
    pub id: OverlayId,
    pub edge: ResizeEdge,
    pub start: FloatRect,
    pub start_col: u16,
    pub start_row: u16,
    pub constraints: SizeConstraints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveDrag {
    pub id: OverlayId,
    pub start: FloatRect,
    pub start_col: u16,
    pub start_row: u16,
}

/// An in-progress pointer drag. Only the box returned on release is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Resize(ResizeDrag),
    Move(MoveDrag),
}

impl DragState {
    pub fn id(&self) -> OverlayId {
        match self {
            DragState::Resize(drag) => drag.id,
            DragState::Move(drag) => drag.id,
        }
    }

    /// Box for the pointer at (`column`, `row`).
    pub fn update(&self, column: u16, row: u16) -> FloatRect {
        match self {
            DragState::Resize(drag) => apply_resize_drag(
                drag.start,
                drag.edge,
                column,
                row,
                drag.start_col,
                drag.start_row,
                &drag.constraints,
            ),
            DragState::Move(drag) => drag.start.translate(
                column as i32 - drag.start_col as i32,
                row as i32 - drag.start_row as i32,
            ),
        }
    }
}

/// Smallest box a drag may shrink an unconstrained overlay to.
pub const DRAG_MIN_WIDTH: u16 = 6;
pub const DRAG_MIN_HEIGHT: u16 = 3;

/// Eight handles on the border: one cell per corner, the rest of each side
/// for the edges.
pub fn resize_handles_for(id: OverlayId, rect: FloatRect) -> Vec<ResizeHandle> {
    let mut handles = Vec::new();
    if rect.is_empty() {
        return handles;
    }
    let right = rect.right() - 1;
    let bottom = rect.bottom() - 1;
    let corner = |x: i32, y: i32, edge: ResizeEdge| ResizeHandle {
        id,
        rect: FloatRect::new(x, y, 1, 1),
        edge,
    };
    handles.push(corner(rect.x, rect.y, ResizeEdge::TopLeft));
    handles.push(corner(right, rect.y, ResizeEdge::TopRight));
    handles.push(corner(rect.x, bottom, ResizeEdge::BottomLeft));
    handles.push(corner(right, bottom, ResizeEdge::BottomRight));
    if rect.width > 2 {
        let inner = rect.width - 2;
        handles.push(ResizeHandle {
            id,
            rect: FloatRect::new(rect.x + 1, rect.y, inner, 1),
            edge: ResizeEdge::Top,
        });
        handles.push(ResizeHandle {
            id,
            rect: FloatRect::new(rect.x + 1, bottom, inner, 1),
            edge: ResizeEdge::Bottom,
        });
    }
    if rect.height > 2 {
        let inner = rect.height - 2;
        handles.push(ResizeHandle {
            id,
            rect: FloatRect::new(rect.x, rect.y + 1, 1, inner),
            edge: ResizeEdge::Left,
        });
        handles.push(ResizeHandle {
            id,
            rect: FloatRect::new(right, rect.y + 1, 1, inner),
            edge: ResizeEdge::Right,
        });
    }
    handles
}

/// Title row just inside the top border; dragging it moves the dialog.
pub fn header_handle_for(id: OverlayId, rect: FloatRect) -> Option<DragHandle> {
    if rect.width < 3 || rect.height < 3 {
        return None;
    }
    Some(DragHandle {
        id,
        rect: FloatRect::new(
            rect.x + 1,
            rect.y + DIALOG_HEADER_HEIGHT as i32,
            rect.width - 2,
            1,
        ),
    })
}

/// Fill in the drag minimums for dimensions the caller left unconstrained.
pub fn drag_constraints(constraints: SizeConstraints) -> SizeConstraints {
    let floor = |min: Option<u16>, max: Option<u16>, default: u16| {
        min.or(Some(max.map_or(default, |max| max.min(default))))
    };
    SizeConstraints {
        min_width: floor(constraints.min_width, constraints.max_width, DRAG_MIN_WIDTH),
        min_height: floor(constraints.min_height, constraints.max_height, DRAG_MIN_HEIGHT),
        ..constraints
    }
}

/// Box produced by dragging `edge` from (`start_col`, `start_row`) to
/// (`column`, `row`).
///
/// Width and height are clamped to `constraints` (min over max on conflict).
/// The left and top edges move by the clamped delta so the opposite edge
/// never shifts.
pub fn apply_resize_drag(
    start: FloatRect,
    edge: ResizeEdge,
    column: u16,
    row: u16,
    start_col: u16,
    start_row: u16,
    constraints: &SizeConstraints,
) -> FloatRect {
    let dx = column as i32 - start_col as i32;
    let dy = row as i32 - start_row as i32;
    let mut width = start.width as i32;
    let mut height = start.height as i32;

    if edge.drags_left() {
        width -= dx;
    } else if edge.drags_right() {
        width += dx;
    }
    if edge.drags_top() {
        height -= dy;
    } else if edge.drags_bottom() {
        height += dy;
    }

    let width = if edge.drags_left() || edge.drags_right() {
        constraints.clamp_width(width)
    } else {
        start.width
    };
    let height = if edge.drags_top() || edge.drags_bottom() {
        constraints.clamp_height(height)
    } else {
        start.height
    };

    let x = if edge.drags_left() {
        start.right() - width as i32
    } else {
        start.x
    };
    let y = if edge.drags_top() {
        start.bottom() - height as i32
    } else {
        start.y
    };

    FloatRect {
        x,
        y,
        width,
        height,
    }
}
