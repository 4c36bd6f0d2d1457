//! Signed rectangles for overlay bounds and glass panes.
//!
//! Owner boxes reported by the layout are on-screen `ratatui` rects. Overlay
//! bounds are signed because a dragged dialog (or a dialog larger than its
//! context) may extend past the top-left edge of the screen.

use ratatui::prelude::Rect;

/// Signed rectangle origin with unsigned size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FloatRect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl FloatRect {
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.x + self.width as i32 / 2,
            self.y + self.height as i32 / 2,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, column: i32, row: i32) -> bool {
        if self.is_empty() {
            return false;
        }
        column >= self.x && column < self.right() && row >= self.y && row < self.bottom()
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Clip to the visible portion inside `bounds`; empty when disjoint.
    pub fn visible_in(&self, bounds: Rect) -> Rect {
        let bx0 = bounds.x as i32;
        let by0 = bounds.y as i32;
        let bx1 = bx0 + bounds.width as i32;
        let by1 = by0 + bounds.height as i32;
        let x0 = self.x.max(bx0);
        let y0 = self.y.max(by0);
        let x1 = self.right().min(bx1);
        let y1 = self.bottom().min(by1);
        if x1 <= x0 || y1 <= y0 {
            return Rect::default();
        }
        Rect {
            x: x0 as u16,
            y: y0 as u16,
            width: (x1 - x0) as u16,
            height: (y1 - y0) as u16,
        }
    }
}

impl From<Rect> for FloatRect {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x as i32,
            y: rect.y as i32,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// Position `len` along one axis so that it stays inside `[start, start + span)`.
///
/// When `len` exceeds `span` the leading edge wins, keeping the overlay's
/// origin (and thus its title/chrome) visible.
pub fn clamp_axis(pos: i32, len: u16, start: i32, span: u16) -> i32 {
    let max = start + span as i32 - len as i32;
    if max < start {
        return start;
    }
    pos.clamp(start, max)
}

/// Clamp `rect`'s origin so it lies inside `bounds` without shrinking it.
pub fn clamp_within(rect: FloatRect, bounds: FloatRect) -> FloatRect {
    FloatRect {
        x: clamp_axis(rect.x, rect.width, bounds.x, bounds.width),
        y: clamp_axis(rect.y, rect.height, bounds.y, bounds.height),
        ..rect
    }
}

/// Push `rect` into `out` unless an equal rectangle is already present.
pub fn push_unique(out: &mut Vec<FloatRect>, rect: FloatRect) {
    if !out.contains(&rect) {
        out.push(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_in_clips_negative_offsets() {
        let bounds = Rect {
            x: 0,
            y: 0,
            width: 10,
            height: 5,
        };
        let rect = FloatRect::new(-3, -1, 6, 3);
        assert_eq!(
            rect.visible_in(bounds),
            Rect {
                x: 0,
                y: 0,
                width: 3,
                height: 2
            }
        );
        assert_eq!(
            FloatRect::new(20, 20, 2, 2).visible_in(bounds),
            Rect::default()
        );
    }

    #[test]
    fn clamp_axis_prefers_leading_edge_when_too_large() {
        assert_eq!(clamp_axis(50, 10, 0, 40), 30);
        assert_eq!(clamp_axis(-5, 10, 0, 40), 0);
        assert_eq!(clamp_axis(7, 60, 0, 40), 0);
    }

    #[test]
    fn contains_excludes_far_edges_and_empty_rects() {
        let r = FloatRect::new(1, 1, 3, 3);
        assert!(r.contains(1, 1));
        assert!(!r.contains(4, 1));
        assert!(!FloatRect::new(0, 0, 0, 3).contains(0, 0));
    }

    #[test]
    fn push_unique_dedups_by_equality() {
        let mut out = Vec::new();
        push_unique(&mut out, FloatRect::new(0, 0, 4, 4));
        push_unique(&mut out, FloatRect::new(0, 0, 4, 4));
        push_unique(&mut out, FloatRect::new(1, 0, 4, 4));
        assert_eq!(out.len(), 2);
    }
}
