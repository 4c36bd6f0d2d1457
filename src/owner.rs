//! Identities of everything an overlay can be anchored to or block.

use std::fmt;

use crate::overlay::OverlayId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(pub u32);

/// A focusable or anchorable element rendered inside some owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u32);

/// Anything that can host an overlay or be blocked by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerId {
    Root,
    View(ViewId),
    Part(PartId),
    Overlay(OverlayId),
}

impl OwnerId {
    pub fn kind(self) -> OwnerKind {
        match self {
            OwnerId::Root => OwnerKind::Root,
            OwnerId::View(_) => OwnerKind::View,
            OwnerId::Part(_) => OwnerKind::Part,
            OwnerId::Overlay(_) => OwnerKind::Overlay,
        }
    }

    /// Views and parts are the layout-level owners that terminate a context chain.
    pub fn is_layout(self) -> bool {
        matches!(self, OwnerId::View(_) | OwnerId::Part(_))
    }

    pub fn as_overlay(self) -> Option<OverlayId> {
        match self {
            OwnerId::Overlay(id) => Some(id),
            _ => None,
        }
    }

    /// Raw identifier without the kind prefix, as carried by context errors.
    pub fn raw_id(self) -> String {
        match self {
            OwnerId::Root => "root".to_string(),
            OwnerId::View(ViewId(id)) => id.to_string(),
            OwnerId::Part(PartId(id)) => id.to_string(),
            OwnerId::Overlay(id) => id.raw().to_string(),
        }
    }
}

impl From<ViewId> for OwnerId {
    fn from(id: ViewId) -> Self {
        OwnerId::View(id)
    }
}

impl From<PartId> for OwnerId {
    fn from(id: PartId) -> Self {
        OwnerId::Part(id)
    }
}

impl From<OverlayId> for OwnerId {
    fn from(id: OverlayId) -> Self {
        OwnerId::Overlay(id)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerId::Root => write!(f, "root"),
            _ => write!(f, "{}:{}", self.kind(), self.raw_id()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerKind {
    Root,
    View,
    Part,
    Overlay,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OwnerKind::Root => "root",
            OwnerKind::View => "view",
            OwnerKind::Part => "part",
            OwnerKind::Overlay => "overlay",
        };
        write!(f, "{}", s)
    }
}

/// Which area of the shell a view or part lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Area {
    #[default]
    Main,
    Peripheral,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_raw_id() {
        assert_eq!(OwnerId::View(ViewId(3)).to_string(), "view:3");
        assert_eq!(OwnerId::Part(PartId(7)).to_string(), "part:7");
        assert_eq!(OwnerId::Root.to_string(), "root");
        assert_eq!(OwnerId::View(ViewId(3)).raw_id(), "3");
    }

    #[test]
    fn only_views_and_parts_are_layout_owners() {
        assert!(OwnerId::View(ViewId(1)).is_layout());
        assert!(OwnerId::Part(PartId(1)).is_layout());
        assert!(!OwnerId::Root.is_layout());
    }
}
