use crate::constants::{
    CASCADE_OFFSET, DEFAULT_DIALOG_SIZE, DEFAULT_NOTIFICATION_SIZE, DEFAULT_POPUP_SIZE,
    NOTIFICATION_GAP,
};
use crate::overlay::OverlaySize;

/// What an application-blocking overlay dims on top of the views and parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalScope {
    /// The whole application (the root's bounding box).
    #[default]
    Workbench,
    /// Only the visible viewport.
    Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub modal_scope: ModalScope,
    pub cascade_offset: (i32, i32),
    pub default_dialog_size: OverlaySize,
    pub default_popup_size: OverlaySize,
    pub notification_size: OverlaySize,
    pub notification_gap: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            modal_scope: ModalScope::default(),
            cascade_offset: CASCADE_OFFSET,
            default_dialog_size: OverlaySize::new(DEFAULT_DIALOG_SIZE.0, DEFAULT_DIALOG_SIZE.1),
            default_popup_size: OverlaySize::new(DEFAULT_POPUP_SIZE.0, DEFAULT_POPUP_SIZE.1),
            notification_size: OverlaySize::new(
                DEFAULT_NOTIFICATION_SIZE.0,
                DEFAULT_NOTIFICATION_SIZE.1,
            ),
            notification_gap: NOTIFICATION_GAP,
        }
    }
}
