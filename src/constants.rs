//! Shared crate-wide constants.

/// Offset applied to each successive dialog in a stack, in cells
/// (columns, rows). The column step is doubled to look diagonal on screen.
pub const CASCADE_OFFSET: (i32, i32) = (2, 1);

/// Size of a dialog opened without an explicit size.
pub const DEFAULT_DIALOG_SIZE: (u16, u16) = (48, 10);

/// Size of a popup opened without an explicit size.
pub const DEFAULT_POPUP_SIZE: (u16, u16) = (24, 6);

/// Size of a notification opened without an explicit size.
pub const DEFAULT_NOTIFICATION_SIZE: (u16, u16) = (32, 3);

/// Rows left between stacked notifications.
pub const NOTIFICATION_GAP: u16 = 1;

/// Row of the draggable title strip, counted from a dialog's top border.
pub const DIALOG_HEADER_HEIGHT: u16 = 1;
