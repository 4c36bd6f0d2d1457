pub mod config;
pub mod constants;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod event_loop;
pub mod focus;
pub mod geometry;
pub mod keybindings;
pub mod log_buffer;
pub mod modality;
pub mod oracle;
pub mod overlay;
pub mod owner;
pub mod positioning;
pub mod resize;
pub mod shell;
pub mod tracing_sub;

pub use config::{EngineConfig, ModalScope};
pub use engine::{EngineEvent, OverlayDraw, OverlayEngine};
pub use error::OverlayError;
pub use focus::FocusTarget;
pub use geometry::FloatRect;
pub use oracle::{GeometryOracle, LayoutOracle, OwnerEvent, Region};
pub use overlay::{
    Align, DialogOptions, LifecycleState, Modality, NotificationOptions, OverlayHandle,
    OverlayId, OverlayKind, OverlayOutcome, PopupAnchor, PopupOptions, SizeConstraints,
};
pub use owner::{Area, ElementId, OwnerId, PartId, ViewId};
