use thiserror::Error;

use crate::overlay::OverlayId;
use crate::owner::OwnerKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// The requested context is not a live owner. Nothing was registered.
    #[error("{kind} context `{id}` does not resolve to a live owner")]
    NullContext { kind: OwnerKind, id: String },
    /// An internal invariant was violated while handling one overlay.
    #[error("illegal overlay state: {0}")]
    IllegalState(String),
    #[error("{0} is not open")]
    UnknownOverlay(OverlayId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_context_message_names_kind_and_id() {
        let err = OverlayError::NullContext {
            kind: OwnerKind::Part,
            id: "12".into(),
        };
        assert_eq!(
            err.to_string(),
            "part context `12` does not resolve to a live owner"
        );
    }
}
