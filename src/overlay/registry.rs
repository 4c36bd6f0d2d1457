use std::collections::BTreeMap;

use super::{LifecycleState, NodeSpec, OverlayId, OverlayNode};
use crate::error::OverlayError;
use crate::oracle::GeometryOracle;
use crate::owner::OwnerId;

/// Bookkeeping notifications, drained by the engine after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    Created {
        id: OverlayId,
        state: LifecycleState,
    },
    StateChanged {
        id: OverlayId,
        from: LifecycleState,
        to: LifecycleState,
    },
    Destroyed(OverlayId),
}

/// Single source of truth for every live overlay node.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    nodes: BTreeMap<OverlayId, OverlayNode>,
    next_id: u64,
    next_seq: u64,
    // drained by the engine via `take_changes`
    changes: Vec<RegistryChange>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Register a node in `state`. Fails without touching the registry when
    /// the context does not resolve to a live owner.
    pub fn create<G: GeometryOracle>(
        &mut self,
        spec: NodeSpec,
        state: LifecycleState,
        oracle: &G,
    ) -> Result<OverlayId, OverlayError> {
        self.ensure_resolves(spec.context, oracle)?;
        let id = OverlayId::new(self.next_id.max(1));
        self.next_id = id.raw() + 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        let size = spec.constraints.clamp(spec.size);
        self.nodes.insert(
            id,
            OverlayNode {
                id,
                kind: spec.kind,
                context: spec.context,
                modality: spec.modality,
                closable: spec.closable,
                resizable: spec.resizable,
                preferred: spec.size,
                size,
                constraints: spec.constraints,
                placement: spec.placement,
                bounds: None,
                state,
                stack_index: 0,
                seq,
                label: spec.label,
                focusables: Vec::new(),
            },
        );
        self.changes.push(RegistryChange::Created { id, state });
        tracing::debug!(overlay = %id, context = %spec.context, %state, "registered overlay");
        Ok(id)
    }

    pub fn ensure_resolves<G: GeometryOracle>(
        &self,
        owner: OwnerId,
        oracle: &G,
    ) -> Result<(), OverlayError> {
        if self.resolves(owner, oracle) {
            Ok(())
        } else {
            Err(OverlayError::NullContext {
                kind: owner.kind(),
                id: owner.raw_id(),
            })
        }
    }

    pub fn resolves<G: GeometryOracle>(&self, owner: OwnerId, oracle: &G) -> bool {
        match owner {
            OwnerId::Root => true,
            OwnerId::View(_) | OwnerId::Part(_) => oracle.is_live(owner),
            OwnerId::Overlay(id) => self.contains(id),
        }
    }

    /// Remove a node for good, marking it closed.
    pub fn destroy(&mut self, id: OverlayId) -> Option<OverlayNode> {
        let mut node = self.nodes.remove(&id)?;
        if node.state != LifecycleState::Closed {
            self.changes.push(RegistryChange::StateChanged {
                id,
                from: node.state,
                to: LifecycleState::Closed,
            });
            node.state = LifecycleState::Closed;
        }
        self.changes.push(RegistryChange::Destroyed(id));
        Some(node)
    }

    pub fn get(&self, id: OverlayId) -> Option<&OverlayNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: OverlayId) -> Option<&mut OverlayNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn require(&self, id: OverlayId) -> Result<&OverlayNode, OverlayError> {
        self.nodes.get(&id).ok_or(OverlayError::UnknownOverlay(id))
    }

    pub(crate) fn require_mut(&mut self, id: OverlayId) -> Result<&mut OverlayNode, OverlayError> {
        self.nodes
            .get_mut(&id)
            .ok_or(OverlayError::UnknownOverlay(id))
    }

    pub fn contains(&self, id: OverlayId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes matching `predicate`, in creation order.
    pub fn list<F>(&self, predicate: F) -> Vec<&OverlayNode>
    where
        F: Fn(&OverlayNode) -> bool,
    {
        let mut out: Vec<&OverlayNode> = self.nodes.values().filter(|n| predicate(n)).collect();
        out.sort_by_key(|n| n.seq);
        out
    }

    pub fn ids_where<F>(&self, predicate: F) -> Vec<OverlayId>
    where
        F: Fn(&OverlayNode) -> bool,
    {
        self.list(predicate).into_iter().map(|n| n.id).collect()
    }

    /// Update a node's lifecycle state, rejecting backwards transitions.
    pub(crate) fn set_state(
        &mut self,
        id: OverlayId,
        next: LifecycleState,
    ) -> Result<LifecycleState, OverlayError> {
        let node = self.require_mut(id)?;
        let prev = node.state;
        if prev == next {
            return Ok(prev);
        }
        if !prev.can_transition_to(next) {
            return Err(OverlayError::IllegalState(format!(
                "{id} cannot move from {prev} to {next}"
            )));
        }
        node.state = next;
        self.changes.push(RegistryChange::StateChanged {
            id,
            from: prev,
            to: next,
        });
        Ok(prev)
    }

    /// Owners reached by following context pointers from `start`, `start`
    /// included, stopping at the first view/part or at the root.
    pub fn chain_from(&self, start: OwnerId) -> Vec<OwnerId> {
        let mut chain = Vec::new();
        let mut current = start;
        // Contexts always predate their overlays, so the walk is bounded by
        // the node count; the guard only protects against corrupted state.
        for _ in 0..=self.nodes.len() {
            chain.push(current);
            match current {
                OwnerId::Overlay(id) => match self.nodes.get(&id) {
                    Some(node) => current = node.context,
                    None => break,
                },
                _ => break,
            }
        }
        chain
    }

    /// Context chain of an overlay, excluding the overlay itself.
    pub fn context_chain(&self, id: OverlayId) -> Vec<OwnerId> {
        match self.nodes.get(&id) {
            Some(node) => self.chain_from(node.context),
            None => Vec::new(),
        }
    }

    /// Whether `owner` appears (transitively) in `id`'s context chain.
    pub fn is_descendant_context(&self, id: OverlayId, owner: OwnerId) -> bool {
        self.context_chain(id).contains(&owner)
    }

    /// Every node whose context chain contains `owner`, in creation order.
    pub fn descendants_of(&self, owner: OwnerId) -> Vec<OverlayId> {
        self.ids_where(|n| self.is_descendant_context(n.id, owner))
    }

    pub fn take_changes(&mut self) -> Vec<RegistryChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::LayoutOracle;
    use crate::overlay::{
        DialogPlacement, Modality, OverlayKind, OverlaySize, Placement, SizeConstraints,
    };
    use crate::owner::{Area, OwnerKind, ViewId};
    use ratatui::prelude::Rect;

    fn spec(context: OwnerId) -> NodeSpec {
        NodeSpec {
            kind: OverlayKind::Dialog,
            context,
            modality: Modality::ContextBlocking,
            closable: true,
            resizable: true,
            size: OverlaySize::new(10, 4),
            constraints: SizeConstraints::default(),
            placement: Placement::Dialog(DialogPlacement::default()),
            label: String::new(),
        }
    }

    fn oracle() -> LayoutOracle {
        let mut oracle = LayoutOracle::new(Rect {
            x: 0,
            y: 0,
            width: 80,
            height: 24,
        });
        oracle.insert_view(
            ViewId(1),
            Rect {
                x: 0,
                y: 0,
                width: 40,
                height: 24,
            },
            Area::Main,
        );
        oracle
    }

    #[test]
    fn unresolved_context_creates_nothing() {
        let oracle = oracle();
        let mut reg = OverlayRegistry::new();
        let err = reg
            .create(
                spec(OwnerId::View(ViewId(9))),
                LifecycleState::Attached,
                &oracle,
            )
            .unwrap_err();
        assert_eq!(
            err,
            OverlayError::NullContext {
                kind: OwnerKind::View,
                id: "9".into()
            }
        );
        assert!(reg.is_empty());
        assert!(reg.take_changes().is_empty());
    }

    #[test]
    fn chain_stops_at_first_layout_owner() {
        let oracle = oracle();
        let mut reg = OverlayRegistry::new();
        let view = OwnerId::View(ViewId(1));
        let d1 = reg
            .create(spec(view), LifecycleState::Attached, &oracle)
            .unwrap();
        let d2 = reg
            .create(spec(d1.into()), LifecycleState::Attached, &oracle)
            .unwrap();
        assert_eq!(reg.context_chain(d2), vec![OwnerId::Overlay(d1), view]);
        assert!(reg.is_descendant_context(d2, view));
        assert!(!reg.is_descendant_context(d1, d2.into()));
        assert_eq!(reg.descendants_of(view), vec![d1, d2]);
        assert_eq!(reg.descendants_of(d1.into()), vec![d2]);
    }

    #[test]
    fn set_state_rejects_backwards_transition() {
        let oracle = oracle();
        let mut reg = OverlayRegistry::new();
        let id = reg
            .create(spec(OwnerId::Root), LifecycleState::Attached, &oracle)
            .unwrap();
        assert!(reg.set_state(id, LifecycleState::Queued).is_err());
        assert_eq!(
            reg.set_state(id, LifecycleState::Hidden).unwrap(),
            LifecycleState::Attached
        );
    }

    #[test]
    fn destroy_records_closed_transition() {
        let oracle = oracle();
        let mut reg = OverlayRegistry::new();
        let id = reg
            .create(spec(OwnerId::Root), LifecycleState::Queued, &oracle)
            .unwrap();
        reg.take_changes();
        let node = reg.destroy(id).unwrap();
        assert_eq!(node.state(), LifecycleState::Closed);
        assert_eq!(
            reg.take_changes(),
            vec![
                RegistryChange::StateChanged {
                    id,
                    from: LifecycleState::Queued,
                    to: LifecycleState::Closed
                },
                RegistryChange::Destroyed(id)
            ]
        );
    }
}
