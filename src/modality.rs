//! Modality and blocking: lifecycle transitions, the application-modal queue,
//! per-root stacks, and glass-pane computation.
//!
//! The controller owns each node's `state` and `stack_index`. Everything else
//! it only reads.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ModalScope;
use crate::error::OverlayError;
use crate::geometry::{FloatRect, push_unique};
use crate::oracle::{GeometryOracle, Region};
use crate::overlay::{LifecycleState, Modality, OverlayId, OverlayNode, OverlayRegistry};
use crate::owner::{Area, OwnerId};

/// Bound on parent lookups through the oracle, in case a host reports a cycle.
const MAX_PARENT_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub id: OverlayId,
    pub from: LifecycleState,
    pub to: LifecycleState,
}

#[derive(Debug, Default)]
pub struct BlockingController {
    scope: ModalScope,
    inactive: BTreeSet<OwnerId>,
    detached: BTreeSet<OwnerId>,
    /// Application-blocking overlays released straight into `Hidden`. Each
    /// keeps the other queued application-blocking overlays waiting until
    /// it attaches or closes.
    held: BTreeSet<OverlayId>,
}

impl BlockingController {
    pub fn new(scope: ModalScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    pub fn scope(&self) -> ModalScope {
        self.scope
    }

    pub fn set_scope(&mut self, scope: ModalScope) {
        self.scope = scope;
    }

    /// Record an activation signal. Returns whether anything changed.
    pub fn set_active(&mut self, owner: OwnerId, active: bool) -> bool {
        if active {
            self.inactive.remove(&owner)
        } else {
            self.inactive.insert(owner)
        }
    }

    /// Record an attach/detach signal. Returns whether anything changed.
    pub fn set_attached(&mut self, owner: OwnerId, attached: bool) -> bool {
        if attached {
            self.detached.remove(&owner)
        } else {
            self.detached.insert(owner)
        }
    }

    pub fn forget_owner(&mut self, owner: OwnerId) {
        self.inactive.remove(&owner);
        self.detached.remove(&owner);
    }

    /// Context chain extended with the layout parents of its final view/part.
    pub fn activity_chain<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        start: OwnerId,
    ) -> Vec<OwnerId> {
        let mut chain = registry.chain_from(start);
        let mut last = chain.last().copied();
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(parent) = last.and_then(|owner| oracle.parent_of(owner)) else {
                break;
            };
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            last = Some(parent);
        }
        chain
    }

    /// Whether everything `context` depends on is active and attached.
    pub fn context_showing<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        context: OwnerId,
    ) -> bool {
        !self
            .activity_chain(registry, oracle, context)
            .iter()
            .any(|owner| self.inactive.contains(owner) || self.detached.contains(owner))
    }

    /// Attached application-blocking overlays that do not sit in `chain`,
    /// i.e. ones a new overlay with this chain would have to wait behind.
    fn queue_blockers(&self, registry: &OverlayRegistry, chain: &[OwnerId]) -> Vec<OverlayId> {
        registry.ids_where(|n| {
            n.state == LifecycleState::Attached
                && n.is_application_blocking()
                && !chain.contains(&OwnerId::Overlay(n.id))
        })
    }

    fn chain_has_queued(&self, registry: &OverlayRegistry, chain: &[OwnerId]) -> bool {
        chain.iter().any(|owner| {
            owner
                .as_overlay()
                .and_then(|id| registry.get(id))
                .is_some_and(|n| n.state == LifecycleState::Queued)
        })
    }

    /// Decide the initial state of an overlay about to be opened on `context`.
    pub fn entry_state<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        context: OwnerId,
    ) -> LifecycleState {
        let chain = registry.chain_from(context);
        if !self.queue_blockers(registry, &chain).is_empty()
            || self.chain_has_queued(registry, &chain)
        {
            return LifecycleState::Queued;
        }
        if self.context_showing(registry, oracle, context) {
            LifecycleState::Attached
        } else {
            LifecycleState::Hidden
        }
    }

    pub fn any_application_blocking_attached(&self, registry: &OverlayRegistry) -> bool {
        !registry
            .list(|n| n.state == LifecycleState::Attached && n.is_application_blocking())
            .is_empty()
    }

    fn transition(
        &self,
        registry: &mut OverlayRegistry,
        id: OverlayId,
        to: LifecycleState,
    ) -> Result<Transition, OverlayError> {
        let from = registry
            .set_state(id, to)
            .inspect_err(|err| tracing::error!(%err, "rejected lifecycle transition"))?;
        Ok(Transition { id, from, to })
    }

    fn release_one<G: GeometryOracle>(
        &self,
        registry: &mut OverlayRegistry,
        oracle: &G,
        id: OverlayId,
    ) -> Result<Transition, OverlayError> {
        let context = registry.require(id)?.context;
        let to = if self.context_showing(registry, oracle, context) {
            LifecycleState::Attached
        } else {
            LifecycleState::Hidden
        };
        let transition = self.transition(registry, id, to)?;
        tracing::debug!(overlay = %id, state = %to, "released queued overlay");
        Ok(transition)
    }

    /// Move queued overlays out of the queue once nothing holds them back.
    ///
    /// Application-blocking overlays leave the queue one at a time, oldest
    /// first, and only while no other one is attached or held. Every other
    /// queued overlay is released as soon as no attached
    /// application-blocking overlay stands in its way.
    pub fn release_queued<G: GeometryOracle>(
        &mut self,
        registry: &mut OverlayRegistry,
        oracle: &G,
    ) -> Result<Vec<Transition>, OverlayError> {
        self.held.retain(|id| {
            registry
                .get(*id)
                .is_some_and(|n| n.state == LifecycleState::Hidden)
        });
        let mut out = Vec::new();
        loop {
            let queued = registry.ids_where(|n| n.state == LifecycleState::Queued);
            if queued.is_empty() {
                break;
            }
            if self.held.is_empty() && !self.any_application_blocking_attached(registry) {
                let next = queued.iter().copied().find(|id| {
                    registry.get(*id).is_some_and(|n| {
                        n.is_application_blocking()
                            && !self.chain_has_queued(registry, &registry.chain_from(n.context))
                    })
                });
                if let Some(id) = next {
                    let transition = self.release_one(registry, oracle, id)?;
                    if transition.to == LifecycleState::Hidden {
                        self.held.insert(id);
                    }
                    out.push(transition);
                    continue;
                }
            }
            let mut released = 0usize;
            // Parents are older than their children, so walking in creation
            // order releases a queued parent before its queued child is checked.
            for id in queued {
                let Some(node) = registry.get(id) else {
                    continue;
                };
                if node.is_application_blocking() {
                    continue;
                }
                let chain = registry.chain_from(node.context);
                if !self.queue_blockers(registry, &chain).is_empty()
                    || self.chain_has_queued(registry, &chain)
                {
                    continue;
                }
                out.push(self.release_one(registry, oracle, id)?);
                released += 1;
            }
            if released == 0 {
                break;
            }
        }
        Ok(out)
    }

    /// Reconcile `Attached`/`Hidden` with the current activation signals.
    ///
    /// Only the lifecycle state changes here; cached size and position are
    /// left untouched so a reattached overlay renders exactly as it was.
    pub fn sync_visibility<G: GeometryOracle>(
        &self,
        registry: &mut OverlayRegistry,
        oracle: &G,
    ) -> Result<Vec<Transition>, OverlayError> {
        let mut out = Vec::new();
        let candidates = registry.ids_where(|n| {
            matches!(n.state, LifecycleState::Attached | LifecycleState::Hidden)
        });
        for id in candidates {
            let Some(node) = registry.get(id) else {
                continue;
            };
            let showing = self.context_showing(registry, oracle, node.context);
            let next = match (node.state, showing) {
                (LifecycleState::Attached, false) => LifecycleState::Hidden,
                (LifecycleState::Hidden, true) => LifecycleState::Attached,
                _ => continue,
            };
            tracing::debug!(overlay = %id, state = %next, "context visibility changed");
            out.push(self.transition(registry, id, next)?);
        }
        Ok(out)
    }

    pub fn close(
        &mut self,
        registry: &mut OverlayRegistry,
        id: OverlayId,
    ) -> Result<(Transition, OverlayNode), OverlayError> {
        let from = registry.require(id)?.state;
        self.held.remove(&id);
        let node = registry
            .destroy(id)
            .ok_or(OverlayError::UnknownOverlay(id))?;
        Ok((
            Transition {
                id,
                from,
                to: LifecycleState::Closed,
            },
            node,
        ))
    }

    /// Reassign `stack_index` for every visible or hidden node, per blocking
    /// root, in creation order.
    pub fn restack(&self, registry: &mut OverlayRegistry) {
        let mut stacks: BTreeMap<OwnerId, Vec<OverlayId>> = BTreeMap::new();
        for node in registry.list(|n| in_stack(n)) {
            stacks.entry(node.blocking_root()).or_default().push(node.id);
        }
        for ids in stacks.values() {
            for (index, id) in ids.iter().enumerate() {
                if let Some(node) = registry.get_mut(*id) {
                    node.stack_index = index;
                }
            }
        }
    }

    /// Members of the stack ordered against `root`, bottom first.
    pub fn stack(&self, registry: &OverlayRegistry, root: OwnerId) -> Vec<OverlayId> {
        registry.ids_where(|n| in_stack(n) && n.blocking_root() == root)
    }

    /// The attached member with the highest stack index.
    pub fn stack_top(&self, registry: &OverlayRegistry, root: OwnerId) -> Option<OverlayId> {
        registry
            .list(|n| n.state == LifecycleState::Attached && n.blocking_root() == root)
            .into_iter()
            .max_by_key(|n| n.stack_index)
            .map(|n| n.id)
    }

    /// The stack member directly below `node`.
    fn below(&self, registry: &OverlayRegistry, node: &OverlayNode) -> Option<OverlayId> {
        let stack = self.stack(registry, node.blocking_root());
        let pos = stack.iter().position(|id| *id == node.id)?;
        pos.checked_sub(1).map(|p| stack[p])
    }

    fn peripheral_under_maximized<G: GeometryOracle>(oracle: &G, chain: &[OwnerId]) -> bool {
        chain.last().is_some_and(|owner| {
            owner.is_layout()
                && oracle.area_of(*owner) == Area::Peripheral
                && oracle.main_area_maximized()
        })
    }

    fn under_newer_application_modal(
        registry: &OverlayRegistry,
        id: OverlayId,
        blocker: &OverlayNode,
    ) -> bool {
        registry
            .chain_from(OwnerId::Overlay(id))
            .iter()
            .filter_map(|owner| owner.as_overlay().and_then(|id| registry.get(id)))
            .any(|n| n.is_application_blocking() && n.seq > blocker.seq)
    }

    /// Whether `blocker` blocks `owner`.
    pub fn blocks<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        blocker: &OverlayNode,
        owner: OwnerId,
    ) -> bool {
        if blocker.state != LifecycleState::Attached || blocker.modality == Modality::None {
            return false;
        }
        if owner == OwnerId::Overlay(blocker.id) {
            return false;
        }
        let chain = registry.context_chain(blocker.id);
        if chain.contains(&owner) {
            return true;
        }
        match blocker.modality {
            Modality::ContextBlocking => {
                if owner == OwnerId::Root && Self::peripheral_under_maximized(oracle, &chain) {
                    return true;
                }
            }
            Modality::ApplicationBlocking => match owner {
                OwnerId::Root | OwnerId::View(_) | OwnerId::Part(_) => return true,
                OwnerId::Overlay(other) => {
                    // Overlays opened from within the blocker stay usable, and
                    // so does anything under a newer application-blocking
                    // overlay: that one blocks this blocker instead.
                    if !registry.is_descendant_context(other, OwnerId::Overlay(blocker.id))
                        && !Self::under_newer_application_modal(registry, other, blocker)
                    {
                        return true;
                    }
                }
            },
            Modality::None => {}
        }
        matches!(owner, OwnerId::Overlay(other) if self.below(registry, blocker) == Some(other))
    }

    /// Every attached overlay currently blocking `owner`, in creation order.
    pub fn blockers_of<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        owner: OwnerId,
    ) -> Vec<OverlayId> {
        registry
            .list(|n| self.blocks(registry, oracle, n, owner))
            .into_iter()
            .map(|n| n.id)
            .collect()
    }

    pub fn is_blocked<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        owner: OwnerId,
    ) -> bool {
        registry
            .list(|n| n.state == LifecycleState::Attached)
            .into_iter()
            .any(|n| self.blocks(registry, oracle, n, owner))
    }

    /// Current box of any owner, overlays included.
    pub fn owner_box<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        owner: OwnerId,
        region: Region,
    ) -> Option<FloatRect> {
        match owner {
            OwnerId::Overlay(id) => registry.get(id).and_then(|n| n.bounds),
            _ => oracle.bounding_box(owner, region).map(FloatRect::from),
        }
    }

    fn scope_box<G: GeometryOracle>(&self, oracle: &G) -> Option<FloatRect> {
        match self.scope {
            ModalScope::Workbench => oracle
                .bounding_box(OwnerId::Root, Region::Full)
                .map(FloatRect::from),
            ModalScope::Viewport => Some(FloatRect::from(oracle.viewport())),
        }
    }

    /// Regions dimmed on behalf of `blocker`.
    pub fn glass_pane_of<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        blocker: &OverlayNode,
    ) -> Vec<FloatRect> {
        let mut out = Vec::new();
        if blocker.state != LifecycleState::Attached || blocker.modality == Modality::None {
            return out;
        }
        let lower = match self.below(registry, blocker) {
            Some(below) => self.owner_box(registry, oracle, OwnerId::Overlay(below), Region::Full),
            None if blocker.context == OwnerId::Root => self.scope_box(oracle),
            None => self.owner_box(registry, oracle, blocker.context, Region::Full),
        };
        if let Some(rect) = lower {
            push_unique(&mut out, rect);
        }
        match blocker.modality {
            Modality::ContextBlocking => {
                let chain = registry.context_chain(blocker.id);
                if Self::peripheral_under_maximized(oracle, &chain)
                    && let Some(root) = oracle.bounding_box(OwnerId::Root, Region::Full)
                {
                    push_unique(&mut out, root.into());
                }
            }
            Modality::ApplicationBlocking => {
                if let Some(scope) = self.scope_box(oracle) {
                    push_unique(&mut out, scope);
                }
                for owner in oracle.layout_owners() {
                    if let Some(rect) = oracle.bounding_box(owner, Region::Full) {
                        push_unique(&mut out, rect.into());
                    }
                }
            }
            Modality::None => {}
        }
        out
    }

    /// Union of the glass panes of every overlay blocking `owner`, one entry
    /// per distinct box.
    pub fn glass_panes_of<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        owner: OwnerId,
    ) -> Vec<FloatRect> {
        let mut out = Vec::new();
        for id in self.blockers_of(registry, oracle, owner) {
            if let Some(node) = registry.get(id) {
                for rect in self.glass_pane_of(registry, oracle, node) {
                    push_unique(&mut out, rect);
                }
            }
        }
        out
    }

    /// Attached, top of its stack, and not blocked by anything else.
    pub fn is_interactive<G: GeometryOracle>(
        &self,
        registry: &OverlayRegistry,
        oracle: &G,
        id: OverlayId,
    ) -> bool {
        let Some(node) = registry.get(id) else {
            return false;
        };
        node.state == LifecycleState::Attached
            && self.stack_top(registry, node.blocking_root()) == Some(id)
            && !self.is_blocked(registry, oracle, OwnerId::Overlay(id))
    }
}

fn in_stack(node: &OverlayNode) -> bool {
    matches!(
        node.state,
        LifecycleState::Attached | LifecycleState::Hidden
    )
}
