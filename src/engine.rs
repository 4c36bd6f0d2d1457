//! The overlay engine: one registry plus the blocking, positioning, resize
//! and focus components, driven by open/close calls, owner events and input.
//!
//! Every public mutation ends in [`OverlayEngine::settle`], which releases
//! queued overlays, restacks, and applies the side effects of each lifecycle
//! change before returning. Callers never observe a half-updated blocking
//! state.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use crate::config::{EngineConfig, ModalScope};
use crate::error::OverlayError;
use crate::focus::{FocusCoordinator, FocusTarget};
use crate::geometry::FloatRect;
use crate::keybindings::{Action, KeyBindings};
use crate::modality::BlockingController;
use crate::oracle::{GeometryOracle, OwnerEvent};
use crate::overlay::result::{ResultSender, result_channel};
use crate::overlay::{
    DialogOptions, DialogPlacement, LifecycleState, Modality, NodeSpec, NotificationOptions,
    OverlayHandle, OverlayId, OverlayKind, OverlayNode, OverlayOutcome, OverlayRegistry,
    Placement, PopupAnchor, PopupOptions, PopupPlacement, RegistryChange, SizeConstraints,
};
use crate::positioning::PositioningEngine;
use crate::resize::{
    DragState, MoveDrag, ResizeDrag, drag_constraints, header_handle_for, resize_handles_for,
};
use crate::owner::{ElementId, OwnerId};

/// Observable changes, drained with [`OverlayEngine::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Opened {
        id: OverlayId,
        state: LifecycleState,
    },
    StateChanged {
        id: OverlayId,
        from: LifecycleState,
        to: LifecycleState,
    },
    BoundsChanged {
        id: OverlayId,
        bounds: FloatRect,
    },
    FocusChanged(Option<FocusTarget>),
}

/// One attached overlay as the host should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayDraw {
    pub id: OverlayId,
    pub kind: OverlayKind,
    pub label: String,
    pub bounds: FloatRect,
    pub interactive: bool,
    pub focused: bool,
    /// Regions this overlay dims, drawn just below it.
    pub glass_panes: Vec<FloatRect>,
}

pub struct OverlayEngine<G: GeometryOracle, T = ()> {
    oracle: G,
    config: EngineConfig,
    registry: OverlayRegistry,
    blocking: BlockingController,
    focus: FocusCoordinator,
    bindings: KeyBindings,
    senders: BTreeMap<OverlayId, ResultSender<T>>,
    subscriptions: BTreeMap<OwnerId, BTreeSet<OverlayId>>,
    z_order: Vec<OverlayId>,
    drag: Option<DragState>,
    drag_preview: Option<FloatRect>,
    pending: VecDeque<RegistryChange>,
    events: Vec<EngineEvent>,
}

impl<G: GeometryOracle, T> OverlayEngine<G, T> {
    pub fn new(oracle: G, config: EngineConfig) -> Self {
        Self {
            oracle,
            blocking: BlockingController::new(config.modal_scope),
            config,
            registry: OverlayRegistry::new(),
            focus: FocusCoordinator::new(),
            bindings: KeyBindings::default(),
            senders: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            z_order: Vec::new(),
            drag: None,
            drag_preview: None,
            pending: VecDeque::new(),
            events: Vec::new(),
        }
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn oracle(&self) -> &G {
        &self.oracle
    }

    /// Mutable access for hosts that keep their layout in the oracle. Follow
    /// up with the matching [`OwnerEvent`] so overlays can react.
    pub fn oracle_mut(&mut self) -> &mut G {
        &mut self.oracle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn node(&self, id: OverlayId) -> Option<&OverlayNode> {
        self.registry.get(id)
    }

    pub fn state_of(&self, id: OverlayId) -> Option<LifecycleState> {
        self.registry.get(id).map(|n| n.state())
    }

    pub fn set_modal_scope(&mut self, scope: ModalScope) -> Result<(), OverlayError> {
        self.config.modal_scope = scope;
        self.blocking.set_scope(scope);
        let attached = self.attached_ids();
        self.reposition_many(attached)?;
        self.settle()
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.drain_registry();
        std::mem::take(&mut self.events)
    }

    // ---- opening -------------------------------------------------------

    pub fn open_dialog(&mut self, options: DialogOptions) -> Result<OverlayHandle<T>, OverlayError> {
        let context = options.context.unwrap_or(OwnerId::Root);
        let modality = match (options.modality, context) {
            (Modality::ContextBlocking, OwnerId::Root) => {
                tracing::debug!("context-blocking dialog on the root blocks the application");
                Modality::ApplicationBlocking
            }
            (modality, _) => modality,
        };
        self.open_node(NodeSpec {
            kind: OverlayKind::Dialog,
            context,
            modality,
            closable: options.closable.unwrap_or(true),
            resizable: options.resizable.unwrap_or(true),
            size: options.size.unwrap_or(self.config.default_dialog_size),
            constraints: options.constraints,
            placement: Placement::Dialog(DialogPlacement::default()),
            label: options.label,
        })
    }

    pub fn open_popup(&mut self, options: PopupOptions) -> Result<OverlayHandle<T>, OverlayError> {
        self.open_node(NodeSpec {
            kind: OverlayKind::Popup,
            context: options.context.unwrap_or(OwnerId::Root),
            modality: Modality::None,
            closable: true,
            resizable: false,
            size: options.size.unwrap_or(self.config.default_popup_size),
            constraints: options.constraints,
            placement: Placement::Popup(PopupPlacement {
                anchor: options.anchor,
                align: options.align,
                effective_align: options.align,
                close_strategy: options.close_strategy,
            }),
            label: options.label,
        })
    }

    pub fn open_notification(
        &mut self,
        options: NotificationOptions,
    ) -> Result<OverlayHandle<T>, OverlayError> {
        self.open_node(NodeSpec {
            kind: OverlayKind::Notification,
            context: OwnerId::Root,
            modality: Modality::None,
            closable: true,
            resizable: false,
            size: options.size.unwrap_or(self.config.notification_size),
            constraints: SizeConstraints::default(),
            placement: Placement::Notification,
            label: options.label,
        })
    }

    fn open_node(&mut self, spec: NodeSpec) -> Result<OverlayHandle<T>, OverlayError> {
        // Resolve before deciding anything so a bad context leaves no trace.
        self.registry.ensure_resolves(spec.context, &self.oracle)?;
        let state = self
            .blocking
            .entry_state(&self.registry, &self.oracle, spec.context);
        let kind = spec.kind;
        let id = self.registry.create(spec, state, &self.oracle)?;
        let (tx, handle) = result_channel(id);
        self.senders.insert(id, tx);
        self.subscribe(id);
        tracing::debug!(overlay = %id, ?kind, %state, "opened overlay");
        self.settle()?;
        Ok(handle)
    }

    fn subscribe(&mut self, id: OverlayId) {
        let Some(node) = self.registry.get(id) else {
            return;
        };
        let owners = self
            .blocking
            .activity_chain(&self.registry, &self.oracle, node.context);
        for owner in owners {
            self.subscriptions.entry(owner).or_default().insert(id);
        }
    }

    fn unsubscribe(&mut self, id: OverlayId) {
        self.subscriptions.retain(|_, ids| {
            ids.remove(&id);
            !ids.is_empty()
        });
    }

    // ---- closing -------------------------------------------------------

    /// Close `id` with an optional value. Works on blocked and queued
    /// overlays alike; a queued overlay always resolves without a value.
    pub fn close(&mut self, id: OverlayId, value: Option<T>) -> Result<(), OverlayError> {
        let node = self.registry.require(id)?;
        let outcome = if node.state == LifecycleState::Queued {
            OverlayOutcome::Closed(None)
        } else {
            OverlayOutcome::Closed(value)
        };
        self.close_tree(id, outcome)?;
        self.settle()
    }

    pub fn close_with_error(
        &mut self,
        id: OverlayId,
        error: impl Into<String>,
    ) -> Result<(), OverlayError> {
        self.registry.require(id)?;
        self.close_tree(id, OverlayOutcome::Failed(error.into()))?;
        self.settle()
    }

    /// Close every overlay opened directly on `owner` unless it is blocked.
    /// Returns the overlays left open.
    pub fn close_all_for(&mut self, owner: OwnerId) -> Result<Vec<OverlayId>, OverlayError> {
        let targets = self.registry.ids_where(|n| n.context == owner);
        // Decide up front so closing the top does not unblock the one below.
        let blocked: BTreeSet<OverlayId> = targets
            .iter()
            .copied()
            .filter(|id| {
                self.blocking
                    .is_blocked(&self.registry, &self.oracle, OwnerId::Overlay(*id))
            })
            .collect();
        let mut still_open = Vec::new();
        for id in targets.into_iter().rev() {
            if blocked.contains(&id) {
                tracing::warn!(overlay = %id, %owner, "close-all skipped blocked overlay");
                still_open.push(id);
                continue;
            }
            if self.registry.contains(id) {
                self.close_tree(id, OverlayOutcome::Closed(None))?;
            }
        }
        self.settle()?;
        still_open.reverse();
        Ok(still_open)
    }

    /// Close `id` after tearing down every overlay opened from it.
    fn close_tree(&mut self, id: OverlayId, outcome: OverlayOutcome<T>) -> Result<(), OverlayError> {
        let mut doomed = self.registry.descendants_of(OwnerId::Overlay(id));
        doomed.reverse();
        for child in doomed {
            if self.registry.contains(child) {
                self.remove_node(child, OverlayOutcome::TornDown)?;
            }
        }
        self.remove_node(id, outcome)
    }

    fn remove_node(&mut self, id: OverlayId, outcome: OverlayOutcome<T>) -> Result<(), OverlayError> {
        let node = self.registry.require(id)?;
        let root = node.blocking_root();
        let context = node.context;
        let kind = node.kind;
        let had_focus = self.focus_within(id);

        let (transition, _node) = self.blocking.close(&mut self.registry, id)?;
        tracing::debug!(overlay = %id, from = %transition.from, "closed overlay");
        if let Some(tx) = self.senders.remove(&id) {
            // The caller may have dropped its handle; nothing to deliver then.
            let _ = tx.send(outcome);
        }
        self.unsubscribe(id);
        self.z_order.retain(|other| *other != id);
        if self.drag.is_some_and(|drag| drag.id() == id) {
            self.cancel_drag();
        }
        self.blocking.restack(&mut self.registry);

        let restore = self.focus.leave(root, id);
        if had_focus {
            let next = self
                .blocking
                .stack_top(&self.registry, root)
                .map(|top| self.entry_target(top))
                .or_else(|| restore.filter(|t| self.focusable(t)))
                .or_else(|| {
                    let target = FocusTarget::Owner(context);
                    self.focusable(&target).then_some(target)
                });
            match next {
                Some(target) => self.focus_redirected(target)?,
                None => self.set_focus(None)?,
            }
        }
        if kind == OverlayKind::Notification {
            let rest = self
                .registry
                .ids_where(|n| n.kind == OverlayKind::Notification);
            self.reposition_many(rest)?;
        }
        Ok(())
    }

    // ---- owner events --------------------------------------------------

    pub fn handle_owner_event(&mut self, event: OwnerEvent) -> Result<(), OverlayError> {
        match event {
            OwnerEvent::Activation { owner, active } => {
                if !self.blocking.set_active(owner, active) {
                    tracing::trace!(%owner, active, "activation unchanged");
                    return Ok(());
                }
                self.blocking
                    .sync_visibility(&mut self.registry, &self.oracle)?;
            }
            OwnerEvent::Attach { owner, attached } => {
                if !self.blocking.set_attached(owner, attached) {
                    tracing::trace!(%owner, attached, "attachment unchanged");
                    return Ok(());
                }
                self.blocking
                    .sync_visibility(&mut self.registry, &self.oracle)?;
            }
            OwnerEvent::Geometry(owner) => {
                let targets = if owner == OwnerId::Root {
                    self.attached_ids()
                } else {
                    match self.subscriptions.get(&owner) {
                        Some(ids) => ids.iter().copied().collect(),
                        None => {
                            tracing::trace!(%owner, "geometry change for unsubscribed owner");
                            return Ok(());
                        }
                    }
                };
                self.reposition_many(targets)?;
            }
            OwnerEvent::Destroyed(owner) => {
                let mut doomed = self.registry.descendants_of(owner);
                doomed.reverse();
                for id in doomed {
                    if self.registry.contains(id) {
                        self.remove_node(id, OverlayOutcome::TornDown)?;
                    }
                }
                self.blocking.forget_owner(owner);
                self.subscriptions.remove(&owner);
                if self.focus.current().is_some_and(|t| t.owner() == owner) {
                    self.set_focus(None)?;
                }
                self.focus.forget_owner(owner);
            }
        }
        self.settle()
    }

    // ---- queries -------------------------------------------------------

    pub fn is_blocked(&self, owner: OwnerId) -> bool {
        self.blocking.is_blocked(&self.registry, &self.oracle, owner)
    }

    pub fn blockers_of(&self, owner: OwnerId) -> Vec<OverlayId> {
        self.blocking.blockers_of(&self.registry, &self.oracle, owner)
    }

    pub fn glass_panes_of(&self, owner: OwnerId) -> Vec<FloatRect> {
        self.blocking
            .glass_panes_of(&self.registry, &self.oracle, owner)
    }

    pub fn is_interactive(&self, id: OverlayId) -> bool {
        self.blocking.is_interactive(&self.registry, &self.oracle, id)
    }

    pub fn focused(&self) -> Option<FocusTarget> {
        self.focus.current()
    }

    pub fn focus_owner(&self) -> Option<OwnerId> {
        self.focus.current().map(|t| t.owner())
    }

    /// Attached overlays bottom to top, with the preview box of an ongoing
    /// drag substituted for the dragged overlay.
    pub fn render_plan(&self) -> Vec<OverlayDraw> {
        let focused = self.focus_owner();
        self.z_order
            .iter()
            .filter_map(|id| self.registry.get(*id))
            .filter(|n| n.state == LifecycleState::Attached)
            .filter_map(|n| {
                let bounds = self.visible_bounds(n)?;
                Some(OverlayDraw {
                    id: n.id,
                    kind: n.kind,
                    label: n.label.clone(),
                    bounds,
                    interactive: self.is_interactive(n.id),
                    focused: focused == Some(OwnerId::Overlay(n.id)),
                    glass_panes: self.blocking.glass_pane_of(&self.registry, &self.oracle, n),
                })
            })
            .collect()
    }

    fn visible_bounds(&self, node: &OverlayNode) -> Option<FloatRect> {
        match (self.drag, self.drag_preview) {
            (Some(drag), Some(preview)) if drag.id() == node.id => Some(preview),
            _ => node.bounds,
        }
    }

    fn attached_ids(&self) -> Vec<OverlayId> {
        self.registry
            .ids_where(|n| n.state == LifecycleState::Attached)
    }

    // ---- focus ---------------------------------------------------------

    /// Move focus to `target`. Focus aimed at a blocked owner lands on the
    /// interactive overlay blocking it instead. Returns where focus ended up.
    pub fn request_focus(&mut self, target: FocusTarget) -> Result<Option<FocusTarget>, OverlayError> {
        self.registry.ensure_resolves(target.owner(), &self.oracle)?;
        self.focus_redirected(target)?;
        self.settle()?;
        Ok(self.focus.current())
    }

    fn focus_redirected(&mut self, target: FocusTarget) -> Result<(), OverlayError> {
        let owner = target.owner();
        if let Some(id) = owner.as_overlay()
            && self.state_of(id) != Some(LifecycleState::Attached)
        {
            tracing::trace!(overlay = %id, "focus request for overlay that is not attached");
            return Ok(());
        }
        if !self.is_blocked(owner) {
            return self.set_focus(Some(target));
        }
        match self.interactive_blocker(owner) {
            Some(blocker) => {
                tracing::trace!(%owner, overlay = %blocker, "focus redirected into blocking overlay");
                let target = self.entry_target(blocker);
                self.set_focus(Some(target))
            }
            None => {
                tracing::trace!(%owner, "focus request for blocked owner dropped");
                Ok(())
            }
        }
    }

    /// The overlay that ultimately holds interaction for a blocked `owner`.
    fn interactive_blocker(&self, owner: OwnerId) -> Option<OverlayId> {
        let mut current = owner;
        for _ in 0..=self.registry.len() {
            let blockers = self.blockers_of(current);
            if let Some(&interactive) = blockers.iter().rev().find(|id| self.is_interactive(**id)) {
                return Some(interactive);
            }
            current = OwnerId::Overlay(*blockers.last()?);
        }
        None
    }

    fn set_focus(&mut self, target: Option<FocusTarget>) -> Result<(), OverlayError> {
        if !self.focus.set_current(target) {
            return Ok(());
        }
        self.emit(EngineEvent::FocusChanged(target));
        self.close_popups_losing_focus()
    }

    /// Close popups configured to close on focus loss once focus has left
    /// them and everything opened from them.
    fn close_popups_losing_focus(&mut self) -> Result<(), OverlayError> {
        let chain = self
            .focus
            .current()
            .map(|t| self.registry.chain_from(t.owner()))
            .unwrap_or_default();
        let losing = self.registry.ids_where(|n| {
            n.state == LifecycleState::Attached
                && n.popup().is_some_and(|p| p.close_strategy.on_focus_lost)
                && !chain.contains(&OwnerId::Overlay(n.id))
        });
        for id in losing.into_iter().rev() {
            if self.registry.contains(id) {
                tracing::debug!(overlay = %id, "popup lost focus");
                self.close_tree(id, OverlayOutcome::Closed(None))?;
            }
        }
        Ok(())
    }

    /// Whether the current focus sits in `id` or something opened from it.
    fn focus_within(&self, id: OverlayId) -> bool {
        self.focus.current().is_some_and(|t| {
            self.registry
                .chain_from(t.owner())
                .contains(&OwnerId::Overlay(id))
        })
    }

    fn focusable(&self, target: &FocusTarget) -> bool {
        match target.owner() {
            OwnerId::Overlay(id) => self.state_of(id) == Some(LifecycleState::Attached),
            owner => self.registry.resolves(owner, &self.oracle),
        }
    }

    /// First focusable element of an overlay, or the overlay itself.
    fn entry_target(&self, id: OverlayId) -> FocusTarget {
        let owner = OwnerId::Overlay(id);
        match self.registry.get(id).and_then(|n| n.focusables.first()) {
            Some(element) => FocusTarget::Element {
                owner,
                element: *element,
            },
            None => FocusTarget::Owner(owner),
        }
    }

    /// The overlay keyboard input goes to, if it may receive any.
    fn keyboard_target(&self) -> Option<OverlayId> {
        let id = self.focus_owner()?.as_overlay()?;
        if self.is_interactive(id) {
            Some(id)
        } else {
            tracing::trace!(overlay = %id, "key input for non-interactive overlay rejected");
            None
        }
    }

    // ---- input ---------------------------------------------------------

    /// Handle Escape and Tab/BackTab for the focused overlay. Returns whether
    /// the key was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Result<bool, OverlayError> {
        let Some(action) = self
            .bindings
            .action_for_key(key)
            .filter(|action| action.is_overlay_action())
        else {
            return Ok(false);
        };
        let Some(id) = self.keyboard_target() else {
            return Ok(false);
        };
        let node = self.registry.require(id)?;
        match action {
            Action::Dismiss => {
                let dismiss = match node.popup() {
                    Some(popup) => popup.close_strategy.on_escape,
                    None => node.kind == OverlayKind::Dialog && node.closable,
                };
                if !dismiss {
                    return Ok(false);
                }
                self.close(id, None)?;
                Ok(true)
            }
            Action::FocusNext | Action::FocusPrev => {
                let forward = action == Action::FocusNext;
                let Some(target) =
                    self.focus
                        .cycle(OwnerId::Overlay(id), &node.focusables, forward)
                else {
                    return Ok(false);
                };
                self.set_focus(Some(target))?;
                self.settle()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Pointer dispatch: focus on press, resize and header drags for
    /// interactive dialogs, rejection for anything else under an overlay.
    /// Returns whether the event landed on an overlay.
    pub fn handle_mouse(&mut self, mouse: &MouseEvent) -> Result<bool, OverlayError> {
        let (column, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let consumed = self.press(column, row)?;
                self.settle()?;
                Ok(consumed)
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some(drag) = self.drag else {
                    return Ok(false);
                };
                self.drag_preview = Some(drag.update(column, row));
                Ok(true)
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some(drag) = self.drag.take() else {
                    return Ok(false);
                };
                self.drag_preview = None;
                self.commit_drag(drag, drag.update(column, row))?;
                self.settle()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn overlay_at(&self, column: u16, row: u16) -> Option<OverlayId> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .filter_map(|id| self.registry.get(id))
            .filter(|n| n.state == LifecycleState::Attached)
            .find(|n| n.bounds.is_some_and(|b| b.contains(column as i32, row as i32)))
            .map(|n| n.id)
    }

    fn press(&mut self, column: u16, row: u16) -> Result<bool, OverlayError> {
        let Some(id) = self.overlay_at(column, row) else {
            // Clicking outside every overlay is focus loss for open popups.
            if let Some(context) = self.focused_popup_root_context() {
                self.focus_redirected(FocusTarget::Owner(context))?;
            }
            return Ok(false);
        };
        if !self.is_interactive(id) {
            tracing::trace!(overlay = %id, column, row, "pointer input for non-interactive overlay rejected");
            return Ok(true);
        }
        if !self.focus_within(id) {
            let target = self.entry_target(id);
            self.set_focus(Some(target))?;
        }
        let node = self.registry.require(id)?;
        let Some(bounds) = node.bounds else {
            return Ok(true);
        };
        if node.kind != OverlayKind::Dialog {
            return Ok(true);
        }
        let (x, y) = (column as i32, row as i32);
        if node.resizable
            && let Some(handle) = resize_handles_for(id, bounds)
                .into_iter()
                .find(|h| h.rect.contains(x, y))
        {
            self.drag = Some(DragState::Resize(ResizeDrag {
                id,
                edge: handle.edge,
                start: bounds,
                start_col: column,
                start_row: row,
                constraints: drag_constraints(node.constraints),
            }));
        } else if header_handle_for(id, bounds).is_some_and(|h| h.rect.contains(x, y)) {
            self.drag = Some(DragState::Move(MoveDrag {
                id,
                start: bounds,
                start_col: column,
                start_row: row,
            }));
        }
        Ok(true)
    }

    /// Context of the outermost popup in the focused chain; focus falls back
    /// there when a press lands outside every overlay.
    fn focused_popup_root_context(&self) -> Option<OwnerId> {
        let owner = self.focus_owner()?;
        self.registry
            .chain_from(owner)
            .into_iter()
            .filter_map(|o| o.as_overlay())
            .filter_map(|id| self.registry.get(id))
            .filter(|n| n.popup().is_some())
            .last()
            .map(|n| n.context)
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
        self.drag_preview = None;
    }

    fn commit_drag(&mut self, drag: DragState, rect: FloatRect) -> Result<(), OverlayError> {
        let id = drag.id();
        if self.state_of(id) != Some(LifecycleState::Attached) {
            return Ok(());
        }
        if matches!(drag, DragState::Resize(_)) {
            let node = self.registry.require_mut(id)?;
            node.size.width = rect.width;
            node.size.height = rect.height;
            node.preferred = node.size;
        }
        let node = self.registry.require(id)?;
        if let Placement::Dialog(mut dialog) = node.placement {
            let base = PositioningEngine::new(&self.registry, &self.oracle, &self.config)
                .dialog_base(node, dialog.cascade.unwrap_or(0));
            dialog.offset = Some((rect.x - base.x, rect.y - base.y));
            self.registry.require_mut(id)?.placement = Placement::Dialog(dialog);
        }
        tracing::debug!(overlay = %id, ?rect, "committed drag");
        self.reposition(id)
    }

    // ---- runtime mutation ----------------------------------------------

    pub fn set_constraints(
        &mut self,
        id: OverlayId,
        constraints: SizeConstraints,
    ) -> Result<(), OverlayError> {
        self.registry.require_mut(id)?.constraints = constraints;
        self.resize_to_preferred(id)
    }

    /// Content-driven size change; the size is re-clamped to the node's
    /// constraints.
    pub fn set_content_size(&mut self, id: OverlayId, width: u16, height: u16) -> Result<(), OverlayError> {
        let node = self.registry.require_mut(id)?;
        node.preferred.width = width;
        node.preferred.height = height;
        self.resize_to_preferred(id)
    }

    fn resize_to_preferred(&mut self, id: OverlayId) -> Result<(), OverlayError> {
        let node = self.registry.require_mut(id)?;
        node.size = node.constraints.clamp(node.preferred);
        if node.state == LifecycleState::Attached {
            self.reposition(id)?;
        } else if let Some(bounds) = node.bounds.as_mut() {
            // Keep the cached origin; only the size follows the change.
            bounds.width = node.size.width;
            bounds.height = node.size.height;
        }
        self.settle()
    }

    pub fn set_closable(&mut self, id: OverlayId, closable: bool) -> Result<(), OverlayError> {
        self.registry.require_mut(id)?.closable = closable;
        Ok(())
    }

    pub fn set_resizable(&mut self, id: OverlayId, resizable: bool) -> Result<(), OverlayError> {
        self.registry.require_mut(id)?.resizable = resizable;
        if !resizable && self.drag.is_some_and(|d| d.id() == id) {
            self.cancel_drag();
        }
        Ok(())
    }

    pub fn set_popup_anchor(&mut self, id: OverlayId, anchor: PopupAnchor) -> Result<(), OverlayError> {
        let node = self.registry.require_mut(id)?;
        match &mut node.placement {
            Placement::Popup(popup) => popup.anchor = anchor,
            _ => {
                let err = OverlayError::IllegalState(format!("{id} is not a popup"));
                tracing::error!(%err, "anchor change rejected");
                return Err(err);
            }
        }
        self.reposition(id)?;
        self.settle()
    }

    pub fn set_focusables(&mut self, id: OverlayId, focusables: Vec<ElementId>) -> Result<(), OverlayError> {
        self.registry.require_mut(id)?.focusables = focusables;
        Ok(())
    }

    /// Re-measure an attached overlay and everything opened from it. Hidden
    /// and queued overlays keep their cached boxes.
    pub fn reposition(&mut self, id: OverlayId) -> Result<(), OverlayError> {
        self.registry.require(id)?;
        self.reposition_many(vec![id])
    }

    fn reposition_many(&mut self, ids: Vec<OverlayId>) -> Result<(), OverlayError> {
        let mut all: BTreeSet<OverlayId> = BTreeSet::new();
        for id in ids {
            all.insert(id);
            all.extend(self.registry.descendants_of(OwnerId::Overlay(id)));
        }
        // Parents first, so children see their context's new box.
        let ordered = self.registry.ids_where(|n| {
            all.contains(&n.id) && n.state == LifecycleState::Attached
        });
        for id in ordered {
            self.measure(id)?;
        }
        Ok(())
    }

    fn measure(&mut self, id: OverlayId) -> Result<(), OverlayError> {
        let placed = {
            let node = self.registry.require(id)?;
            PositioningEngine::new(&self.registry, &self.oracle, &self.config).place(node)
        };
        let node = self.registry.require_mut(id)?;
        node.placement = placed.placement;
        if node.bounds != Some(placed.bounds) {
            node.bounds = Some(placed.bounds);
            self.emit(EngineEvent::BoundsChanged {
                id,
                bounds: placed.bounds,
            });
        }
        Ok(())
    }

    // ---- change processing ---------------------------------------------

    fn drain_registry(&mut self) {
        for change in self.registry.take_changes() {
            match change {
                RegistryChange::Created { id, state } => {
                    self.events.push(EngineEvent::Opened { id, state });
                }
                RegistryChange::StateChanged { id, from, to } => {
                    self.events.push(EngineEvent::StateChanged { id, from, to });
                }
                RegistryChange::Destroyed(_) => {}
            }
            self.pending.push_back(change);
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        self.drain_registry();
        self.events.push(event);
    }

    /// Release queued overlays and apply lifecycle side effects until
    /// nothing changes any more.
    fn settle(&mut self) -> Result<(), OverlayError> {
        loop {
            self.blocking
                .release_queued(&mut self.registry, &self.oracle)?;
            self.blocking.restack(&mut self.registry);
            self.drain_registry();
            let Some(change) = self.pending.pop_front() else {
                return Ok(());
            };
            self.apply_change(change)
                .inspect_err(|err| tracing::error!(%err, "overlay update failed"))?;
        }
    }

    fn apply_change(&mut self, change: RegistryChange) -> Result<(), OverlayError> {
        match change {
            RegistryChange::Created { id, state } => match state {
                LifecycleState::Attached => self.on_attached(id, true),
                LifecycleState::Queued => {
                    tracing::debug!(overlay = %id, "queued behind an application-blocking overlay");
                    Ok(())
                }
                _ => Ok(()),
            },
            RegistryChange::StateChanged { id, from, to } => match to {
                LifecycleState::Attached => self.on_attached(id, from == LifecycleState::Queued),
                LifecycleState::Hidden => self.on_hidden(id),
                _ => Ok(()),
            },
            RegistryChange::Destroyed(_) => Ok(()),
        }
    }

    fn on_attached(&mut self, id: OverlayId, fresh: bool) -> Result<(), OverlayError> {
        let Some(node) = self.registry.get(id) else {
            return Ok(());
        };
        if node.state != LifecycleState::Attached {
            return Ok(());
        }
        let kind = node.kind;
        let root = node.blocking_root();
        // Cached boxes are reused untouched; only never-measured nodes are
        // placed here.
        if node.bounds.is_none() {
            self.measure(id)?;
        } else if !fresh {
            tracing::debug!(overlay = %id, "reattached with cached bounds");
        }
        if !self.z_order.contains(&id) {
            self.z_order.push(id);
        }
        if kind == OverlayKind::Notification {
            return Ok(());
        }
        self.focus.enter(root, id);
        if !self.is_interactive(id) {
            return Ok(());
        }
        let steal = fresh
            || match self.focus.current() {
                None => true,
                Some(current) => self.is_blocked(current.owner()),
            };
        if steal {
            let target = self.entry_target(id);
            self.set_focus(Some(target))?;
        }
        Ok(())
    }

    fn on_hidden(&mut self, id: OverlayId) -> Result<(), OverlayError> {
        tracing::debug!(overlay = %id, "hidden with its context");
        if self.drag.is_some_and(|d| d.id() == id) {
            self.cancel_drag();
        }
        if self.focus_within(id) {
            self.set_focus(None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::LayoutOracle;
    use crate::overlay::{AnchorPoint, OverlayOutcome};
    use crate::owner::{Area, ViewId};
    use crossterm::event::{KeyCode, KeyModifiers};
    use ratatui::prelude::Rect;

    const V: OwnerId = OwnerId::View(ViewId(1));

    fn engine() -> OverlayEngine<LayoutOracle, u32> {
        let mut oracle = LayoutOracle::new(Rect::new(0, 0, 120, 40));
        oracle.insert_view(ViewId(1), Rect::new(0, 0, 80, 40), Area::Main);
        OverlayEngine::new(oracle, EngineConfig::default())
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn null_context_rejects_open_without_side_effects() {
        let mut e = engine();
        let err = e
            .open_dialog(DialogOptions::new().context(ViewId(42)))
            .unwrap_err();
        assert!(matches!(err, OverlayError::NullContext { .. }));
        assert!(e.registry().is_empty());
        assert!(e.take_events().is_empty());
    }

    #[test]
    fn context_modal_on_root_is_promoted() {
        let mut e = engine();
        let handle = e.open_dialog(DialogOptions::new()).unwrap();
        assert_eq!(
            e.node(handle.id).unwrap().modality(),
            Modality::ApplicationBlocking
        );
        assert!(e.is_blocked(V));
    }

    #[test]
    fn close_resolves_result_with_value() {
        let mut e = engine();
        let mut handle = e.open_dialog(DialogOptions::new().context(V)).unwrap();
        e.close(handle.id, Some(7)).unwrap();
        assert_eq!(
            handle.result.try_outcome(),
            Some(OverlayOutcome::Closed(Some(7)))
        );
        assert!(matches!(
            e.close(handle.id, None),
            Err(OverlayError::UnknownOverlay(_))
        ));
    }

    #[test]
    fn escape_closes_focused_closable_dialog_only() {
        let mut e = engine();
        let fixed = e
            .open_dialog(DialogOptions::new().context(V).closable(false))
            .unwrap();
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert!(!e.handle_key(&esc).unwrap());
        assert!(e.node(fixed.id).is_some());
        e.set_closable(fixed.id, true).unwrap();
        assert!(e.handle_key(&esc).unwrap());
        assert!(e.node(fixed.id).is_none());
    }

    #[test]
    fn tab_cycles_registered_focusables() {
        let mut e = engine();
        let d = e.open_dialog(DialogOptions::new().context(V)).unwrap();
        e.set_focusables(d.id, vec![ElementId(1), ElementId(2)])
            .unwrap();
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert!(e.handle_key(&tab).unwrap());
        assert_eq!(e.focused().and_then(|t| t.element()), Some(ElementId(1)));
        assert!(e.handle_key(&tab).unwrap());
        assert_eq!(e.focused().and_then(|t| t.element()), Some(ElementId(2)));
        assert!(e.handle_key(&tab).unwrap());
        assert_eq!(e.focused().and_then(|t| t.element()), Some(ElementId(1)));
    }

    #[test]
    fn header_drag_moves_dialog_and_persists_offset() {
        let mut e = engine();
        let d = e
            .open_dialog(DialogOptions::new().context(V).size(20, 6))
            .unwrap();
        let start = e.node(d.id).unwrap().bounds().unwrap();
        let (col, row) = (start.x as u16 + 5, start.y as u16 + 1);
        assert!(e.handle_mouse(&mouse(MouseEventKind::Down(MouseButton::Left), col, row)).unwrap());
        e.handle_mouse(&mouse(MouseEventKind::Drag(MouseButton::Left), col + 3, row + 2))
            .unwrap();
        // The node keeps its committed box while the drag is in flight.
        assert_eq!(e.node(d.id).unwrap().bounds(), Some(start));
        assert_eq!(e.render_plan()[0].bounds, start.translate(3, 2));
        e.handle_mouse(&mouse(MouseEventKind::Up(MouseButton::Left), col + 4, row + 2))
            .unwrap();
        assert_eq!(e.node(d.id).unwrap().bounds(), Some(start.translate(4, 2)));

        // Moving the view carries the dialog along by the same delta.
        e.oracle_mut().set_bounds(V, Rect::new(10, 0, 80, 40));
        e.handle_owner_event(OwnerEvent::Geometry(V)).unwrap();
        assert_eq!(e.node(d.id).unwrap().bounds(), Some(start.translate(14, 2)));
    }

    #[test]
    fn corner_drag_resizes_within_constraints() {
        let mut e = engine();
        let d = e
            .open_dialog(
                DialogOptions::new()
                    .context(V)
                    .size(20, 6)
                    .constraints(SizeConstraints::default().width(Some(10), Some(24))),
            )
            .unwrap();
        let start = e.node(d.id).unwrap().bounds().unwrap();
        let (col, row) = ((start.right() - 1) as u16, (start.bottom() - 1) as u16);
        e.handle_mouse(&mouse(MouseEventKind::Down(MouseButton::Left), col, row))
            .unwrap();
        e.handle_mouse(&mouse(MouseEventKind::Up(MouseButton::Left), col + 10, row + 2))
            .unwrap();
        let node = e.node(d.id).unwrap();
        assert_eq!(node.size().width, 24);
        assert_eq!(node.size().height, 8);
        let bounds = node.bounds().unwrap();
        assert_eq!((bounds.x, bounds.y), (start.x, start.y));
    }

    #[test]
    fn pointer_on_blocked_dialog_is_swallowed() {
        let mut e = engine();
        let lower = e
            .open_dialog(DialogOptions::new().context(V).size(20, 6))
            .unwrap();
        let upper = e
            .open_dialog(DialogOptions::new().context(V).size(20, 6))
            .unwrap();
        let lower_box = e.node(lower.id).unwrap().bounds().unwrap();
        // Bottom-left cell of the lower dialog is not covered by the upper one.
        let (col, row) = (lower_box.x as u16, (lower_box.bottom() - 1) as u16);
        assert!(e.handle_mouse(&mouse(MouseEventKind::Down(MouseButton::Left), col, row)).unwrap());
        assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(upper.id)));
        assert_eq!(e.node(lower.id).unwrap().bounds(), Some(lower_box));
    }

    #[test]
    fn popup_closes_when_focus_moves_elsewhere() {
        let mut e = engine();
        let mut popup = e
            .open_popup(
                PopupOptions::new(PopupAnchor::point(AnchorPoint::top_left(2, 2))).context(V),
            )
            .unwrap();
        assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(popup.id)));
        e.request_focus(FocusTarget::Owner(V)).unwrap();
        assert!(e.node(popup.id).is_none());
        assert_eq!(popup.result.try_outcome(), Some(OverlayOutcome::Closed(None)));
    }

    #[test]
    fn press_outside_popup_closes_it() {
        let mut e = engine();
        let popup = e
            .open_popup(
                PopupOptions::new(PopupAnchor::point(AnchorPoint::top_left(2, 2)))
                    .context(V)
                    .size(6, 3),
            )
            .unwrap();
        assert!(!e.handle_mouse(&mouse(MouseEventKind::Down(MouseButton::Left), 70, 30)).unwrap());
        assert!(e.node(popup.id).is_none());
        assert_eq!(e.focus_owner(), Some(V));
    }

    #[test]
    fn notifications_stack_and_close_up() {
        let mut e = engine();
        let first = e.open_notification(NotificationOptions::new("one")).unwrap();
        let second = e.open_notification(NotificationOptions::new("two")).unwrap();
        let a = e.node(first.id).unwrap().bounds().unwrap();
        let b = e.node(second.id).unwrap().bounds().unwrap();
        assert_eq!(a, FloatRect::new(120 - 32 - 1, 1, 32, 3));
        assert_eq!(b.y, a.bottom() + 1);
        assert_eq!(e.focus_owner(), None);
        e.close(first.id, None).unwrap();
        assert_eq!(e.node(second.id).unwrap().bounds(), Some(a));
    }

    #[test]
    fn popup_anchor_change_rejected_for_dialogs() {
        let mut e = engine();
        let d = e.open_dialog(DialogOptions::new().context(V)).unwrap();
        let err = e
            .set_popup_anchor(d.id, PopupAnchor::point(AnchorPoint::top_left(0, 0)))
            .unwrap_err();
        assert!(matches!(err, OverlayError::IllegalState(_)));
    }
}
