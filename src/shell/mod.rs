//! Demo host for the overlay engine: a sidebar part, a main part hosting one
//! view with an anchor button, and a log panel along the bottom.

pub mod render;

use crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::prelude::Rect;

use crate::config::EngineConfig;
use crate::engine::OverlayEngine;
use crate::error::OverlayError;
use crate::event_loop::ControlFlow;
use crate::keybindings::{Action, KeyBindings};
use crate::log_buffer::LogHandle;
use crate::oracle::{LayoutOracle, OwnerEvent};
use crate::overlay::{
    Align, DialogOptions, Modality, NotificationOptions, OverlayHandle, OverlayOutcome,
    PopupAnchor, PopupOptions, SizeConstraints,
};
use crate::owner::{Area, ElementId, OwnerId, PartId, ViewId};

pub const SIDEBAR: PartId = PartId(1);
pub const MAIN_PART: PartId = PartId(2);
pub const MAIN_VIEW: ViewId = ViewId(1);
pub const LOG_VIEW: ViewId = ViewId(2);
pub const ANCHOR_BUTTON: ElementId = ElementId(1);

const SIDEBAR_WIDTH: u16 = 22;
const LOG_HEIGHT: u16 = 7;

/// Boxes of the shell's fixed chrome for one terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShellLayout {
    pub sidebar: Rect,
    pub main_part: Rect,
    pub main_view: Rect,
    pub main_content: Rect,
    pub log: Rect,
    pub button: Rect,
}

impl ShellLayout {
    pub fn compute(area: Rect, maximized: bool) -> Self {
        let log_height = if maximized {
            0
        } else {
            LOG_HEIGHT.min(area.height / 3)
        };
        let sidebar_width = if maximized {
            0
        } else {
            SIDEBAR_WIDTH.min(area.width / 3)
        };
        let body_height = area.height - log_height;
        let sidebar = Rect::new(area.x, area.y, sidebar_width, body_height);
        let main_part = Rect::new(
            area.x + sidebar_width,
            area.y,
            area.width - sidebar_width,
            body_height,
        );
        // One row of tabs above the view.
        let main_view = Rect::new(
            main_part.x,
            main_part.y + 1.min(main_part.height),
            main_part.width,
            main_part.height.saturating_sub(1),
        );
        let main_content = Rect::new(
            main_view.x + 1.min(main_view.width),
            main_view.y + 1.min(main_view.height),
            main_view.width.saturating_sub(2),
            main_view.height.saturating_sub(2),
        );
        let log = Rect::new(area.x, area.y + body_height, area.width, log_height);
        let button = Rect::new(
            main_content.x + 2.min(main_content.width),
            main_content.y + 1.min(main_content.height),
            12.min(main_content.width.saturating_sub(2)),
            1.min(main_content.height),
        );
        Self {
            sidebar,
            main_part,
            main_view,
            main_content,
            log,
            button,
        }
    }
}

pub struct DemoShell {
    engine: OverlayEngine<LayoutOracle, String>,
    bindings: KeyBindings,
    log: Option<LogHandle>,
    area: Rect,
    layout: ShellLayout,
    view_active: bool,
    maximized: bool,
    handles: Vec<OverlayHandle<String>>,
    opened: u32,
    status: String,
}

impl DemoShell {
    pub fn new(area: Rect, config: EngineConfig, log: Option<LogHandle>) -> Self {
        let layout = ShellLayout::compute(area, false);
        let mut oracle = LayoutOracle::new(area);
        oracle.insert_part(SIDEBAR, layout.sidebar, Area::Peripheral);
        oracle.insert_part(MAIN_PART, layout.main_part, Area::Main);
        oracle.insert_view(MAIN_VIEW, layout.main_view, Area::Main);
        oracle.set_parent(OwnerId::View(MAIN_VIEW), OwnerId::Part(MAIN_PART));
        oracle.insert_view(LOG_VIEW, layout.log, Area::Peripheral);
        let mut shell = Self {
            engine: OverlayEngine::new(oracle, config),
            bindings: KeyBindings::default(),
            log,
            area,
            layout,
            view_active: true,
            maximized: false,
            handles: Vec::new(),
            opened: 0,
            status: String::from("ready"),
        };
        shell.sync_layout();
        shell
    }

    pub fn engine(&self) -> &OverlayEngine<LayoutOracle, String> {
        &self.engine
    }

    pub fn layout(&self) -> &ShellLayout {
        &self.layout
    }

    pub fn log(&self) -> Option<&LogHandle> {
        self.log.as_ref()
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn view_active(&self) -> bool {
        self.view_active
    }

    pub fn maximized(&self) -> bool {
        self.maximized
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn handle_event(&mut self, event: Event) -> Result<ControlFlow, OverlayError> {
        let flow = match event {
            Event::Key(key) => self.handle_key(&key)?,
            Event::Mouse(mouse) => {
                self.engine.handle_mouse(&mouse)?;
                ControlFlow::Continue
            }
            Event::Resize(width, height) => {
                self.resize(Rect::new(0, 0, width, height))?;
                ControlFlow::Continue
            }
            _ => ControlFlow::Continue,
        };
        self.collect_results();
        Ok(flow)
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Result<ControlFlow, OverlayError> {
        if self.engine.handle_key(key)? {
            return Ok(ControlFlow::Continue);
        }
        if key.code == KeyCode::Enter {
            self.confirm_focused()?;
            return Ok(ControlFlow::Continue);
        }
        let Some(action) = self.bindings.action_for_key(key) else {
            return Ok(ControlFlow::Continue);
        };
        self.apply(action)
    }

    pub fn apply(&mut self, action: Action) -> Result<ControlFlow, OverlayError> {
        tracing::debug!(%action, "shell action");
        match action {
            Action::Quit => return Ok(ControlFlow::Quit),
            Action::OpenDialog => {
                let label = self.next_label("View dialog");
                self.open_dialog(
                    DialogOptions::new()
                        .context(MAIN_VIEW)
                        .modality(Modality::ContextBlocking)
                        .label(label),
                )?;
            }
            Action::OpenAppDialog => {
                let label = self.next_label("App dialog");
                self.open_dialog(
                    DialogOptions::new()
                        .modality(Modality::ApplicationBlocking)
                        .constraints(SizeConstraints::default().width(Some(24), Some(72)))
                        .label(label),
                )?;
            }
            Action::OpenNestedDialog => {
                let context = self.focused_overlay_or_view();
                let label = self.next_label("Nested dialog");
                self.open_dialog(
                    DialogOptions::new()
                        .context(context)
                        .modality(Modality::ContextBlocking)
                        .size(36, 8)
                        .label(label),
                )?;
            }
            Action::OpenPopup => {
                let context = self.focused_overlay_or_view();
                let label = self.next_label("Popup");
                let handle = self.engine.open_popup(
                    PopupOptions::new(PopupAnchor::Element(ANCHOR_BUTTON))
                        .context(context)
                        .align(Align::South)
                        .label(label),
                )?;
                self.handles.push(handle);
            }
            Action::OpenNotification => {
                let label = self.next_label("Notification");
                let handle = self.engine.open_notification(NotificationOptions::new(label))?;
                self.handles.push(handle);
            }
            Action::ToggleViewActive => {
                self.view_active = !self.view_active;
                self.engine.handle_owner_event(OwnerEvent::Activation {
                    owner: OwnerId::View(MAIN_VIEW),
                    active: self.view_active,
                })?;
                self.status = format!(
                    "main view {}",
                    if self.view_active { "active" } else { "inactive" }
                );
            }
            Action::ToggleMaximize => {
                self.maximized = !self.maximized;
                self.engine
                    .oracle_mut()
                    .set_main_area_maximized(self.maximized);
                self.sync_layout();
                for owner in [OwnerId::Part(SIDEBAR), OwnerId::View(LOG_VIEW)] {
                    self.engine.handle_owner_event(OwnerEvent::Attach {
                        owner,
                        attached: !self.maximized,
                    })?;
                }
                self.engine
                    .handle_owner_event(OwnerEvent::Geometry(OwnerId::Root))?;
                self.status = format!(
                    "main area {}",
                    if self.maximized { "maximized" } else { "restored" }
                );
            }
            Action::CloseAll => {
                let left = self.engine.close_all_for(OwnerId::View(MAIN_VIEW))?;
                self.status = if left.is_empty() {
                    String::from("closed all view overlays")
                } else {
                    format!("{} overlay(s) blocked, left open", left.len())
                };
            }
            Action::Dismiss | Action::FocusNext | Action::FocusPrev => {}
        }
        self.collect_results();
        Ok(ControlFlow::Continue)
    }

    pub fn resize(&mut self, area: Rect) -> Result<(), OverlayError> {
        self.area = area;
        self.engine.oracle_mut().set_root(area);
        self.engine.oracle_mut().set_viewport(area);
        self.sync_layout();
        self.engine
            .handle_owner_event(OwnerEvent::Geometry(OwnerId::Root))
    }

    fn open_dialog(&mut self, options: DialogOptions) -> Result<(), OverlayError> {
        let handle = self.engine.open_dialog(options)?;
        self.engine
            .set_focusables(handle.id, vec![ElementId(100), ElementId(101)])?;
        self.handles.push(handle);
        Ok(())
    }

    /// Enter closes the focused overlay with a value.
    fn confirm_focused(&mut self) -> Result<(), OverlayError> {
        let Some(id) = self.engine.focus_owner().and_then(|o| o.as_overlay()) else {
            return Ok(());
        };
        let label = self
            .engine
            .node(id)
            .map(|n| n.label().to_string())
            .unwrap_or_default();
        self.engine.close(id, Some(format!("confirmed {label}")))
    }

    fn focused_overlay_or_view(&self) -> OwnerId {
        self.engine
            .focus_owner()
            .filter(|o| o.as_overlay().is_some())
            .unwrap_or(OwnerId::View(MAIN_VIEW))
    }

    fn next_label(&mut self, prefix: &str) -> String {
        self.opened += 1;
        format!("{prefix} #{}", self.opened)
    }

    fn sync_layout(&mut self) {
        self.layout = ShellLayout::compute(self.area, self.maximized);
        let oracle = self.engine.oracle_mut();
        oracle.set_bounds(OwnerId::Part(MAIN_PART), self.layout.main_part);
        oracle.set_bounds(OwnerId::View(MAIN_VIEW), self.layout.main_view);
        oracle.set_content(OwnerId::View(MAIN_VIEW), self.layout.main_content);
        if !self.maximized {
            oracle.set_bounds(OwnerId::Part(SIDEBAR), self.layout.sidebar);
            oracle.set_bounds(OwnerId::View(LOG_VIEW), self.layout.log);
        }
        oracle.set_element(ANCHOR_BUTTON, self.layout.button);
    }

    /// Log and drop the handles of overlays that have finished.
    fn collect_results(&mut self) {
        let mut finished = Vec::new();
        self.handles.retain_mut(|handle| match handle.result.try_outcome() {
            Some(outcome) => {
                finished.push((handle.id, outcome));
                false
            }
            None => true,
        });
        for (id, outcome) in finished {
            let line = match outcome {
                OverlayOutcome::Closed(Some(value)) => format!("{id} closed: {value}"),
                OverlayOutcome::Closed(None) => format!("{id} dismissed"),
                OverlayOutcome::Failed(reason) => format!("{id} failed: {reason}"),
                OverlayOutcome::TornDown => format!("{id} torn down"),
            };
            tracing::info!("{line}");
            self.status = line;
        }
    }
}
