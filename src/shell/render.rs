use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::DemoShell;
use crate::engine::OverlayDraw;
use crate::geometry::FloatRect;
use crate::keybindings::Action;
use crate::overlay::OverlayKind;

pub fn draw(frame: &mut Frame<'_>, shell: &DemoShell) {
    let area = frame.area();
    draw_chrome(frame, shell);
    for overlay in shell.engine().render_plan() {
        for pane in &overlay.glass_panes {
            dim(frame, pane.visible_in(area));
        }
        draw_overlay(frame, &overlay, area);
    }
}

fn draw_chrome(frame: &mut Frame<'_>, shell: &DemoShell) {
    let layout = shell.layout();
    if !shell.maximized() {
        let help: Vec<Line> = shell
            .bindings()
            .help_entries()
            .into_iter()
            .map(|(action, combos)| Line::from(format!("{:<8} {}", combos.join("/"), short(action))))
            .collect();
        frame.render_widget(
            Paragraph::new(help).block(Block::default().title("Keys").borders(Borders::ALL)),
            layout.sidebar,
        );
        let lines: Vec<Line> = shell
            .log()
            .map(|log| log.tail(layout.log.height.saturating_sub(2) as usize))
            .unwrap_or_default()
            .into_iter()
            .map(Line::from)
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().title("Log").borders(Borders::ALL)),
            layout.log,
        );
    }

    let tab_style = if shell.view_active() {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let tabs = Rect::new(layout.main_part.x, layout.main_part.y, layout.main_part.width, 1);
    frame.render_widget(Paragraph::new(" main view ").style(tab_style), tabs);
    frame.render_widget(
        Paragraph::new(shell.status())
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Right),
        layout.main_view,
    );
    frame.render_widget(
        Paragraph::new("[ anchor ]").style(Style::default().add_modifier(Modifier::BOLD)),
        layout.button,
    );
}

fn short(action: Action) -> &'static str {
    match action {
        Action::Dismiss => "dismiss",
        Action::FocusNext => "next",
        Action::FocusPrev => "prev",
        Action::Quit => "quit",
        Action::OpenDialog => "dialog",
        Action::OpenAppDialog => "app dialog",
        Action::OpenNestedDialog => "nested",
        Action::OpenPopup => "popup",
        Action::OpenNotification => "notify",
        Action::ToggleViewActive => "view on/off",
        Action::ToggleMaximize => "maximize",
        Action::CloseAll => "close all",
    }
}

fn dim(frame: &mut Frame<'_>, rect: Rect) {
    let buffer = frame.buffer_mut();
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    for y in rect.y..rect.y.saturating_add(rect.height) {
        for x in rect.x..rect.x.saturating_add(rect.width) {
            if let Some(cell) = buffer.cell_mut((x, y)) {
                cell.set_style(dim_style);
            }
        }
    }
}

fn draw_overlay(frame: &mut Frame<'_>, overlay: &OverlayDraw, area: Rect) {
    let rect = overlay.bounds.visible_in(area);
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    frame.render_widget(Clear, rect);
    let border = match (overlay.focused, overlay.interactive) {
        (true, _) => Style::default().fg(Color::Yellow),
        (false, true) => Style::default(),
        (false, false) => Style::default().fg(Color::DarkGray),
    };
    let bg = match overlay.kind {
        OverlayKind::Dialog => Color::Black,
        OverlayKind::Popup => Color::DarkGray,
        OverlayKind::Notification => Color::Blue,
    };
    let block = Block::default()
        .title(overlay.label.as_str())
        .borders(Borders::ALL)
        .border_style(border);
    frame.render_widget(
        Paragraph::new(body(overlay))
            .style(Style::default().bg(bg))
            .block(block)
            .wrap(Wrap { trim: true }),
        rect,
    );
}

fn body(overlay: &OverlayDraw) -> String {
    let FloatRect {
        x,
        y,
        width,
        height,
    } = overlay.bounds;
    match overlay.kind {
        OverlayKind::Dialog => format!("{width}x{height} at {x},{y}\nEnter confirms, Esc closes"),
        OverlayKind::Popup => String::from("Esc closes"),
        OverlayKind::Notification => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::keybindings::Action;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn app_dialog_dims_the_chrome() {
        let area = Rect::new(0, 0, 100, 30);
        let mut shell = DemoShell::new(area, EngineConfig::default(), None);
        shell.apply(Action::OpenAppDialog).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw(frame, &shell)).unwrap();
        let buffer = terminal.backend().buffer();
        assert!(buffer[(0, 0)].modifier.contains(Modifier::DIM));
        let plan = shell.engine().render_plan();
        let bounds = plan[0].bounds;
        let inside = &buffer[(bounds.x as u16 + 2, bounds.y as u16 + 2)];
        assert!(!inside.modifier.contains(Modifier::DIM));
    }

    #[test]
    fn offscreen_overlay_is_skipped() {
        let area = Rect::new(0, 0, 40, 10);
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let overlay = OverlayDraw {
            id: crate::overlay::OverlayId::new(9),
            kind: OverlayKind::Popup,
            label: String::from("gone"),
            bounds: FloatRect::new(-30, -30, 10, 5),
            interactive: true,
            focused: false,
            glass_panes: Vec::new(),
        };
        terminal
            .draw(|frame| draw_overlay(frame, &overlay, area))
            .unwrap();
        assert_eq!(terminal.backend().buffer()[(0, 0)].symbol(), " ");
    }
}
