use std::io;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use indoc::indoc;
use ratatui::prelude::Rect;
use tracing::Level;

use term_overlay::config::{EngineConfig, ModalScope};
use term_overlay::drivers::InputDriver;
use term_overlay::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use term_overlay::event_loop::{ControlFlow, EventLoop};
use term_overlay::log_buffer::{LogHandle, set_global_log};
use term_overlay::shell::{DemoShell, render};
use term_overlay::tracing_sub;

const AFTER_HELP: &str = indoc! {"
    Keys:
      d        open a dialog blocking the main view
      a        open an application-blocking dialog
      D        open a dialog on top of the focused overlay
      p        open a popup anchored to the button
      n        show a notification
      v        toggle main view activation
      m        toggle main area maximized
      x        close every overlay of the main view
      Esc      dismiss the focused overlay
      Ctrl+q   quit
"};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScopeArg {
    Workbench,
    Viewport,
}

impl From<ScopeArg> for ModalScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Workbench => ModalScope::Workbench,
            ScopeArg::Viewport => ModalScope::Viewport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "term-overlay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive demo of modal dialogs, popups and notifications over a panel layout",
    after_help = AFTER_HELP
)]
struct Args {
    /// What application-blocking dialogs dim.
    #[arg(long = "modal-scope", value_enum, default_value_t = ScopeArg::Workbench)]
    modal_scope: ScopeArg,

    /// Horizontal cascade step for stacked dialogs, in cells.
    #[arg(long = "cascade-x", value_name = "CELLS", default_value_t = 2)]
    cascade_x: i32,

    /// Vertical cascade step for stacked dialogs, in cells.
    #[arg(long = "cascade-y", value_name = "CELLS", default_value_t = 1)]
    cascade_y: i32,

    /// Most verbose level shown in the log panel.
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Debug)]
    log_level: LogLevel,

    /// Lines of log output kept for the log panel.
    #[arg(long = "log-lines", value_name = "LINES", default_value_t = 500)]
    log_lines: usize,

    /// Input poll interval in milliseconds.
    #[arg(long = "tick", value_name = "MS", default_value_t = 16)]
    tick_ms: u64,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            modal_scope: self.modal_scope.into(),
            cascade_offset: (self.cascade_x, self.cascade_y),
            ..EngineConfig::default()
        }
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let log = LogHandle::new(args.log_lines);
    set_global_log(log.clone());
    tracing_sub::init(args.log_level.into());

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let mut input = ConsoleInputDriver::new();
    input.set_mouse_capture(true)?;

    let (width, height) = crossterm::terminal::size()?;
    let mut shell = DemoShell::new(
        Rect::new(0, 0, width, height),
        args.engine_config(),
        Some(log),
    );
    tracing::info!(?args, "overlay demo started");

    let mut event_loop = EventLoop::new(input, Duration::from_millis(args.tick_ms));
    let result = event_loop.run(|_, event| match event {
        None => {
            output.draw(|frame| render::draw(frame, &shell))?;
            Ok(ControlFlow::Continue)
        }
        Some(event) => shell.handle_event(event).map_err(io::Error::other),
    });

    event_loop.driver().set_mouse_capture(false)?;
    output.exit()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_flag_maps_to_tracing_level() {
        let args = Args::try_parse_from(["term-overlay"]).unwrap();
        assert_eq!(Level::from(args.log_level), Level::DEBUG);
        let args = Args::try_parse_from(["term-overlay", "--log-level", "warn"]).unwrap();
        assert_eq!(Level::from(args.log_level), Level::WARN);
        assert!(Args::try_parse_from(["term-overlay", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn viewport_scope_flag_reaches_engine_config() {
        let args = Args::try_parse_from(["term-overlay", "--modal-scope", "viewport"]).unwrap();
        assert_eq!(args.engine_config().modal_scope, ModalScope::Viewport);
    }
}
