use std::io;
use std::time::Duration;

use crossterm::event::Event;

use crate::drivers::InputDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

/// Single-threaded input pump.
///
/// The handler sees `None` once per tick (the shell redraws there) and
/// `Some(event)` for each input event. Bursts are drained before the next
/// tick so drags and scrolls never lag behind the pointer.
pub struct EventLoop<D> {
    driver: D,
    poll_interval: Duration,
}

impl<D: InputDriver> EventLoop<D> {
    pub fn new(driver: D, poll_interval: Duration) -> Self {
        Self {
            driver,
            poll_interval,
        }
    }

    pub fn poll(&mut self) -> io::Result<Option<Event>> {
        if self.driver.poll(self.poll_interval)? {
            Ok(Some(self.driver.read()?))
        } else {
            Ok(None)
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn run<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: FnMut(&mut D, Option<Event>) -> io::Result<ControlFlow>,
    {
        loop {
            if handler(&mut self.driver, None)? == ControlFlow::Quit {
                return Ok(());
            }
            if !self.driver.poll(self.poll_interval)? {
                continue;
            }
            loop {
                let event = self.driver.read()?;
                if handler(&mut self.driver, Some(event))? == ControlFlow::Quit {
                    return Ok(());
                }
                if !self.driver.poll(Duration::ZERO)? {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ScriptedInputDriver;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn burst_is_drained_before_next_tick() {
        let driver = ScriptedInputDriver::new([key('a'), key('b'), key('q')]);
        let mut event_loop = EventLoop::new(driver, Duration::ZERO);
        let mut seen = Vec::new();
        event_loop
            .run(|_, event| {
                let Some(Event::Key(key)) = event else {
                    seen.push('.');
                    return Ok(ControlFlow::Continue);
                };
                let KeyCode::Char(c) = key.code else {
                    return Ok(ControlFlow::Continue);
                };
                seen.push(c);
                Ok(if c == 'q' {
                    ControlFlow::Quit
                } else {
                    ControlFlow::Continue
                })
            })
            .unwrap();
        assert_eq!(seen, vec!['.', 'a', 'b', 'q']);
        assert_eq!(event_loop.driver().remaining(), 0);
    }

    #[test]
    fn tick_can_quit_without_input() {
        let mut event_loop = EventLoop::new(ScriptedInputDriver::new([key('x')]), Duration::ZERO);
        let mut ticks = 0;
        event_loop
            .run(|_, event| {
                assert!(event.is_none());
                ticks += 1;
                Ok(ControlFlow::Quit)
            })
            .unwrap();
        assert_eq!(ticks, 1);
        assert_eq!(event_loop.into_driver().remaining(), 1);
    }

    #[test]
    fn poll_returns_none_when_idle() {
        let mut event_loop = EventLoop::new(ScriptedInputDriver::default(), Duration::ZERO);
        assert!(event_loop.poll().unwrap().is_none());
        event_loop.driver().push(key('k'));
        assert_eq!(event_loop.poll().unwrap(), Some(key('k')));
    }
}
