//! Deferred results of opened overlays.
//!
//! Opening an overlay hands back an [`OverlayHandle`] whose `result` resolves
//! once the overlay closes. The engine keeps the sending half and fulfills it
//! exactly once, whatever the reason for closing.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use super::OverlayId;

/// How an overlay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayOutcome<T> {
    /// Closed by the user or the caller, optionally with a value. Queued
    /// overlays closed before attaching always resolve without a value.
    Closed(Option<T>),
    /// Closed through `close_with_error`.
    Failed(String),
    /// Removed because its context was destroyed or the engine went away.
    TornDown,
}

impl<T> OverlayOutcome<T> {
    pub fn value(self) -> Option<T> {
        match self {
            OverlayOutcome::Closed(value) => value,
            _ => None,
        }
    }
}

/// Awaitable side of an overlay's result.
#[derive(Debug)]
pub struct OverlayResult<T> {
    rx: oneshot::Receiver<OverlayOutcome<T>>,
    taken: bool,
}

impl<T> OverlayResult<T> {
    /// Non-blocking check; `None` while the overlay is still open and again
    /// once the outcome has been handed out.
    pub fn try_outcome(&mut self) -> Option<OverlayOutcome<T>> {
        if self.taken {
            return None;
        }
        let outcome = match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(OverlayOutcome::TornDown),
        };
        self.taken = outcome.is_some();
        outcome
    }
}

impl<T> Future for OverlayResult<T> {
    type Output = OverlayOutcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(OverlayOutcome::TornDown));
        if outcome.is_ready() {
            self.taken = true;
        }
        outcome
    }
}

/// Returned by the open calls.
#[derive(Debug)]
pub struct OverlayHandle<T> {
    pub id: OverlayId,
    pub result: OverlayResult<T>,
}

pub(crate) type ResultSender<T> = oneshot::Sender<OverlayOutcome<T>>;

pub(crate) fn result_channel<T>(id: OverlayId) -> (ResultSender<T>, OverlayHandle<T>) {
    let (tx, rx) = oneshot::channel();
    (
        tx,
        OverlayHandle {
            id,
            result: OverlayResult { rx, taken: false },
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_with_sent_outcome() {
        let (tx, mut handle) = result_channel::<u32>(OverlayId::new(1));
        assert!(handle.result.try_outcome().is_none());
        let _ = tx.send(OverlayOutcome::Closed(Some(7)));
        assert_eq!(
            handle.result.try_outcome(),
            Some(OverlayOutcome::Closed(Some(7)))
        );
    }

    #[test]
    fn dropped_sender_reads_as_torn_down() {
        let (tx, handle) = result_channel::<u32>(OverlayId::new(2));
        drop(tx);
        let outcome = futures::executor::block_on(handle.result);
        assert_eq!(outcome, OverlayOutcome::TornDown);
    }

    #[test]
    fn outcome_is_handed_out_once() {
        let (tx, mut handle) = result_channel::<u32>(OverlayId::new(3));
        let _ = tx.send(OverlayOutcome::Closed(Some(1)));
        assert_eq!(
            handle.result.try_outcome(),
            Some(OverlayOutcome::Closed(Some(1)))
        );
        assert_eq!(handle.result.try_outcome(), None);
        assert_eq!(handle.result.try_outcome(), None);
    }

    #[test]
    fn torn_down_is_reported_once() {
        let (tx, mut handle) = result_channel::<u32>(OverlayId::new(4));
        drop(tx);
        assert_eq!(handle.result.try_outcome(), Some(OverlayOutcome::TornDown));
        assert_eq!(handle.result.try_outcome(), None);
    }
}
