//! Completion signal: resolves once per play-through.
//!
//! An instance owns a [`CompletionSlot`]. When it completes, the slot's sender
//! fires and the slot is replaced by a fresh one, so callers awaiting an earlier
//! [`Completion`] see that play-through finish while later calls observe the next.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

/// Awaitable completion of one play-through.
///
/// Resolves to `Err(Canceled)` if the owning instance is dropped first.
#[derive(Clone)]
pub struct Completion {
    signal: Shared<oneshot::Receiver<()>>,
}

impl Completion {
    /// Whether the play-through this handle tracks has completed.
    pub fn is_resolved(&self) -> bool {
        matches!(self.signal.clone().now_or_never(), Some(Ok(())))
    }
}

impl Future for Completion {
    type Output = Result<(), oneshot::Canceled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.signal.poll_unpin(cx)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

pub(crate) struct CompletionSlot {
    sender: Option<oneshot::Sender<()>>,
    signal: Shared<oneshot::Receiver<()>>,
}

impl CompletionSlot {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            sender: Some(sender),
            signal: receiver.shared(),
        }
    }

    /// Handle on the current play-through.
    pub(crate) fn completion(&self) -> Completion {
        Completion {
            signal: self.signal.clone(),
        }
    }

    /// Resolve the current signal and re-arm with a fresh one.
    pub(crate) fn resolve(&mut self) {
        if let Some(sender) = self.sender.take() {
            // Nobody listening is fine.
            let _ = sender.send(());
        }
        *self = Self::new();
    }
}

impl Default for CompletionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSlot")
            .field("armed", &self.sender.is_some())
            .finish()
    }
}
