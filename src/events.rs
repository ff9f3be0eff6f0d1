use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use crate::candidate::Candidate;

/// what the engine reports while running.
/// `Round` events arrive in strictly increasing (iteration, round) order.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// an outer iteration is about to run its generation engine (1-based)
    IterationStarted { iteration: usize },
    /// one evaluate/select cycle finished (round is 0-based)
    Round { iteration: usize, round: usize, best_score: f64 },
    /// winner appended to the card list
    Accepted { iteration: usize, score: f64, candidate: Candidate },
    /// full-resolution snapshot handed to the snapshot sink
    Snapshot { iteration: usize, path: PathBuf },
    /// run is over; `cards` accepted cards in total
    Finished { cards: usize, cancelled: bool },
}

/// receives progress events. must not block the engine.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

/// discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    #[inline]
    fn emit(&mut self, _event: ProgressEvent) {}
}

// a dropped receiver is the observer's problem, not the engine's
impl ProgressSink for mpsc::Sender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    #[inline]
    fn emit(&mut self, event: ProgressEvent) {
        (**self).emit(event);
    }
}

/// cooperative stop flag shared between the caller and the engine.
/// polled only at round and iteration boundaries.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let seen_by_engine = token.clone();
        assert!(!seen_by_engine.is_cancelled());
        token.cancel();
        assert!(seen_by_engine.is_cancelled());
    }

    #[test]
    fn test_sender_ignores_closed_channel() {
        let (mut tx, rx) = mpsc::channel();
        drop(rx);
        tx.emit(ProgressEvent::IterationStarted { iteration: 1 });
    }
}
