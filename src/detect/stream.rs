use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::result::FrameDetections;
use super::source::{DetectionSource, Pull};

/// Shared stop flag for a `DetectionStream`.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pull-based sequence of frame detection sets.
///
/// The consumer drives the producer: a frame is only pulled from the source
/// when the iterator is advanced. Cancelling the token (from any thread) or
/// dropping the stream closes the source, so no further frames are fed.
pub struct DetectionStream<S: DetectionSource> {
    source: S,
    cancel: CancelToken,
    closed: bool,
    frames_yielded: u64,
    errors: u64,
}

impl<S: DetectionSource> DetectionStream<S> {
    pub fn new(source: S) -> Self {
        Self::with_cancel(source, CancelToken::new())
    }

    pub fn with_cancel(source: S, cancel: CancelToken) -> Self {
        Self {
            source,
            cancel,
            closed: false,
            frames_yielded: 0,
            errors: 0,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn frames_yielded(&self) -> u64 {
        self.frames_yielded
    }

    /// Items the source failed to produce (logged and skipped).
    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop the stream and release the source. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source.close();
        log::info!(
            "detection stream ({}) closed after {} frames",
            self.source.name(),
            self.frames_yielded
        );
    }
}

impl<S: DetectionSource> Iterator for DetectionStream<S> {
    type Item = FrameDetections;

    fn next(&mut self) -> Option<FrameDetections> {
        loop {
            if self.closed {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.close();
                return None;
            }
            match self.source.pull() {
                Ok(Pull::Frame(frame)) => {
                    self.frames_yielded += 1;
                    return Some(frame);
                }
                Ok(Pull::Pending) => continue,
                Ok(Pull::Finished) => {
                    self.close();
                    return None;
                }
                Err(e) => {
                    self.errors += 1;
                    log::warn!("detection source {}: {:#}", self.source.name(), e);
                }
            }
        }
    }
}

impl<S: DetectionSource> Drop for DetectionStream<S> {
    fn drop(&mut self) {
        self.close();
    }
}
