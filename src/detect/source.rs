use anyhow::Result;

use super::result::FrameDetections;

/// Outcome of one pull from a detection source.
#[derive(Clone, Debug, PartialEq)]
pub enum Pull {
    /// A complete frame set from one detector invocation.
    Frame(FrameDetections),
    /// Nothing new yet; the source is still live.
    Pending,
    /// The upstream ended. No further frames will be produced.
    Finished,
}

/// Detection source adapter.
///
/// This is the single seam between a concrete detection backend (a model
/// runner, a recording, a message relay) and the follow engine. The only
/// capability is producing `FrameDetections` sets.
///
/// Implementations must bound the time spent in `pull`: a source waiting on
/// upstream data returns `Pull::Pending` after a short interval instead of
/// blocking indefinitely, so cancellation is observed promptly.
pub trait DetectionSource: Send {
    /// Source identifier (for logs).
    fn name(&self) -> &'static str;

    /// Produce the next frame set, if one is available.
    ///
    /// An `Err` describes a single bad item; the caller logs it and keeps
    /// pulling. Unrecoverable conditions are reported as `Pull::Finished`.
    fn pull(&mut self) -> Result<Pull>;

    /// Release any upstream resources. Called once when the stream closes.
    fn close(&mut self) {}
}

impl<S: DetectionSource + ?Sized> DetectionSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn pull(&mut self) -> Result<Pull> {
        (**self).pull()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
