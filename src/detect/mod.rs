//! Detection data model and the path from a detector to the follow engine.
//!
//! - `result`: `BoundingBox`, `Detection`, `FrameDetections`
//! - `normalize`: opaque detector output into `FrameDetections`
//! - `source`: the `DetectionSource` adapter trait
//! - `sources`: recording, synthetic and mailbox-fed sources
//! - `stream`: pull-based, cancellable iteration over a source

mod normalize;
mod result;
mod source;
pub mod sources;
mod stream;

pub use normalize::{normalize_detections, RawDetection};
pub use result::{BoundingBox, Detection, FrameDetections, UNKNOWN_CLASS};
pub use source::{DetectionSource, Pull};
pub use sources::{open_source, MailboxSource, ReplaySource, SyntheticSource};
pub use stream::{CancelToken, DetectionStream};
