use anyhow::{anyhow, Result};
use std::path::Path;

use crate::detect::source::DetectionSource;

pub mod mailbox;
pub mod replay;
pub mod synthetic;

pub use mailbox::MailboxSource;
pub use replay::{ReplaySource, ReplayStats};
pub use synthetic::SyntheticSource;

/// Open a detection source by URI.
///
/// - `stub://<anything>`: synthetic walking subject
/// - a filesystem path: JSON-lines recording
///
/// `width`/`height` are used for frames that do not carry their own size.
/// `max_frames` only limits the synthetic source.
pub fn open_source(
    uri: &str,
    width: u32,
    height: u32,
    max_frames: Option<u64>,
) -> Result<Box<dyn DetectionSource>> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(anyhow!("detection source uri is empty"));
    }
    if uri.starts_with("stub://") {
        log::info!("detection source: synthetic ({})", uri);
        return Ok(Box::new(SyntheticSource::new(width, height, max_frames)));
    }
    if let Some((scheme, _)) = uri.split_once("://") {
        return Err(anyhow!("unsupported detection source scheme: {}", scheme));
    }
    log::info!("detection source: recording {}", uri);
    Ok(Box::new(ReplaySource::open(Path::new(uri), width, height)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn opens_stub_and_rejects_unknown_schemes() {
        assert_eq!(
            open_source("stub://walk", 640, 480, Some(1)).unwrap().name(),
            "synthetic"
        );
        let err = open_source("rtsp://camera/stream", 640, 480, None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("rtsp"));
        assert!(open_source("  ", 640, 480, None).is_err());
    }

    #[test]
    fn opens_recording_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"detections": []}}"#).unwrap();
        let source = open_source(file.path().to_str().unwrap(), 640, 480, None).unwrap();
        assert_eq!(source.name(), "replay");
        assert!(open_source("/nonexistent/recording.jsonl", 640, 480, None).is_err());
    }
}
