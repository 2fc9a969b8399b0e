//! Recorded detection source.
//!
//! Replays detections captured from a detector, one frame per line, each line
//! being a detections payload as published on the relay
//! (`{"width": .., "height": .., "detections": [..]}`).
//! Blank lines and lines starting with `#` are ignored.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::detect::source::{DetectionSource, Pull};
use crate::relay::payload::decode_frame;

/// Statistics for a replay source.
#[derive(Clone, Debug)]
pub struct ReplayStats {
    pub frames_read: u64,
    pub lines_read: u64,
    pub label: String,
}

/// Line-delimited detection recording.
pub struct ReplaySource {
    label: String,
    reader: Option<Box<dyn BufRead + Send>>,
    width: u32,
    height: u32,
    lines_read: u64,
    frames_read: u64,
}

impl ReplaySource {
    /// Open a recording on disk. Frames without explicit dimensions get
    /// `width` x `height`.
    pub fn open(path: &Path, width: u32, height: u32) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open detection recording {}", path.display()))?;
        Ok(Self::from_reader(
            path.display().to_string(),
            BufReader::new(file),
            width,
            height,
        ))
    }

    pub fn from_reader<R>(label: impl Into<String>, reader: R, width: u32, height: u32) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            label: label.into(),
            reader: Some(Box::new(reader)),
            width,
            height,
            lines_read: 0,
            frames_read: 0,
        }
    }

    pub fn stats(&self) -> ReplayStats {
        ReplayStats {
            frames_read: self.frames_read,
            lines_read: self.lines_read,
            label: self.label.clone(),
        }
    }
}

impl DetectionSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn pull(&mut self) -> Result<Pull> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(Pull::Finished);
        };

        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    log::info!(
                        "ReplaySource: end of {} after {} frames",
                        self.label,
                        self.frames_read
                    );
                    self.reader = None;
                    return Ok(Pull::Finished);
                }
                Ok(_) => {
                    self.lines_read += 1;
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    let frame = decode_frame(trimmed.as_bytes(), self.width, self.height)
                        .with_context(|| format!("{}:{}", self.label, self.lines_read))?;
                    self.frames_read += 1;
                    return Ok(Pull::Frame(frame));
                }
                Err(e) => {
                    log::warn!("ReplaySource: read error on {}: {}", self.label, e);
                    self.reader = None;
                    return Ok(Pull::Finished);
                }
            }
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            log::debug!("ReplaySource: closed {}", self.label);
        }
    }
}
