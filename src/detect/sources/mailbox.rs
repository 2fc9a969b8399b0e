use anyhow::Result;
use std::time::Duration;

use crate::detect::result::FrameDetections;
use crate::detect::source::{DetectionSource, Pull};
use crate::relay::{Mailbox, Recv};

/// Frames handed over by another thread (typically the relay's connection
/// loop) through a last-value-wins mailbox.
///
/// Only the newest frame is ever observed; frames published faster than the
/// consumer pulls are superseded, never queued.
pub struct MailboxSource {
    mailbox: Mailbox<FrameDetections>,
    poll_interval: Duration,
}

impl MailboxSource {
    pub fn new(mailbox: Mailbox<FrameDetections>, poll_interval: Duration) -> Self {
        Self {
            mailbox,
            poll_interval,
        }
    }

    pub fn mailbox(&self) -> &Mailbox<FrameDetections> {
        &self.mailbox
    }
}

impl DetectionSource for MailboxSource {
    fn name(&self) -> &'static str {
        "mailbox"
    }

    fn pull(&mut self) -> Result<Pull> {
        Ok(match self.mailbox.recv_timeout(self.poll_interval) {
            Recv::Value(frame) => Pull::Frame(frame),
            Recv::Timeout => Pull::Pending,
            Recv::Closed => Pull::Finished,
        })
    }

    fn close(&mut self) {
        self.mailbox.close();
    }
}
