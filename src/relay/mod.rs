//! Cross-process state relay.
//!
//! Detections and commands cross process boundaries over last-value-wins
//! channels: in-process as single-slot `Mailbox`es, between processes as MQTT
//! topics carrying the JSON payloads in `payload`.

mod mailbox;
pub mod mqtt;
pub mod payload;

pub use mailbox::{Mailbox, MailboxStats, Recv};
