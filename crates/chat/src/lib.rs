#![deny(unsafe_code)]

//! Chat message model and the single-writer timeline that keeps it ordered.

mod channel;
mod error;
mod list;
mod message;
mod scheduler;
mod timeline;

pub use channel::{ChannelManager, ChannelSet};
pub use error::{ChatError, ChatResult};
pub use list::{MessageList, ReplaceOutcome};
pub use message::{
    Delivery, EchoId, Message, MessageDraft, MessageId, MessageIdIssuer, MessageOrderKey,
    Sender, compare,
};
pub use scheduler::{Callback, ScheduledHandle, Scheduler, TokioScheduler};
pub use timeline::{ChatCommand, ChatTimeline};
