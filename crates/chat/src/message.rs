use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chatline_links::{ChannelDirectory, FinalLink, LinkParser};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier for one message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Out-of-band identity tying a local echo to the confirmation that replaces it.
///
/// Never derived from message content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EchoId(pub u64);

impl EchoId {
    /// Creates a typed echo identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Issues monotonically increasing message and echo identifiers.
#[derive(Debug)]
pub struct MessageIdIssuer {
    next_message: AtomicU64,
    next_echo: AtomicU64,
}

impl MessageIdIssuer {
    pub const fn new(first_message: u64) -> Self {
        Self {
            next_message: AtomicU64::new(first_message),
            next_echo: AtomicU64::new(1),
        }
    }

    pub fn next_message_id(&self) -> MessageId {
        MessageId::new(self.next_message.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn next_echo_id(&self) -> EchoId {
        EchoId::new(self.next_echo.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl Default for MessageIdIssuer {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Who wrote a message. Passed through untouched for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: u64,
    pub username: String,
    /// Hex colour such as `#250cc9`; highlighted senders carry one.
    pub colour: Option<String>,
}

impl Sender {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            colour: None,
        }
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }
}

/// Everything about a message except its identity and links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_action: bool,
    pub is_important: bool,
}

impl MessageDraft {
    pub fn new(sender: Sender, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp,
            is_action: false,
            is_important: false,
        }
    }

    /// Marks the draft as a `/me` action.
    pub fn action(mut self) -> Self {
        self.is_action = true;
        self
    }

    pub fn important(mut self) -> Self {
        self.is_important = true;
        self
    }
}

/// Whether a message is an optimistic placeholder or server-confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "echo", rename_all = "snake_case")]
pub enum Delivery {
    LocalEcho(EchoId),
    Confirmed,
}

/// Sort key shared by every message: timestamp first, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageOrderKey {
    pub timestamp: DateTime<Utc>,
    pub id: MessageId,
}

/// Immutable chat message with links computed once at construction.
///
/// A local echo is never edited. Its confirmation is a new `Message` that takes
/// over the echo's list slot, with links parsed from the final content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    id: MessageId,
    timestamp: DateTime<Utc>,
    sender: Sender,
    content: String,
    is_action: bool,
    is_important: bool,
    delivery: Delivery,
    links: Vec<FinalLink>,
}

impl Message {
    pub fn new<D>(
        id: MessageId,
        draft: MessageDraft,
        delivery: Delivery,
        parser: &LinkParser,
        directory: &D,
    ) -> Self
    where
        D: ChannelDirectory + ?Sized,
    {
        let links = parser.parse(&draft.content, directory);
        Self {
            id,
            timestamp: draft.timestamp,
            sender: draft.sender,
            content: draft.content,
            is_action: draft.is_action,
            is_important: draft.is_important,
            delivery,
            links,
        }
    }

    /// Creates a server-confirmed message.
    pub fn confirmed<D>(
        id: MessageId,
        draft: MessageDraft,
        parser: &LinkParser,
        directory: &D,
    ) -> Self
    where
        D: ChannelDirectory + ?Sized,
    {
        Self::new(id, draft, Delivery::Confirmed, parser, directory)
    }

    /// Creates a placeholder shown before the server confirms it. Its links are
    /// provisional and are recomputed by the confirmed replacement.
    pub fn local_echo<D>(
        id: MessageId,
        echo: EchoId,
        draft: MessageDraft,
        parser: &LinkParser,
        directory: &D,
    ) -> Self
    where
        D: ChannelDirectory + ?Sized,
    {
        Self::new(id, draft, Delivery::LocalEcho(echo), parser, directory)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_action(&self) -> bool {
        self.is_action
    }

    pub fn is_important(&self) -> bool {
        self.is_important
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn echo_id(&self) -> Option<EchoId> {
        match self.delivery {
            Delivery::LocalEcho(echo) => Some(echo),
            Delivery::Confirmed => None,
        }
    }

    pub fn is_local_echo(&self) -> bool {
        self.echo_id().is_some()
    }

    pub fn links(&self) -> &[FinalLink] {
        &self.links
    }

    pub fn order_key(&self) -> MessageOrderKey {
        MessageOrderKey {
            timestamp: self.timestamp,
            id: self.id,
        }
    }
}

/// Total order over messages: timestamp ascending, then id ascending.
pub fn compare(a: &Message, b: &Message) -> Ordering {
    a.order_key().cmp(&b.order_key())
}
