use std::cmp::Ordering;

use crate::message::{EchoId, Message, MessageId, compare};

/// Where a confirmed message ended up when it replaced its local echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The confirmation still sorts between its neighbours and took the echo's slot.
    InPlace { index: usize },
    /// The confirmation's order key moved it; the echo slot was removed.
    Moved { from: usize, to: usize },
    /// No echo with that identity is in the list. Nothing changed.
    Missing,
}

/// Message list kept sorted by [`compare`] after every mutation.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after any messages with an equal order key and returns the index.
    pub fn insert(&mut self, message: Message) -> usize {
        let index = self
            .messages
            .partition_point(|existing| compare(existing, &message) != Ordering::Greater);
        self.messages.insert(index, message);
        index
    }

    /// Swaps the local echo identified by `echo` for its confirmed message.
    pub fn replace_echo(&mut self, echo: EchoId, confirmed: Message) -> ReplaceOutcome {
        let Some(index) = self.position_of_echo(echo) else {
            tracing::debug!(echo = ?echo, "no local echo to replace");
            return ReplaceOutcome::Missing;
        };

        let fits_after_previous = index == 0
            || compare(&self.messages[index - 1], &confirmed) != Ordering::Greater;
        let fits_before_next = self
            .messages
            .get(index + 1)
            .is_none_or(|next| compare(&confirmed, next) != Ordering::Greater);

        if fits_after_previous && fits_before_next {
            self.messages[index] = confirmed;
            tracing::debug!(echo = ?echo, index, "replaced local echo in place");
            return ReplaceOutcome::InPlace { index };
        }

        self.messages.remove(index);
        let to = self.insert(confirmed);
        tracing::debug!(echo = ?echo, from = index, to, "replaced local echo and moved it");
        ReplaceOutcome::Moved { from: index, to }
    }

    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|message| message.id() == id)?;
        Some(self.messages.remove(index))
    }

    pub fn position_of_echo(&self, echo: EchoId) -> Option<usize> {
        self.messages
            .iter()
            .position(|message| message.echo_id() == Some(echo))
    }

    pub fn is_sorted(&self) -> bool {
        self.messages
            .is_sorted_by(|a, b| compare(a, b) != Ordering::Greater)
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl<'a> IntoIterator for &'a MessageList {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use chatline_links::{LinkConfig, LinkParser, NoChannels};
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::message::{MessageDraft, Sender};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn parser() -> LinkParser {
        LinkParser::new(LinkConfig::default()).unwrap()
    }

    fn confirmed(parser: &LinkParser, id: u64, seconds: i64) -> Message {
        let draft = MessageDraft::new(Sender::new(1, "Somebody"), format!("#{id}"), at(seconds));
        Message::confirmed(MessageId::new(id), draft, parser, &NoChannels)
    }

    fn echo(parser: &LinkParser, id: u64, echo: u64, seconds: i64) -> Message {
        let draft = MessageDraft::new(Sender::new(1, "Somebody"), "sent!", at(seconds));
        Message::local_echo(MessageId::new(id), EchoId::new(echo), draft, parser, &NoChannels)
    }

    fn ids(list: &MessageList) -> Vec<u64> {
        list.iter().map(|message| message.id().0).collect()
    }

    #[test]
    fn insert_keeps_order_and_appends_after_equal_keys() {
        let parser = parser();
        let mut list = MessageList::new();
        assert_eq!(list.insert(confirmed(&parser, 3, 30)), 0);
        assert_eq!(list.insert(confirmed(&parser, 1, 10)), 0);
        assert_eq!(list.insert(confirmed(&parser, 2, 30)), 1);
        assert_eq!(list.insert(confirmed(&parser, 4, 30)), 3);

        assert_eq!(ids(&list), vec![1, 2, 3, 4]);
        assert!(list.is_sorted());
    }

    #[test]
    fn confirmation_takes_the_echo_slot() {
        let parser = parser();
        let mut list = MessageList::new();
        list.insert(confirmed(&parser, 1, 10));
        list.insert(echo(&parser, 50, 1, 20));
        list.insert(confirmed(&parser, 2, 30));

        let outcome = list.replace_echo(EchoId::new(1), confirmed(&parser, 60, 20));
        assert_eq!(outcome, ReplaceOutcome::InPlace { index: 1 });
        assert_eq!(ids(&list), vec![1, 60, 2]);
        assert!(list.position_of_echo(EchoId::new(1)).is_none());
    }

    #[test]
    fn late_confirmation_moves_to_keep_order() {
        let parser = parser();
        let mut list = MessageList::new();
        list.insert(echo(&parser, 50, 1, 5));
        list.insert(confirmed(&parser, 1, 10));
        list.insert(confirmed(&parser, 2, 20));

        let outcome = list.replace_echo(EchoId::new(1), confirmed(&parser, 3, 25));
        assert_eq!(outcome, ReplaceOutcome::Moved { from: 0, to: 2 });
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert!(list.is_sorted());
    }

    #[test]
    fn replacing_a_removed_echo_is_a_no_op() {
        let parser = parser();
        let mut list = MessageList::new();
        list.insert(echo(&parser, 50, 1, 5));
        list.insert(confirmed(&parser, 1, 10));
        assert!(list.remove(MessageId::new(50)).is_some());

        let outcome = list.replace_echo(EchoId::new(1), confirmed(&parser, 2, 5));
        assert_eq!(outcome, ReplaceOutcome::Missing);
        assert_eq!(ids(&list), vec![1]);
    }

    #[test]
    fn stays_sorted_under_interleaved_inserts_and_replacements() {
        let parser = parser();
        let mut list = MessageList::new();
        let mut seed = 0x2545_f491_u64;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        let mut next_id = 1;
        let mut open_echoes = Vec::new();
        for step in 0..400 {
            let roll = next();
            let seconds = (roll % 60) as i64;
            match roll % 3 {
                0 => {
                    list.insert(confirmed(&parser, next_id, seconds));
                }
                1 => {
                    list.insert(echo(&parser, next_id, step, seconds));
                    open_echoes.push(step);
                }
                _ => {
                    if let Some(echo_id) = open_echoes.pop() {
                        let confirmation = confirmed(&parser, next_id, seconds);
                        list.replace_echo(EchoId::new(echo_id), confirmation);
                    }
                }
            }
            next_id += 1;
            assert!(list.is_sorted(), "unsorted after step {step}");
        }
    }
}
