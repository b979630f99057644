use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chatline_links::{LinkConfig, LinkParser};
use snafu::{ResultExt, ensure};
use tokio::sync::mpsc;

use crate::channel::ChannelManager;
use crate::error::{BuildParserSnafu, ChatResult, QueueClosedSnafu, TornDownSnafu};
use crate::list::{MessageList, ReplaceOutcome};
use crate::message::{EchoId, Message, MessageDraft, MessageId, MessageIdIssuer};
use crate::scheduler::{ScheduledHandle, Scheduler};

/// Mutation requests drained by the timeline's single dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// A confirmed message arrived from the transport.
    Post { id: MessageId, draft: MessageDraft },
    /// The server confirmed a local echo; `draft` carries the final content.
    ConfirmEcho {
        echo: EchoId,
        id: MessageId,
        draft: MessageDraft,
    },
}

/// Owns the message list and is its only writer.
///
/// Deferred confirmations and transport deliveries become [`ChatCommand`]s on a
/// queue; nothing touches the list until the owner drains that queue with
/// [`process_pending`](Self::process_pending) or
/// [`next_command`](Self::next_command) plus [`apply`](Self::apply).
pub struct ChatTimeline {
    parser: LinkParser,
    channels: Arc<ChannelManager>,
    issuer: MessageIdIssuer,
    messages: MessageList,
    scheduler: Arc<dyn Scheduler>,
    pending: HashMap<EchoId, ScheduledHandle>,
    command_tx: mpsc::UnboundedSender<ChatCommand>,
    command_rx: mpsc::UnboundedReceiver<ChatCommand>,
    torn_down: bool,
}

impl ChatTimeline {
    pub fn new(
        parser: LinkParser,
        channels: Arc<ChannelManager>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Self {
            parser,
            channels,
            issuer: MessageIdIssuer::default(),
            messages: MessageList::new(),
            scheduler,
            pending: HashMap::new(),
            command_tx,
            command_rx,
            torn_down: false,
        }
    }

    pub fn with_config(
        config: LinkConfig,
        channels: Arc<ChannelManager>,
        scheduler: Arc<dyn Scheduler>,
    ) -> ChatResult<Self> {
        let parser = LinkParser::new(config).context(BuildParserSnafu {
            stage: "timeline-build-parser",
        })?;
        Ok(Self::new(parser, channels, scheduler))
    }

    pub fn messages(&self) -> &MessageList {
        &self.messages
    }

    pub fn channels(&self) -> &Arc<ChannelManager> {
        &self.channels
    }

    /// Sender for transports that deliver messages from other tasks.
    pub fn command_sender(&self) -> mpsc::UnboundedSender<ChatCommand> {
        self.command_tx.clone()
    }

    /// Number of echoes with a confirmation scheduled but not yet applied.
    pub fn pending_confirmations(&self) -> usize {
        self.pending.len()
    }

    /// Inserts a confirmed message and returns its index.
    pub fn post(&mut self, id: MessageId, draft: MessageDraft) -> ChatResult<usize> {
        ensure!(!self.torn_down, TornDownSnafu { stage: "post" });
        Ok(self.insert_confirmed(id, draft))
    }

    /// Shows `draft` immediately as a local echo and returns the identity its
    /// confirmation must quote.
    pub fn post_local_echo(&mut self, draft: MessageDraft) -> ChatResult<EchoId> {
        ensure!(
            !self.torn_down,
            TornDownSnafu {
                stage: "post-local-echo"
            }
        );

        let echo = self.issuer.next_echo_id();
        let id = self.issuer.next_message_id();
        let snapshot = self.channels.snapshot();
        let message = Message::local_echo(id, echo, draft, &self.parser, snapshot.as_ref());
        let index = self.messages.insert(message);
        tracing::debug!(echo = ?echo, index, "posted local echo");
        Ok(echo)
    }

    /// Queues the confirmation of `echo` after `delay`.
    ///
    /// Scheduling again for the same echo replaces (and cancels) the earlier one.
    pub fn schedule_confirmation(
        &mut self,
        echo: EchoId,
        delay: Duration,
        id: MessageId,
        draft: MessageDraft,
    ) -> ChatResult<()> {
        ensure!(
            !self.command_tx.is_closed(),
            QueueClosedSnafu {
                stage: "schedule-confirmation",
            }
        );

        let command_tx = self.command_tx.clone();
        let handle = self.scheduler.schedule(
            delay,
            Box::new(move || {
                if command_tx
                    .send(ChatCommand::ConfirmEcho { echo, id, draft })
                    .is_err()
                {
                    tracing::debug!(echo = ?echo, "timeline gone before confirmation fired");
                }
            }),
        );
        self.pending.insert(echo, handle);
        Ok(())
    }

    /// Replaces the local echo with its confirmed message, linkified from the
    /// final content. A missing echo is a no-op.
    pub fn confirm_echo(
        &mut self,
        echo: EchoId,
        id: MessageId,
        draft: MessageDraft,
    ) -> ReplaceOutcome {
        // Dropping the handle also stops a timer that has not fired yet.
        self.pending.remove(&echo);
        let confirmed = self.build_confirmed(id, draft);
        self.messages.replace_echo(echo, confirmed)
    }

    /// Applies one command. Does nothing once the timeline is torn down.
    pub fn apply(&mut self, command: ChatCommand) {
        if self.torn_down {
            tracing::debug!(command = ?command, "ignoring command after teardown");
            return;
        }

        match command {
            ChatCommand::Post { id, draft } => {
                self.insert_confirmed(id, draft);
            }
            ChatCommand::ConfirmEcho { echo, id, draft } => {
                let outcome = self.confirm_echo(echo, id, draft);
                tracing::debug!(echo = ?echo, outcome = ?outcome, "applied echo confirmation");
            }
        }
    }

    /// Applies every queued command without waiting and returns how many ran.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.command_rx.try_recv() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    /// Waits for the next queued command. The caller applies it.
    pub async fn next_command(&mut self) -> Option<ChatCommand> {
        self.command_rx.recv().await
    }

    /// Cancels every scheduled confirmation, closes the queue and discards the
    /// commands still buffered in it, then clears the list. Later posts fail and
    /// later commands are ignored. Returns how many callbacks were stopped
    /// before firing.
    pub fn teardown(&mut self) -> usize {
        self.torn_down = true;
        let cancelled = self
            .pending
            .drain()
            .map(|(_, mut handle)| handle.cancel())
            .filter(|stopped| *stopped)
            .count();

        self.command_rx.close();
        let mut discarded = 0;
        while self.command_rx.try_recv().is_ok() {
            discarded += 1;
        }

        self.messages.clear();
        tracing::info!(cancelled, discarded, "chat timeline torn down");
        cancelled
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn insert_confirmed(&mut self, id: MessageId, draft: MessageDraft) -> usize {
        let message = self.build_confirmed(id, draft);
        self.messages.insert(message)
    }

    fn build_confirmed(&self, id: MessageId, draft: MessageDraft) -> Message {
        let snapshot = self.channels.snapshot();
        Message::confirmed(id, draft, &self.parser, snapshot.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use chatline_links::LinkAction;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

    use super::*;
    use crate::message::Sender;
    use crate::scheduler::TokioScheduler;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + ChronoDuration::milliseconds(millis)
    }

    fn draft(content: &str, millis: i64) -> MessageDraft {
        MessageDraft::new(Sender::new(1, "Somebody"), content, at(millis))
    }

    fn timeline() -> ChatTimeline {
        let channels = Arc::new(ChannelManager::new(["#english", "#japanese"]));
        let scheduler = Arc::new(TokioScheduler::current().unwrap());
        ChatTimeline::with_config(LinkConfig::default(), channels, scheduler).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn echo_is_replaced_once_the_confirmation_fires() {
        let mut timeline = timeline();
        let echo = timeline.post_local_echo(draft("sent!", 0)).unwrap();
        timeline
            .schedule_confirmation(
                echo,
                Duration::from_millis(250),
                MessageId::new(1000),
                draft("received!", 0),
            )
            .unwrap();
        assert_eq!(timeline.process_pending(), 0);
        assert!(timeline.messages().get(0).unwrap().is_local_echo());

        let command = timeline.next_command().await.unwrap();
        timeline.apply(command);

        let message = timeline.messages().get(0).unwrap();
        assert!(!message.is_local_echo());
        assert_eq!(message.content(), "received!");
        assert_eq!(message.id(), MessageId::new(1000));
        assert_eq!(timeline.messages().len(), 1);
        assert_eq!(timeline.pending_confirmations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmations_arrive_in_delay_order() {
        let mut timeline = timeline();
        let slow = timeline
            .post_local_echo(draft("https://dev.ppy.sh/home", 0))
            .unwrap();
        let fast = timeline
            .post_local_echo(draft("[https://dev.ppy.sh/forum let's try]", 1))
            .unwrap();
        timeline
            .schedule_confirmation(
                slow,
                Duration::from_millis(500),
                MessageId::new(10),
                draft("https://dev.ppy.sh/home", 0),
            )
            .unwrap();
        timeline
            .schedule_confirmation(
                fast,
                Duration::from_millis(250),
                MessageId::new(11),
                draft("[https://dev.ppy.sh/forum let's try]", 1),
            )
            .unwrap();

        let first = timeline.next_command().await.unwrap();
        assert!(matches!(first, ChatCommand::ConfirmEcho { echo, .. } if echo == fast));
        timeline.apply(first);
        let second = timeline.next_command().await.unwrap();
        timeline.apply(second);

        assert!(timeline.messages().iter().all(|message| !message.is_local_echo()));
        assert!(timeline.messages().is_sorted());
        let forum = timeline.messages().get(1).unwrap();
        assert_eq!(forum.links()[0].display_text, "let's try");
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_confirmations() {
        let mut timeline = timeline();
        let echo = timeline.post_local_echo(draft("sent!", 0)).unwrap();
        timeline
            .schedule_confirmation(
                echo,
                Duration::from_millis(250),
                MessageId::new(5),
                draft("sent!", 0),
            )
            .unwrap();

        assert_eq!(timeline.teardown(), 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(timeline.process_pending(), 0);
        assert!(timeline.messages().is_empty());

        let result =
            timeline.schedule_confirmation(echo, Duration::ZERO, MessageId::new(6), draft("x", 0));
        assert!(matches!(
            result,
            Err(crate::error::ChatError::QueueClosed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_discards_buffered_commands_and_rejects_posts() {
        let mut timeline = timeline();
        let sender = timeline.command_sender();
        sender
            .send(ChatCommand::Post {
                id: MessageId::new(1),
                draft: draft("queued before teardown", 0),
            })
            .unwrap();

        timeline.teardown();
        assert!(timeline.is_torn_down());
        assert_eq!(timeline.process_pending(), 0);
        assert!(timeline.messages().is_empty());
        let rejected = sender.send(ChatCommand::Post {
            id: MessageId::new(2),
            draft: draft("after teardown", 0),
        });
        assert!(rejected.is_err());

        timeline.apply(ChatCommand::Post {
            id: MessageId::new(3),
            draft: draft("applied by hand", 0),
        });
        assert!(timeline.messages().is_empty());
        assert!(matches!(
            timeline.post(MessageId::new(4), draft("late", 0)),
            Err(crate::error::ChatError::TornDown { .. })
        ));
        assert!(matches!(
            timeline.post_local_echo(draft("late", 0)),
            Err(crate::error::ChatError::TornDown { .. })
        ));
        assert!(timeline.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn confirming_a_removed_echo_is_a_no_op() {
        let mut timeline = timeline();
        timeline.post(MessageId::new(1), draft("hello", 0)).unwrap();
        let outcome =
            timeline.confirm_echo(EchoId::new(99), MessageId::new(2), draft("gone", 10));
        assert_eq!(outcome, ReplaceOutcome::Missing);
        assert_eq!(timeline.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_confirmation_stops_the_timer() {
        let mut timeline = timeline();
        let echo = timeline.post_local_echo(draft("sent!", 0)).unwrap();
        timeline
            .schedule_confirmation(
                echo,
                Duration::from_millis(250),
                MessageId::new(7),
                draft("late", 0),
            )
            .unwrap();

        let outcome = timeline.confirm_echo(echo, MessageId::new(7), draft("now", 0));
        assert_eq!(outcome, ReplaceOutcome::InPlace { index: 0 });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(timeline.process_pending(), 0);
        assert_eq!(timeline.messages().get(0).unwrap().content(), "now");
    }

    #[tokio::test(start_paused = true)]
    async fn transport_posts_go_through_the_queue() {
        let mut timeline = timeline();
        let sender = timeline.command_sender();
        sender
            .send(ChatCommand::Post {
                id: MessageId::new(3),
                draft: draft("Join my #english or #nonexistent #hashtag channels.", 0),
            })
            .unwrap();
        assert!(timeline.messages().is_empty());

        assert_eq!(timeline.process_pending(), 1);
        let links = timeline.messages().get(0).unwrap().links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].action, LinkAction::OpenChannel);
    }

    #[tokio::test(start_paused = true)]
    async fn channel_added_later_links_only_new_messages() {
        let mut timeline = timeline();
        timeline.post(MessageId::new(1), draft("#lobby", 0)).unwrap();
        timeline.channels().add("#lobby");
        timeline.post(MessageId::new(2), draft("#lobby", 1)).unwrap();

        assert!(timeline.messages().get(0).unwrap().links().is_empty());
        assert_eq!(timeline.messages().get(1).unwrap().links().len(), 1);
    }
}
