//! Command routing and the three command handlers.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::auth::is_authorized;
use super::broadcast::broadcast;
use super::client::{ChatClient, IncomingMessage, OutgoingMessage};
use super::error::ClientError;
use super::reminder::{ReminderRequest, ReminderScheduler};
use super::roast::select_roast;
use super::timespan;
use crate::config::BotSettings;

pub const NOT_A_GROUP: &str = "This command only works in group chats.";
pub const NOT_AN_ADMIN: &str = "Only group admins can tag everyone.";
pub const APOLOGY: &str = "Sorry, something went wrong. Please try again later.";

/// A recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TagAll,
    Remind,
    Roast,
}

impl Command {
    /// Checked in this order; the first matching prefix wins.
    const ALL: [Command; 3] = [Command::TagAll, Command::Remind, Command::Roast];

    pub fn keyword(self) -> &'static str {
        match self {
            Command::TagAll => "tagall",
            Command::Remind => "remind",
            Command::Roast => "roast",
        }
    }

    /// Match already-normalized text (trimmed, lower-cased) against `prefix`.
    pub fn parse(normalized: &str, prefix: &str) -> Option<Command> {
        let rest = normalized.strip_prefix(prefix)?;
        Self::ALL.into_iter().find(|c| rest.starts_with(c.keyword()))
    }
}

pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn remind_usage(prefix: &str) -> String {
    format!(
        "Sorry, I couldn't understand the time. Try something like \
         \"{prefix}remind in 1 hour 30 minutes\" or \"{prefix}remind @friend 45s\"."
    )
}

pub fn roast_usage(prefix: &str) -> String {
    format!("Tell me who to roast: \"{prefix}roast @someone\".")
}

/// Routes incoming messages to the command handlers.
pub struct CommandDispatcher {
    client: Arc<dyn ChatClient>,
    settings: BotSettings,
    scheduler: ReminderScheduler,
}

impl CommandDispatcher {
    pub fn new(client: Arc<dyn ChatClient>, settings: BotSettings) -> Self {
        Self {
            client,
            settings,
            scheduler: ReminderScheduler::new(),
        }
    }

    /// Entry point for every incoming message. Never fails: handler errors are
    /// logged and answered with an apology.
    pub async fn handle_incoming_message(&self, msg: IncomingMessage) {
        let normalized = normalize(&msg.text);
        let Some(command) = Command::parse(&normalized, &self.settings.command_prefix) else {
            return;
        };

        info!(
            "Command {:?} from {} ({}) in chat {}",
            command, msg.sender.handle, msg.sender.user_id, msg.chat_id
        );

        let result = match command {
            Command::TagAll => self.tag_all(&msg).await,
            Command::Remind => self.remind(&msg, &normalized).await,
            Command::Roast => self.roast(&msg).await,
        };

        if let Err(e) = result {
            error!("{:?} failed in chat {}: {}", command, msg.chat_id, e);
            let apology = OutgoingMessage::plain(APOLOGY).reply_to(msg.message_id);
            if let Err(e) = self.client.send_message(msg.chat_id, apology).await {
                warn!("Failed to send apology to chat {}: {}", msg.chat_id, e);
            }
        }
    }

    async fn reply(&self, msg: &IncomingMessage, text: impl Into<String>) -> Result<(), ClientError> {
        let reply = OutgoingMessage::plain(text).reply_to(msg.message_id);
        self.client.send_message(msg.chat_id, reply).await
    }

    async fn tag_all(&self, msg: &IncomingMessage) -> Result<(), ClientError> {
        let chat = self.client.resolve_chat(msg).await?;
        if !chat.is_group {
            return self.reply(msg, NOT_A_GROUP).await;
        }
        if !is_authorized(msg.sender.user_id, &chat, &self.settings.super_admins) {
            info!("Refusing tag-all from {} in chat {}", msg.sender.user_id, chat.chat_id);
            return self.reply(msg, NOT_AN_ADMIN).await;
        }

        let batches = broadcast(
            self.client.as_ref(),
            chat.chat_id,
            &chat.participants,
            self.settings.batch_size,
            self.settings.batch_delay,
        )
        .await?;
        info!(
            "Tagged {} participants in {} batches in chat {}",
            chat.participants.len(),
            batches,
            chat.chat_id
        );
        Ok(())
    }

    async fn remind(&self, msg: &IncomingMessage, normalized: &str) -> Result<(), ClientError> {
        let Some(span) = timespan::parse(normalized) else {
            return self.reply(msg, remind_usage(&self.settings.command_prefix)).await;
        };

        let target = self
            .client
            .resolve_mentions(msg)
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| msg.sender.clone());

        let request = ReminderRequest { chat_id: msg.chat_id, target, span };
        self.client
            .send_message(msg.chat_id, request.confirmation().reply_to(msg.message_id))
            .await?;

        info!(
            "Scheduled reminder for {} in chat {} in {}",
            request.target.user_id,
            request.chat_id,
            span.describe()
        );
        request.submit(Arc::clone(&self.client), &self.scheduler);
        Ok(())
    }

    async fn roast(&self, msg: &IncomingMessage) -> Result<(), ClientError> {
        let Some(target) = self.client.resolve_mentions(msg).await?.into_iter().next() else {
            return self.reply(msg, roast_usage(&self.settings.command_prefix)).await;
        };

        let line = select_roast(&self.settings.roast_file).await;
        let text = format!("{} {}", target.mention_token(), line);
        self.client
            .send_message(msg.chat_id, OutgoingMessage::with_mentions(text, vec![target]))
            .await
    }
}
