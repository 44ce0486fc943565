//! Telegram implementation of the chat client, using teloxide.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatKind, ChatMemberKind, MessageEntityKind, MessageId, ParseMode, ReplyParameters, User};
use teloxide::utils::html;
use tracing::{debug, info, warn};

use super::client::{Chat, ChatClient, Contact, IncomingMessage, MentionRef, OutgoingMessage, Participant};
use super::error::ClientError;
use super::roster::{Roster, RosterEntry};

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
    roster: Arc<Roster>,
    dry_run: bool,
}

impl TelegramClient {
    pub fn new(bot: Bot, roster: Arc<Roster>, dry_run: bool) -> Self {
        Self { bot, roster, dry_run }
    }
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn resolve_chat(&self, msg: &IncomingMessage) -> Result<Chat, ClientError> {
        if !msg.is_group {
            return Ok(Chat { chat_id: msg.chat_id, is_group: false, participants: Vec::new() });
        }

        let admins = self
            .bot
            .get_chat_administrators(ChatId(msg.chat_id))
            .await
            .map_err(|e| {
                warn!("Failed to get chat admins for {}: {e}", msg.chat_id);
                ClientError::request("get_chat_administrators", e)
            })?;
        let admins: Vec<RosterEntry> = admins
            .iter()
            .filter(|m| !m.user.is_bot)
            .filter(|m| matches!(m.kind, ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_)))
            .map(|m| roster_entry(&m.user))
            .collect();

        let members = self.roster.members(msg.chat_id)?;
        let participants = merge_participants(members, &admins);
        debug!("Resolved {} participants in chat {}", participants.len(), msg.chat_id);

        Ok(Chat { chat_id: msg.chat_id, is_group: true, participants })
    }

    async fn resolve_mentions(&self, msg: &IncomingMessage) -> Result<Vec<Contact>, ClientError> {
        let mut contacts = Vec::with_capacity(msg.mentions.len());
        for mention in &msg.mentions {
            match mention {
                MentionRef::User(contact) => contacts.push(contact.clone()),
                MentionRef::Username(name) => match self.roster.find_by_username(msg.chat_id, name)? {
                    Some(entry) => contacts.push(Contact::new(entry.user_id, entry.handle())),
                    None => debug!("Unknown mention {} in chat {}", name, msg.chat_id),
                },
            }
        }
        Ok(contacts)
    }

    async fn send_message(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), ClientError> {
        let text = render_html(&message);

        if self.dry_run {
            info!("[DRY RUN] Would send to chat {}: {}", chat_id, text);
            return Ok(());
        }

        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);

        if let Some(msg_id) = message.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|_| ()).map_err(|e| {
            warn!("Failed to send to chat {}: {e}", chat_id);
            ClientError::request("send_message", e)
        })
    }
}

/// Roster members first, in first-seen order, then admins the roster has not seen yet.
fn merge_participants(members: Vec<RosterEntry>, admins: &[RosterEntry]) -> Vec<Participant> {
    let admin_ids: HashSet<i64> = admins.iter().map(|a| a.user_id).collect();
    let mut seen = HashSet::with_capacity(members.len());

    let mut participants: Vec<Participant> = members
        .iter()
        .filter(|m| seen.insert(m.user_id))
        .map(|m| Participant {
            user_id: m.user_id,
            handle: m.handle().to_string(),
            is_admin: admin_ids.contains(&m.user_id),
        })
        .collect();

    participants.extend(admins.iter().filter(|a| seen.insert(a.user_id)).map(|a| Participant {
        user_id: a.user_id,
        handle: a.handle().to_string(),
        is_admin: true,
    }));

    participants
}

/// HTML-escape the text and turn each mentioned `@handle` into a user link.
///
/// Mentions are matched left to right, one occurrence each.
pub fn render_html(message: &OutgoingMessage) -> String {
    let text = html::escape(&message.text);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for contact in &message.mentions {
        let token = html::escape(&contact.mention_token());
        let Some(offset) = text[cursor..].find(&token) else {
            continue;
        };
        let start = cursor + offset;
        out.push_str(&text[cursor..start]);
        out.push_str(&format!("<a href=\"tg://user?id={}\">{}</a>", contact.user_id, token));
        cursor = start + token.len();
    }

    out.push_str(&text[cursor..]);
    out
}

pub fn roster_entry(user: &User) -> RosterEntry {
    RosterEntry {
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
    }
}

fn contact(user: &User) -> Contact {
    let entry = roster_entry(user);
    Contact::new(entry.user_id, entry.handle())
}

/// Convert a Telegram text message. `None` for messages without text or sender.
pub fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let sender = msg.from.as_ref()?;
    let text = msg.text()?;

    let mentions = msg
        .parse_entities()
        .unwrap_or_default()
        .iter()
        .filter_map(|entity| match entity.kind() {
            MessageEntityKind::TextMention { user } => Some(MentionRef::User(contact(user))),
            MessageEntityKind::Mention => Some(MentionRef::Username(entity.text().to_string())),
            _ => None,
        })
        .collect();

    Some(IncomingMessage {
        message_id: msg.id.0 as i64,
        chat_id: msg.chat.id.0,
        is_group: matches!(msg.chat.kind, ChatKind::Public(_)),
        sender: contact(sender),
        text: text.to_string(),
        mentions,
    })
}
