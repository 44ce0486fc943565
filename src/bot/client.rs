//! Chat-platform types and the client interface the command handlers talk to.

use async_trait::async_trait;

use super::error::ClientError;

/// A user as the command handlers see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub user_id: i64,
    /// User-facing name, rendered as `@handle` in mentions.
    pub handle: String,
}

impl Contact {
    pub fn new(user_id: i64, handle: impl Into<String>) -> Self {
        Self { user_id, handle: handle.into() }
    }

    pub fn mention_token(&self) -> String {
        format!("@{}", self.handle)
    }
}

/// A member of a group chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: i64,
    pub handle: String,
    pub is_admin: bool,
}

impl Participant {
    pub fn contact(&self) -> Contact {
        Contact::new(self.user_id, self.handle.clone())
    }
}

/// The chat a message came from.
#[derive(Debug, Clone)]
pub struct Chat {
    pub chat_id: i64,
    pub is_group: bool,
    /// Empty for private chats.
    pub participants: Vec<Participant>,
}

/// A mention as it appears in an incoming message, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionRef {
    /// The platform already attached the user.
    User(Contact),
    /// A bare `@username` that still has to be looked up.
    Username(String),
}

#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub is_group: bool,
    pub sender: Contact,
    pub text: String,
    /// In order of appearance.
    pub mentions: Vec<MentionRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Every mentioned contact appears here as `@handle`.
    pub text: String,
    /// Mention metadata, so the platform can turn the tokens into real tags.
    pub mentions: Vec<Contact>,
    pub reply_to: Option<i64>,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), mentions: Vec::new(), reply_to: None }
    }

    pub fn with_mentions(text: impl Into<String>, mentions: Vec<Contact>) -> Self {
        Self { text: text.into(), mentions, reply_to: None }
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// The messaging operations the commands need.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Resolve the chat `msg` was sent in, including its participants.
    async fn resolve_chat(&self, msg: &IncomingMessage) -> Result<Chat, ClientError>;

    /// Resolve the users mentioned in `msg`, in order. Unknown users are skipped.
    async fn resolve_mentions(&self, msg: &IncomingMessage) -> Result<Vec<Contact>, ClientError>;

    async fn send_message(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), ClientError>;
}
