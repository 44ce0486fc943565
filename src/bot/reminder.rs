//! Deferred reminder delivery.
//!
//! Reminders live only in memory. A restart drops every pending one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use super::client::{ChatClient, Contact, OutgoingMessage};
use super::error::ClientError;
use super::timespan::TimeSpan;

pub type ReminderFuture = Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send>>;

/// Runs detached tasks after a delay. No cancellation: once submitted, a task
/// runs to completion and its failure is only logged.
#[derive(Debug, Clone, Default)]
pub struct ReminderScheduler;

impl ReminderScheduler {
    pub fn new() -> Self {
        Self
    }

    pub fn schedule(&self, name: String, delay: Duration, task: ReminderFuture) {
        tokio::spawn(async move {
            sleep(delay).await;
            match task.await {
                Ok(()) => info!("Delivered {}", name),
                Err(e) => error!("Failed to deliver {}: {}", name, e),
            }
        });
    }
}

/// A reminder for `target` in `chat_id`.
#[derive(Debug, Clone)]
pub struct ReminderRequest {
    pub chat_id: i64,
    pub target: Contact,
    pub span: TimeSpan,
}

impl ReminderRequest {
    pub fn confirmation(&self) -> OutgoingMessage {
        OutgoingMessage::with_mentions(
            format!(
                "⏰ Okay {}, I'll remind you in {}.",
                self.target.mention_token(),
                self.span.describe()
            ),
            vec![self.target.clone()],
        )
    }

    pub fn reminder(&self) -> OutgoingMessage {
        OutgoingMessage::with_mentions(
            format!(
                "⏰ {}, this is your reminder! ({} have passed)",
                self.target.mention_token(),
                self.span.describe()
            ),
            vec![self.target.clone()],
        )
    }

    /// Hand the reminder to `scheduler`; returns immediately.
    pub fn submit(self, client: Arc<dyn ChatClient>, scheduler: &ReminderScheduler) {
        let name = format!(
            "reminder for user {} in chat {}",
            self.target.user_id, self.chat_id
        );
        let delay = self.span.as_duration();
        let task: ReminderFuture = Box::pin(async move {
            client.send_message(self.chat_id, self.reminder()).await
        });
        scheduler.schedule(name, delay, task);
    }
}
