use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Identifier of a response category in the store.
pub type CategoryId = i64;

/// Sending half of the chat event channel.
pub type EventSender = tokio::sync::mpsc::UnboundedSender<ChatEvent>;
/// Receiving half of the chat event channel.
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<ChatEvent>;

/// Where a message came from, and where a reply goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// The channel (or direct message) ID.
    pub channel_id: String,
    /// The thread to reply in, if any.
    pub thread_ts: Option<String>,
}

impl Conversation {
    /// A top-level conversation in a channel.
    pub fn channel(channel_id: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into(), thread_ts: None }
    }

    /// A conversation inside a thread.
    pub fn thread(channel_id: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_ts: Some(thread_ts.into()),
        }
    }
}

/// Everything a chat transport can report to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The transport reached the network.
    Connected,
    /// The bot is signed in and ready to receive messages.
    SignedIn { bot_user_id: String },
    /// The session ended; the runtime reconnects.
    SignedOff { reason: String },
    /// A non-fatal transport error.
    Error { message: String },
    /// A text message addressed to the bot.
    MessageReceived { conversation: Conversation, sender: String, text: String },
    /// Someone joined a conversation the bot is part of.
    ContactJoined { conversation: Conversation, contact: String },
}

/// Failures of the response resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The store could not be reached or the query failed.
    #[error("store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),
}
