//! Chat service integration for keyword-bot.
//!
//! This module provides functionality for interacting with chat platforms like Slack:
//! - Opening and closing a session
//! - Delivering inbound traffic as [`ChatEvent`](crate::base::types::ChatEvent)s
//! - Sending text messages

pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Conversation, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// Implementations push inbound events into the event channel they were built with;
/// this trait only covers the calls the runtime makes into the transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Open a session and start delivering events.
    ///
    /// Returns once the bot is signed in, or with the error that prevented it.
    async fn connect(&self) -> Void;

    /// Close the current session, if any.
    async fn disconnect(&self) -> Void;

    /// Check that the session is still alive.
    async fn ping(&self) -> Void;

    /// Send a text message to a conversation.
    async fn send_message(&self, conversation: &Conversation, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
