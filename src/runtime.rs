//! Runtime services and shared state for the keyword-bot.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{Instrument, debug, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{ChatEvent, EventReceiver, EventSender, Res, Void},
    },
    interaction,
    resolver::Resolver,
    service::{
        chat::ChatClient,
        db::{DbClient, seed::SeedData},
    },
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the database and chat clients, and the
/// resolver. It is designed to be trivially cloneable, allowing it to be passed
/// around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The database client instance.
    pub db: DbClient,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The response resolver.
    pub resolver: Resolver,
    /// Sender for chat events, shared with the chat client.
    pub events: EventSender,
    session_ended: Arc<Notify>,
}

impl Runtime {
    /// Create a new runtime instance backed by SurrealDB and Slack.
    #[instrument(skip_all)]
    pub async fn new(config: Config, events: EventSender) -> Res<Self> {
        // Initialize the database.
        let db = DbClient::surreal(&config).await?;

        // Seed it, if asked to.
        if let Some(path) = &config.seed_path {
            SeedData::load(path)?.apply(&db).await?;
        }

        // Initialize the slack client.
        let chat = ChatClient::slack(&config, events.clone())?;

        Ok(Self::with_clients(config, db, chat, events))
    }

    /// Create a runtime instance from already-built clients.
    pub fn with_clients(config: Config, db: DbClient, chat: ChatClient, events: EventSender) -> Self {
        let resolver = Resolver::new(db.clone(), config.fallback_category_id);

        Self {
            config,
            db,
            chat,
            resolver,
            events,
            session_ended: Arc::new(Notify::new()),
        }
    }

    /// Marks the current chat session as over, so the supervisor reconnects.
    pub fn end_session(&self) {
        self.session_ended.notify_one();
    }

    /// Dispatches events and keeps the chat session alive forever.
    pub async fn start(&self, mut events: EventReceiver) -> Void {
        let dispatcher = self.clone();
        tokio::spawn(
            async move {
                while let Some(event) = events.recv().await {
                    interaction::chat_event::handle_chat_event(event, &dispatcher);
                }
            }
            .in_current_span(),
        );

        loop {
            self.connect_with_retry().await;
            self.supervise_session().await;

            info!("Reconnecting ...");
        }
    }

    /// Closes the chat session.
    pub async fn shutdown(&self) -> Void {
        self.chat.disconnect().await
    }

    /// Connects the chat client, retrying forever with a fixed delay.
    ///
    /// Every attempt disconnects first; errors from either call are logged and
    /// swallowed. Returns the number of attempts made.
    #[instrument(skip(self))]
    pub async fn connect_with_retry(&self) -> u32 {
        let delay = self.config.reconnect_delay();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if let Err(err) = self.chat.disconnect().await {
                debug!("Disconnect before attempt {} failed: {:#}", attempt, err);
            }

            info!("Connecting to the chat network (attempt {}) ...", attempt);

            match self.chat.connect().await {
                Ok(()) => return attempt,
                Err(err) => {
                    warn!("Connection attempt {} failed: {:#}", attempt, err);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Waits until the current session ends, either by a `SignedOff` event or by
    /// a failed keepalive.
    async fn supervise_session(&self) {
        tokio::select! {
            _ = self.session_ended.notified() => {}
            signalled = self.keepalive() => {
                // Consume the notification raised by our own `SignedOff`.
                if signalled {
                    self.session_ended.notified().await;
                }
            }
        }
    }

    /// Pings the chat client until a ping fails, then raises `SignedOff`.
    ///
    /// Returns whether the event reached the dispatcher.
    async fn keepalive(&self) -> bool {
        let interval = self.config.keepalive_interval();

        loop {
            tokio::time::sleep(interval).await;

            if let Err(err) = self.chat.ping().await {
                let reason = format!("{err:#}");
                return self.events.send(ChatEvent::SignedOff { reason }).is_ok();
            }

            debug!("Keepalive ping succeeded.");
        }
    }
}
