//! Slack Socket Mode implementation of the chat transport.

use crate::base::{
    config::Config,
    types::{ChatEvent, Conversation, EventSender, Res, Void},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;
type Listener = SlackClientSocketModeListener<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client that reports to `events`.
    pub fn slack(config: &Config, events: EventSender) -> Res<Self> {
        let client = SlackChatClient::new(config, events)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    events: EventSender,
    bot_user_id: String,
}

impl SlackUserState {
    fn emit(&self, event: ChatEvent) {
        emit(&self.events, event);
    }
}

/// Sends an event to the dispatcher, warning if it has stopped.
fn emit(events: &EventSender, event: ChatEvent) {
    if events.send(event).is_err() {
        warn!("Dropping chat event because the dispatcher has stopped.");
    }
}

/// Slack client implementation.
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    client: Arc<FullClient>,
    events: EventSender,
    listener: Mutex<Option<Arc<Listener>>>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    ///
    /// No network traffic happens until [`GenericChatClient::connect`].
    #[instrument(name = "SlackChatClient::new", skip_all)]
    fn new(config: &Config, events: EventSender) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        Ok(Self {
            app_token,
            bot_token,
            client,
            events,
            listener: Mutex::new(None),
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    #[instrument(skip(self))]
    async fn connect(&self) -> Void {
        // Get the bot's user ID; this also proves the bot token works.

        let session = self.client.open_session(&self.bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);
        emit(&self.events, ChatEvent::Connected);

        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            events: self.events.clone(),
            bot_user_id: bot_user_id.clone(),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment,
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events, then open the web sockets.
        socket_mode_listener.listen_for(&self.app_token).await?;
        socket_mode_listener.start().await;

        *self.listener.lock().await = Some(socket_mode_listener);
        emit(&self.events, ChatEvent::SignedIn { bot_user_id });

        Ok(())
    }

    #[instrument(skip(self))]
    async fn disconnect(&self) -> Void {
        if let Some(listener) = self.listener.lock().await.take() {
            info!("Shutting down the socket mode listener ...");
            listener.shutdown().await;
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> Void {
        let session = self.client.open_session(&self.bot_token);

        let _ = session.auth_test().await.map_err(|e| anyhow::anyhow!("Keepalive ping failed: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_message(&self, conversation: &Conversation, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(conversation.channel_id.clone()), message);
        if let Some(thread_ts) = &conversation.thread_ts {
            request = request.with_thread_ts(SlackTs(thread_ts.clone()));
        }

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }
}

// Helpers.

/// Decodes the three entities Slack escapes in message text.
///
/// `&amp;` goes last so that an escaped entity (`&amp;lt;`) stays literal.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// Removes `<@bot>` mentions from a message and trims what is left.
pub fn strip_mention(text: &str, bot_user_id: &str) -> String {
    text.replace(&format!("<@{bot_user_id}>"), "").trim().to_string()
}

/// The conversation a reply should go to: the thread if there is one, else the channel.
fn reply_target(channel_id: String, thread_ts: Option<SlackTs>) -> Conversation {
    match thread_ts {
        Some(ts) => Conversation::thread(channel_id, ts.0),
        None => Conversation::channel(channel_id),
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack by translating them into [`ChatEvent`]s.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Ok(raw) = serde_json::to_string(&event_callback) {
        trace!("[PUSH] {}", raw);
    }

    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    if let Some(event) = translate_push_event(event_callback.event, &user_state.bot_user_id) {
        user_state.emit(event);
    }

    Ok(())
}

/// Maps one Slack push event onto the [`ChatEvent`] the runtime should see, if any.
fn translate_push_event(event: SlackEventCallbackBody, bot_user_id: &str) -> Option<ChatEvent> {
    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            // Ignore edits, deletions, joins, and the like; keep subtypes that carry user text.
            let carries_user_text = matches!(
                slack_message_event.subtype,
                None | Some(SlackMessageEventType::ThreadBroadcast | SlackMessageEventType::FileShare)
            );
            if !carries_user_text {
                debug!("Skipping message event with subtype {:?}.", slack_message_event.subtype);
                return None;
            }

            // Ignore ourselves and other bots.
            let sender = slack_message_event.sender.user.as_ref().map(|u| u.0.clone()).unwrap_or_default();
            if slack_message_event.sender.bot_id.is_some() || sender == bot_user_id {
                debug!("Skipping message event from a bot.");
                return None;
            }

            // If the message @mentions the bot, skip, and let the app mention handler take care of it.
            let text = slack_message_event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default();
            if text.contains(&format!("<@{bot_user_id}>")) {
                debug!("Skipping message event because it mentions the bot.");
                return None;
            }

            let Some(channel) = slack_message_event.origin.channel.as_ref() else {
                return Some(ChatEvent::Error {
                    message: "Received a message event without a channel.".to_string(),
                });
            };

            Some(ChatEvent::MessageReceived {
                conversation: reply_target(channel.0.clone(), slack_message_event.origin.thread_ts.clone()),
                sender,
                text: unescape(&text),
            })
        }
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            let origin = slack_app_mention_event.origin;
            let thread_ts = origin.thread_ts.unwrap_or(origin.ts);
            let text = slack_app_mention_event.content.text.as_deref().unwrap_or_default();

            Some(ChatEvent::MessageReceived {
                conversation: Conversation::thread(slack_app_mention_event.channel.0, thread_ts.0),
                sender: slack_app_mention_event.user.0,
                text: unescape(&strip_mention(text, bot_user_id)),
            })
        }
        SlackEventCallbackBody::MemberJoinedChannel(slack_member_joined_event) => {
            if slack_member_joined_event.user.0 == bot_user_id {
                return None;
            }

            Some(ChatEvent::ContactJoined {
                conversation: Conversation::channel(slack_member_joined_event.channel.0),
                contact: slack_member_joined_event.user.0,
            })
        }
        _ => {
            debug!("Received unhandled push event.");
            None
        }
    }
}

// Tests.
