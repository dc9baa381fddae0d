//! The single dispatch point for [`ChatEvent`]s.

use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::types::{ChatEvent, Conversation, Res},
    runtime::Runtime,
};

/// Handles one chat event.
///
/// Lifecycle events are handled inline. Messages and joins spawn a task so a slow
/// store or transport never blocks the dispatcher; failures in those tasks are
/// logged and never end the process.
#[instrument(skip_all)]
pub fn handle_chat_event(event: ChatEvent, runtime: &Runtime) {
    match event {
        ChatEvent::Connected => info!("Connected to the chat network."),
        ChatEvent::SignedIn { bot_user_id } => info!("Signed in as `{}`; the bot is ready.", bot_user_id),
        ChatEvent::SignedOff { reason } => {
            warn!("Signed off: {}", reason);
            runtime.end_session();
        }
        ChatEvent::Error { message } => error!("Chat transport error: {}", message),
        ChatEvent::MessageReceived { conversation, sender, text } => {
            info!("{} says: {}", sender, text);

            let runtime = runtime.clone();
            tokio::spawn(
                async move {
                    // Process the event.
                    let result = reply_to_message(&runtime, &conversation, &text).await;

                    // Log any errors.
                    if let Err(err) = &result {
                        error!("Error while handling: {:#}", err);
                    }
                }
                .in_current_span(),
            );
        }
        ChatEvent::ContactJoined { conversation, contact } => {
            info!("{} joined.", contact);

            let runtime = runtime.clone();
            tokio::spawn(
                async move {
                    if let Err(err) = welcome_contact(&runtime, &conversation).await {
                        error!("Error while welcoming `{}`: {:#}", contact, err);
                    }
                }
                .in_current_span(),
            );
        }
    }
}

/// Resolves `text` and sends the response back to `conversation`.
///
/// Returns the text that was sent, or `None` when there was nothing to say.
#[instrument(skip(runtime))]
pub async fn reply_to_message(runtime: &Runtime, conversation: &Conversation, text: &str) -> Res<Option<String>> {
    let Some(response) = runtime.resolver.resolve(text).await? else {
        debug!("No response available; staying silent.");
        return Ok(None);
    };

    let reply = format!("{}{}", runtime.config.reply_prefix, response.text);
    runtime.chat.send_message(conversation, &reply).await?;

    Ok(Some(reply))
}

/// Sends the configured welcome message, if there is one.
///
/// Returns whether a message was sent.
#[instrument(skip(runtime))]
pub async fn welcome_contact(runtime: &Runtime, conversation: &Conversation) -> Res<bool> {
    let Some(welcome) = runtime.config.welcome_message.as_deref() else {
        return Ok(false);
    };

    runtime.chat.send_message(conversation, welcome).await?;

    Ok(true)
}
