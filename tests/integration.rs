#![cfg(test)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use keyword_bot::{
    base::{
        config::{Config, ConfigInner},
        types::{ChatEvent, Conversation, Void},
    },
    interaction::chat_event::{handle_chat_event, reply_to_message, welcome_contact},
    runtime::Runtime,
    service::{
        chat::{ChatClient, GenericChatClient},
        db::{DbClient, KeywordRule, ResponseEntry, seed::SeedData},
    },
};
use mockall::mock;
use tokio::sync::mpsc;

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn connect(&self) -> Void;
        async fn disconnect(&self) -> Void;
        async fn ping(&self) -> Void;
        async fn send_message(&self, conversation: &Conversation, text: &str) -> Void;
    }
}

/// The sample deployment: one keyword, its category, and the fallback category.
fn sample_seed() -> SeedData {
    SeedData {
        keywords: vec![KeywordRule {
            rule_id: 1,
            keyword_text: "weather".to_string(),
            category_id: 3,
        }],
        responses: vec![
            ResponseEntry {
                category_id: 3,
                response_id: 1,
                response_text: "It's sunny today!".to_string(),
            },
            ResponseEntry {
                category_id: 5,
                response_id: 1,
                response_text: "I don't understand.".to_string(),
            },
        ],
    }
}

/// Helper function to setup the test environment.
async fn setup_test_environment(chat: MockChat, seed: SeedData, welcome_message: Option<&str>) -> Runtime {
    let config = Config::from(ConfigInner {
        slack_app_token: "xapp-test".to_string(),
        slack_bot_token: "xoxb-test".to_string(),
        welcome_message: welcome_message.map(str::to_string),
        ..Default::default()
    });

    // Initialize the database (using in-memory for tests).
    let db = DbClient::surreal_memory().await.expect("Failed to create DB client");
    seed.apply(&db).await.expect("Failed to seed DB");

    let (events, _) = mpsc::unbounded_channel();

    Runtime::with_clients(config, db, ChatClient::new(Arc::new(chat)), events)
}

#[tokio::test]
async fn test_keyword_reply_integration() {
    let mut chat = MockChat::new();
    chat.expect_send_message()
        .withf(|conversation, text| conversation.channel_id == "C01TEST" && text == "->It's sunny today!")
        .times(1)
        .returning(|_, _| Ok(()));

    let runtime = setup_test_environment(chat, sample_seed(), None).await;

    let sent = reply_to_message(&runtime, &Conversation::channel("C01TEST"), "what's the weather like").await.unwrap();

    assert_eq!(sent.as_deref(), Some("->It's sunny today!"));
}

#[tokio::test]
async fn test_fallback_reply_integration() {
    let mut chat = MockChat::new();
    chat.expect_send_message()
        .withf(|_, text| text == "->I don't understand.")
        .times(1)
        .returning(|_, _| Ok(()));

    let runtime = setup_test_environment(chat, sample_seed(), None).await;

    let sent = reply_to_message(&runtime, &Conversation::channel("C01TEST"), "tell me a joke").await.unwrap();

    assert_eq!(sent.as_deref(), Some("->I don't understand."));
}

#[tokio::test]
async fn test_case_insensitive_reply_integration() {
    let mut chat = MockChat::new();
    chat.expect_send_message().withf(|_, text| text == "->It's sunny today!").times(1).returning(|_, _| Ok(()));

    let runtime = setup_test_environment(chat, sample_seed(), None).await;

    reply_to_message(&runtime, &Conversation::channel("C01TEST"), "WEATHER report please").await.unwrap();
}

#[tokio::test]
async fn test_silence_without_fallback_integration() {
    let mut chat = MockChat::new();
    chat.expect_send_message().never();

    let seed = SeedData {
        keywords: Vec::new(),
        responses: vec![ResponseEntry {
            category_id: 3,
            response_id: 1,
            response_text: "It's sunny today!".to_string(),
        }],
    };
    let runtime = setup_test_environment(chat, seed, None).await;

    let sent = reply_to_message(&runtime, &Conversation::channel("C01TEST"), "tell me a joke").await.unwrap();

    assert!(sent.is_none());
}

#[tokio::test]
async fn test_reply_goes_to_the_thread_integration() {
    let mut chat = MockChat::new();
    chat.expect_send_message()
        .withf(|conversation, text| *conversation == Conversation::thread("C01TEST", "1234567890.123456") && text == "->It's sunny today!")
        .times(1)
        .returning(|_, _| Ok(()));

    let runtime = setup_test_environment(chat, sample_seed(), None).await;

    reply_to_message(&runtime, &Conversation::thread("C01TEST", "1234567890.123456"), "weather?").await.unwrap();
}

#[tokio::test]
async fn test_welcome_integration() {
    let mut chat = MockChat::new();
    chat.expect_send_message().withf(|_, text| text == "Hello! Ask me anything.").times(1).returning(|_, _| Ok(()));

    let runtime = setup_test_environment(chat, sample_seed(), Some("Hello! Ask me anything.")).await;

    assert!(welcome_contact(&runtime, &Conversation::channel("C01TEST")).await.unwrap());
}

#[tokio::test]
async fn test_no_welcome_without_message_integration() {
    let mut chat = MockChat::new();
    chat.expect_send_message().never();

    let runtime = setup_test_environment(chat, sample_seed(), None).await;

    assert!(!welcome_contact(&runtime, &Conversation::channel("C01TEST")).await.unwrap());
}

#[tokio::test]
async fn test_dispatch_survives_send_failures_integration() {
    let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<String>();

    let mut chat = MockChat::new();
    chat.expect_send_message().returning(move |_, text| {
        let _ = sent_tx.send(text.to_string());
        Err(anyhow::anyhow!("channel_not_found"))
    });

    let runtime = setup_test_environment(chat, sample_seed(), None).await;

    // Two independent messages; the first failing to send must not stop the second.
    for text in ["weather?", "a joke"] {
        handle_chat_event(
            ChatEvent::MessageReceived {
                conversation: Conversation::channel("C01TEST"),
                sender: "U54321".to_string(),
                text: text.to_string(),
            },
            &runtime,
        );
    }

    let mut sent = Vec::new();
    for _ in 0..2 {
        let text = tokio::time::timeout(Duration::from_secs(5), sent_rx.recv()).await.expect("Timed out waiting for a reply").unwrap();
        sent.push(text);
    }
    sent.sort();

    assert_eq!(sent, vec!["->I don't understand.".to_string(), "->It's sunny today!".to_string()]);
}

#[tokio::test]
async fn test_resolve_once_with_seed_file_integration() {
    let path = std::env::temp_dir().join(format!("keyword-bot-integration-seed-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        r#"
[[keywords]]
rule_id = 1
keyword_text = "pizza"
category_id = 2

[[responses]]
category_id = 2
response_id = 1
response_text = "Pepperoni, please."

[[responses]]
category_id = 5
response_id = 1
response_text = "I don't understand."
"#,
    )
    .unwrap();

    let config = Config::from(ConfigInner {
        seed_path: Some(path.clone()),
        ..Default::default()
    });

    let matched = keyword_bot::resolve_once(config.clone(), "I love PIZZA").await.unwrap();
    let fallback = keyword_bot::resolve_once(config, "hello").await.unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(matched.as_deref(), Some("Pepperoni, please."));
    assert_eq!(fallback.as_deref(), Some("I don't understand."));
}
