//! Event handling and user interactions for keyword-bot.
//!
//! This module provides functionality for handling chat events:
//! - Answering inbound messages with resolved responses
//! - Greeting contacts that join a conversation
//! - Reacting to session lifecycle changes

pub mod chat_event;
