//! Core components, types, and utilities for the keyword-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Chat events, conversation addresses, and result handling.

pub mod config;
pub mod types;
