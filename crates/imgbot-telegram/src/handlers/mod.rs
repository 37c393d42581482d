//! Telegram update handlers.
//!
//! Each handler is a small adapter that pulls the text out of the update and hands it to the
//! `imgbot-core` workflow on the shared `BotContext`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;
mod text;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Incoming<'a> {
    Command(&'a str),
    Prompt(&'a str),
}

fn classify(text: &str) -> Option<Incoming<'_>> {
    if text.trim().is_empty() {
        return None;
    }
    if text.starts_with('/') {
        return Some(Incoming::Command(text));
    }
    Some(Incoming::Prompt(text))
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Only text messages are handled; stickers, photos, etc. are ignored.
    let Some(text) = msg.text() else {
        return Ok(());
    };

    match classify(text) {
        Some(Incoming::Command(cmd)) => commands::handle_command(&msg, cmd, state).await,
        Some(Incoming::Prompt(prompt)) => text::handle_text(&msg, prompt, state).await,
        None => Ok(()),
    }
}
