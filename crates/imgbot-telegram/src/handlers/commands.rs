use std::sync::Arc;

use teloxide::prelude::*;

use imgbot_core::{bot::GENERIC_ERROR_TEXT, domain::ChatId, messaging::port::MessagingPort};

use crate::router::AppState;

pub async fn handle_command(msg: &Message, text: &str, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);

    if let Err(e) = state.ctx.handle_command(chat_id, text).await {
        tracing::error!(chat_id = chat_id.0, command = text, error = %e, "command failed");
        if let Err(e) = state.ctx.messenger.send_text(chat_id, GENERIC_ERROR_TEXT).await {
            tracing::warn!(chat_id = chat_id.0, error = %e, "failed to report command error");
        }
    }

    Ok(())
}
