use std::sync::Arc;

use teloxide::prelude::*;

use imgbot_core::domain::ChatId;

use crate::router::AppState;

pub async fn handle_text(msg: &Message, text: &str, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    tracing::info!(chat_id = chat_id.0, len = text.len(), "received prompt");

    // Failures are reported to the chat inside the core workflow.
    state.ctx.handle_prompt_reporting(chat_id, text).await;
    Ok(())
}
