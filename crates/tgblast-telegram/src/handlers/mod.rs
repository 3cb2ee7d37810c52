//! Telegram update handlers.
//!
//! Each incoming message is gated on the operator check, then routed: slash
//! commands first, then any pending multi-step input, then menu buttons.

use std::sync::Arc;

use teloxide::prelude::*;

use crate::router::AppState;

mod commands;
mod menu;
mod views;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0 as i64);
    if !state.cfg.is_operator(user_id) {
        let _ = bot
            .send_message(msg.chat.id, "❌ Unauthorized. This bot is private.")
            .await;
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(bot, msg, state).await;
        }
    }

    let chat_id = msg.chat.id.0;
    if let Some(pending) = state.pending_for(chat_id).await {
        return menu::handle_pending(bot, msg, state, pending).await;
    }

    if let Some(text) = msg.text() {
        let text = text.to_string();
        return menu::handle_button(bot, msg, state, &text).await;
    }

    // Photos (and anything else) outside a compose flow get a hint.
    let _ = bot
        .send_message(
            msg.chat.id,
            "To broadcast a photo, press '✏️ Compose message' first.",
        )
        .await;

    Ok(())
}
