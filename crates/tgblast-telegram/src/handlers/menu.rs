//! Menu buttons and multi-step input flows.
//!
//! The shared action functions here back both the reply-keyboard buttons and
//! the slash commands.

use std::sync::Arc;

use teloxide::{net::Download, prelude::*, types::ChatId};

use tgblast_core::formatting::{escape_html, format_delay};

use crate::keyboards;
use crate::router::{AppState, PendingInput};

use super::views;

pub async fn handle_button(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    text: &str,
) -> ResponseResult<()> {
    let chat = msg.chat.id;

    match text {
        keyboards::BTN_VIEW_TARGETS => view_targets(&bot, chat, &state).await,
        keyboards::BTN_ADD_TARGET => begin_add_target(&bot, chat, &state).await,
        keyboards::BTN_REMOVE_TARGET => begin_remove_target(&bot, chat, &state).await,
        keyboards::BTN_DELAY => begin_delay(&bot, chat, &state).await,
        keyboards::BTN_COMPOSE => begin_compose(&bot, chat, &state).await,
        keyboards::BTN_START_MAILING => start_mailing(&bot, chat, &state).await,
        keyboards::BTN_STOP_MAILING => stop_mailing(&bot, chat, &state).await,
        keyboards::BTN_SEND_ONCE => send_once(&bot, chat, &state).await,
        keyboards::BTN_ADD_TAGS => begin_tags(&bot, chat, &state).await,
        keyboards::BTN_AUTO_REPEAT => enable_auto_repeat(&bot, chat, &state).await,
        keyboards::BTN_STATUS => show_status(&bot, chat, &state).await,
        keyboards::BTN_HELP => show_help(&bot, chat, &state).await,
        keyboards::BTN_CANCEL => cancel(&bot, chat, &state).await,
        other => {
            if let Some(title) = other.strip_prefix(keyboards::REMOVE_PREFIX) {
                remove_target(&bot, chat, &state, title).await;
            } else {
                let kb = main_kb(&state).await;
                views::send_html_kb(&bot, chat, "Use the keyboard below, or /help.", kb).await;
            }
        }
    }

    Ok(())
}

pub async fn handle_pending(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    pending: PendingInput,
) -> ResponseResult<()> {
    let chat = msg.chat.id;

    if msg.text() == Some(keyboards::BTN_CANCEL) {
        cancel(&bot, chat, &state).await;
        return Ok(());
    }

    match pending {
        PendingInput::Target => pending_target(&bot, chat, &state, msg.text()).await,
        PendingInput::Delay => pending_delay(&bot, chat, &state, msg.text()).await,
        PendingInput::Message => pending_message(&bot, &msg, &state).await,
        PendingInput::Tags => pending_tags(&bot, chat, &state, msg.text()).await,
    }

    Ok(())
}

async fn main_kb(state: &AppState) -> teloxide::types::KeyboardMarkup {
    keyboards::main_keyboard(state.mailer.status().await.is_running)
}

// === Shared actions (buttons and slash commands) ===

pub async fn view_targets(bot: &Bot, chat: ChatId, state: &AppState) {
    let targets = state.mailer.list_targets().await;
    if targets.is_empty() {
        views::send_html(
            bot,
            chat,
            "❌ No targets yet. Use '➕ Add target' to add the first one.",
        )
        .await;
        return;
    }
    views::send_html(bot, chat, &views::target_list_text(&targets)).await;
}

pub async fn begin_add_target(bot: &Bot, chat: ChatId, state: &AppState) {
    state.set_pending(chat.0, PendingInput::Target).await;
    views::send_html_kb(
        bot,
        chat,
        "🔍 <b>How to add a target:</b>\n\n\
         Send a t.me link, a @username, or a numeric chat ID.\n\n\
         Press '❌ Cancel' to abort.",
        keyboards::cancel_keyboard(),
    )
    .await;
}

pub async fn add_target(bot: &Bot, chat: ChatId, state: &AppState, input: &str) {
    match state.mailer.add_target(input).await {
        Ok(target) => {
            state.clear_pending(chat.0).await;
            let kb = main_kb(state).await;
            views::send_html_kb(
                bot,
                chat,
                &format!(
                    "✅ <b>Target added!</b>\n\n<b>Title:</b> {}\n<b>ID:</b> <code>{}</code>",
                    escape_html(&target.title),
                    target.id.0
                ),
                kb,
            )
            .await;
        }
        Err(e) => views::send_html(bot, chat, &views::describe_error(&e)).await,
    }
}

pub async fn begin_remove_target(bot: &Bot, chat: ChatId, state: &AppState) {
    let targets = state.mailer.list_targets().await;
    if targets.is_empty() {
        views::send_html(bot, chat, "❌ No targets to remove.").await;
        return;
    }
    views::send_html_kb(
        bot,
        chat,
        "Pick a target to remove:",
        keyboards::remove_keyboard(&targets),
    )
    .await;
}

pub async fn remove_target(bot: &Bot, chat: ChatId, state: &AppState, matcher: &str) {
    let kb = main_kb(state).await;
    match state.mailer.remove_target(matcher).await {
        Ok(removed) => {
            views::send_html_kb(
                bot,
                chat,
                &format!("✅ Target '{}' removed!", escape_html(&removed.title)),
                kb,
            )
            .await;
        }
        Err(e) => views::send_html_kb(bot, chat, &views::describe_error(&e), kb).await,
    }
}

pub async fn begin_delay(bot: &Bot, chat: ChatId, state: &AppState) {
    state.set_pending(chat.0, PendingInput::Delay).await;
    let current = state.mailer.status().await.delay_seconds;
    views::send_html_kb(
        bot,
        chat,
        &format!(
            "⏰ Current delay: {}\n\n\
             Enter a new delay in seconds between cycles:\n\
             60 = 1 minute\n\
             300 = 5 minutes\n\
             600 = 10 minutes",
            format_delay(current)
        ),
        keyboards::cancel_keyboard(),
    )
    .await;
}

pub async fn set_delay(bot: &Bot, chat: ChatId, state: &AppState, input: &str) {
    let Ok(seconds) = input.trim().parse::<u64>() else {
        views::send_html(bot, chat, "❌ Please enter a valid number.").await;
        return;
    };
    match state.mailer.set_delay(seconds).await {
        Ok(()) => {
            state.clear_pending(chat.0).await;
            let kb = main_kb(state).await;
            views::send_html_kb(
                bot,
                chat,
                &format!("✅ Delay set to {}!", format_delay(seconds)),
                kb,
            )
            .await;
        }
        Err(e) => views::send_html(bot, chat, &views::describe_error(&e)).await,
    }
}

pub async fn begin_compose(bot: &Bot, chat: ChatId, state: &AppState) {
    state.set_pending(chat.0, PendingInput::Message).await;
    views::send_html_kb(
        bot,
        chat,
        "✏️ <b>Compose your message:</b>\n\n\
         Send either:\n\
         • the message text, or\n\
         • a photo with a caption (delivered as a visible photo)\n\n\
         This message is what every mailing cycle sends.\n\n\
         Press '❌ Cancel' to abort.",
        keyboards::cancel_keyboard(),
    )
    .await;
}

pub async fn begin_tags(bot: &Bot, chat: ChatId, state: &AppState) {
    state.set_pending(chat.0, PendingInput::Tags).await;
    views::send_html_kb(
        bot,
        chat,
        "🔖 <b>Add user tags:</b>\n\n\
         Send usernames to mention, one per line, without @:\n\n\
         username1\n\
         username2\n\n\
         Write 'done' to finish and send once, or press '❌ Cancel'.",
        keyboards::cancel_keyboard(),
    )
    .await;
}

pub async fn send_once(bot: &Bot, chat: ChatId, state: &AppState) {
    let target_count = state.mailer.status().await.target_count;
    if target_count > 0 {
        views::send_html(bot, chat, &format!("⚡ Sending to {target_count} targets...")).await;
    }

    let kb = main_kb(state).await;
    match state.mailer.run_once().await {
        Ok(report) => views::send_html_kb(bot, chat, &views::cycle_report_text(&report), kb).await,
        Err(e) => views::send_html_kb(bot, chat, &views::describe_error(&e), kb).await,
    }
}

pub async fn start_mailing(bot: &Bot, chat: ChatId, state: &AppState) {
    match state.mailer.start_auto_mailing().await {
        Ok(started) if started.already_running => {
            let kb = main_kb(state).await;
            views::send_html_kb(bot, chat, "🟢 Mailing is already running.", kb).await;
        }
        Ok(started) => {
            let kb = main_kb(state).await;
            views::send_html_kb(
                bot,
                chat,
                &format!(
                    "🟢 <b>Auto-mailing started!</b>\n\n\
                     • Delay: {}\n\
                     • Targets: {}\n\
                     • The message will be re-sent every cycle until you stop.\n\n\
                     Press '🔴 Stop mailing' to stop.",
                    format_delay(started.delay_seconds),
                    started.target_count
                ),
                kb,
            )
            .await;
        }
        Err(e) => {
            let kb = main_kb(state).await;
            views::send_html_kb(bot, chat, &views::describe_error(&e), kb).await;
        }
    }
}

pub async fn stop_mailing(bot: &Bot, chat: ChatId, state: &AppState) {
    match state.mailer.stop_auto_mailing().await {
        Ok(stopped) if stopped.was_running => {
            let kb = main_kb(state).await;
            views::send_html_kb(
                bot,
                chat,
                &format!(
                    "🔴 <b>Mailing stopped!</b>\n\nTotal cycles sent: {}",
                    stopped.total_cycles
                ),
                kb,
            )
            .await;
        }
        Ok(_) => {
            let kb = main_kb(state).await;
            views::send_html_kb(bot, chat, "Mailing is not running.", kb).await;
        }
        Err(e) => {
            let kb = main_kb(state).await;
            views::send_html_kb(bot, chat, &views::describe_error(&e), kb).await;
        }
    }
}

pub async fn enable_auto_repeat(bot: &Bot, chat: ChatId, state: &AppState) {
    if !state.mailer.status().await.has_composed_message {
        let kb = main_kb(state).await;
        views::send_html_kb(bot, chat, "❌ Compose a message first.", kb).await;
        return;
    }
    let _ = state.mailer.set_auto_repeat(true).await;
    let kb = main_kb(state).await;
    views::send_html_kb(
        bot,
        chat,
        "🔄 Auto-repeat enabled! Start mailing to begin.",
        kb,
    )
    .await;
}

pub async fn show_status(bot: &Bot, chat: ChatId, state: &AppState) {
    let status = state.mailer.status().await;
    views::send_html(bot, chat, &views::status_text(&status)).await;
}

pub async fn show_help(bot: &Bot, chat: ChatId, state: &AppState) {
    let kb = main_kb(state).await;
    views::send_html_kb(bot, chat, &views::help_text(), kb).await;
}

pub async fn cancel(bot: &Bot, chat: ChatId, state: &AppState) {
    state.clear_pending(chat.0).await;
    let kb = main_kb(state).await;
    views::send_html_kb(bot, chat, "❌ Cancelled.", kb).await;
}

// === Pending-input steps ===

async fn pending_target(bot: &Bot, chat: ChatId, state: &AppState, text: Option<&str>) {
    let Some(text) = text else {
        views::send_html(bot, chat, "Send a t.me link, @username, or chat ID.").await;
        return;
    };
    add_target(bot, chat, state, text).await;
}

async fn pending_delay(bot: &Bot, chat: ChatId, state: &AppState, text: Option<&str>) {
    let Some(text) = text else {
        views::send_html(bot, chat, "❌ Please enter a valid number.").await;
        return;
    };
    set_delay(bot, chat, state, text).await;
}

async fn pending_message(bot: &Bot, msg: &Message, state: &AppState) {
    let chat = msg.chat.id;

    if let Some(text) = msg.text() {
        state.mailer.set_text_message(text).await;
        state.clear_pending(chat.0).await;
        views::send_html_kb(
            bot,
            chat,
            "✅ Text message saved!\n\nWhat next?",
            keyboards::compose_keyboard(),
        )
        .await;
        return;
    }

    if let Some(photos) = msg.photo() {
        let caption = msg.caption().unwrap_or("").to_string();
        let data = match download_photo(bot, photos).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "photo download failed");
                views::send_html(bot, chat, "❌ Failed to download the photo. Try again.").await;
                return;
            }
        };

        match state
            .mailer
            .set_photo_message(caption, bytes::Bytes::from(data))
            .await
        {
            Ok(()) => {
                state.clear_pending(chat.0).await;
                views::send_html_kb(
                    bot,
                    chat,
                    "✅ Photo with caption saved!\n\nWhat next?",
                    keyboards::compose_keyboard(),
                )
                .await;
            }
            Err(e) => views::send_html(bot, chat, &views::describe_error(&e)).await,
        }
        return;
    }

    views::send_html(bot, chat, "Send the message text, or a photo with a caption.").await;
}

async fn pending_tags(bot: &Bot, chat: ChatId, state: &AppState, text: Option<&str>) {
    let Some(text) = text else {
        views::send_html(bot, chat, "Send usernames, one per line, or 'done'.").await;
        return;
    };

    if text.trim().eq_ignore_ascii_case("done") {
        state.clear_pending(chat.0).await;
        send_once(bot, chat, state).await;
        return;
    }

    let names: Vec<String> = text
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    match state.mailer.append_tags(&names).await {
        Ok(body) => {
            views::send_html_kb(
                bot,
                chat,
                &format!(
                    "✅ Tags added! Current message:\n\n{}\n\n\
                     Send more usernames, or write 'done' to send.",
                    escape_html(&body)
                ),
                keyboards::cancel_keyboard(),
            )
            .await;
        }
        Err(e) => {
            state.clear_pending(chat.0).await;
            let kb = main_kb(state).await;
            views::send_html_kb(bot, chat, &views::describe_error(&e), kb).await;
        }
    }
}

/// Download the largest available size of an incoming photo into memory.
async fn download_photo(
    bot: &Bot,
    photos: &[teloxide::types::PhotoSize],
) -> anyhow::Result<Vec<u8>> {
    let best = photos
        .last()
        .ok_or_else(|| anyhow::anyhow!("no photo sizes"))?;
    let file = bot.get_file(best.file.id.clone()).await?;

    let mut buf: Vec<u8> = Vec::new();
    bot.download_file(&file.path, &mut buf).await?;
    Ok(buf)
}
