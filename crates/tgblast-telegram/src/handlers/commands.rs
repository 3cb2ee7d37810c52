use std::sync::Arc;

use teloxide::prelude::*;

use crate::router::AppState;

use super::{menu, views};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat = msg.chat.id;
    let text = msg.text().unwrap_or("");
    let (cmd, args) = parse_command(text);

    // A command always leaves any multi-step flow.
    state.clear_pending(chat.0).await;

    match cmd.as_str() {
        "start" => {
            let kb = crate::keyboards::main_keyboard(state.mailer.status().await.is_running);
            views::send_html_kb(&bot, chat, &views::welcome_text(), kb).await;
        }
        "help" => menu::show_help(&bot, chat, &state).await,
        "targets" => menu::view_targets(&bot, chat, &state).await,
        "add" => {
            if args.is_empty() {
                menu::begin_add_target(&bot, chat, &state).await;
            } else {
                menu::add_target(&bot, chat, &state, &args).await;
            }
        }
        "remove" => {
            if args.is_empty() {
                menu::begin_remove_target(&bot, chat, &state).await;
            } else {
                menu::remove_target(&bot, chat, &state, &args).await;
            }
        }
        "delay" => {
            if args.is_empty() {
                menu::begin_delay(&bot, chat, &state).await;
            } else {
                menu::set_delay(&bot, chat, &state, &args).await;
            }
        }
        "compose" => menu::begin_compose(&bot, chat, &state).await,
        "tags" => {
            if args.is_empty() {
                menu::begin_tags(&bot, chat, &state).await;
            } else {
                let names: Vec<String> = args
                    .split_whitespace()
                    .map(|s| s.to_string())
                    .collect();
                match state.mailer.append_tags(&names).await {
                    Ok(body) => {
                        views::send_html(
                            &bot,
                            chat,
                            &format!(
                                "✅ Tags added! Current message:\n\n{}",
                                tgblast_core::formatting::escape_html(&body)
                            ),
                        )
                        .await;
                    }
                    Err(e) => views::send_html(&bot, chat, &views::describe_error(&e)).await,
                }
            }
        }
        "send" => menu::send_once(&bot, chat, &state).await,
        "run" => menu::start_mailing(&bot, chat, &state).await,
        "stop" => menu::stop_mailing(&bot, chat, &state).await,
        "status" => menu::show_status(&bot, chat, &state).await,
        _ => {
            views::send_html(&bot, chat, "Unknown command. Try /help.").await;
        }
    }

    Ok(())
}
