//! Telegram adapter (teloxide).
//!
//! This crate implements the `tgblast-core` broadcast ports over the Telegram
//! Bot API: outbound delivery, target resolution, and the operator menu.

use async_trait::async_trait;
use bytes::Bytes;

use teloxide::{prelude::*, types::InputFile, types::Recipient};

use tokio::time::sleep;

pub mod handlers;
pub mod keyboards;
pub mod router;

use tgblast_core::{
    domain::{Target, TargetId},
    errors::Error,
    ports::{BroadcastTransport, TargetResolver, TransportCapabilities},
    Result,
};

/// Telegram Bot API limits relevant to broadcasting.
const TELEGRAM_MAX_TEXT_LEN: usize = 4096;
const TELEGRAM_MAX_CAPTION_LEN: usize = 1024;
const TELEGRAM_MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

fn map_err(e: teloxide::RequestError) -> Error {
    Error::Transport(format!("telegram error: {e}"))
}

async fn with_retry<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
    Fut::IntoFuture: Send,
{
    const MAX_RETRIES: usize = 1;
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match e {
                teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                    continue;
                }
                other => return Err(map_err(other)),
            },
        }
    }
}

/// Outbound delivery over the Bot API.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(target: TargetId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(target.0)
    }
}

#[async_trait]
impl BroadcastTransport for TelegramSender {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            max_text_len: TELEGRAM_MAX_TEXT_LEN,
            max_caption_len: TELEGRAM_MAX_CAPTION_LEN,
            max_photo_bytes: TELEGRAM_MAX_PHOTO_BYTES,
        }
    }

    async fn send_text(&self, target: TargetId, body: &str) -> Result<()> {
        with_retry(|| self.bot.send_message(Self::tg_chat(target), body.to_string())).await?;
        Ok(())
    }

    async fn send_photo(&self, target: TargetId, caption: &str, photo: Bytes) -> Result<()> {
        // The attachment goes out as a visual photo with its caption in one
        // message, never as a document. The payload is sent straight from
        // memory; nothing is staged on disk.
        with_retry(|| {
            let mut req = self
                .bot
                .send_photo(Self::tg_chat(target), InputFile::memory(photo.clone()));
            if !caption.is_empty() {
                req = req.caption(caption.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}

/// What a piece of operator input resolves through.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ResolveQuery {
    Id(i64),
    Username(String),
}

/// Normalize operator input into something `get_chat` accepts.
///
/// Accepts raw ids ("-1001234..."), usernames ("@chat" or "chat"), and t.me
/// links ("https://t.me/chat", "t.me/+invitehash").
fn parse_target_input(input: &str) -> Result<ResolveQuery> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::ResolutionFailed("empty input".to_string()));
    }

    if let Some(rest) = trimmed.split("t.me/").nth(1) {
        let handle = rest
            .split('/')
            .next_back()
            .unwrap_or("")
            .trim_start_matches('+');
        if handle.is_empty() {
            return Err(Error::ResolutionFailed(input.to_string()));
        }
        return Ok(ResolveQuery::Username(format!("@{handle}")));
    }

    if let Some(handle) = trimmed.strip_prefix('@') {
        if handle.is_empty() {
            return Err(Error::ResolutionFailed(input.to_string()));
        }
        return Ok(ResolveQuery::Username(trimmed.to_string()));
    }

    if let Ok(id) = trimmed.parse::<i64>() {
        return Ok(ResolveQuery::Id(id));
    }

    // Bare word: treat as a username alias.
    Ok(ResolveQuery::Username(format!("@{trimmed}")))
}

/// Target lookup over the Bot API.
#[derive(Clone)]
pub struct TelegramResolver {
    bot: Bot,
}

impl TelegramResolver {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl TargetResolver for TelegramResolver {
    async fn resolve(&self, input: &str) -> Result<Target> {
        let query = parse_target_input(input)?;

        let chat = match &query {
            ResolveQuery::Id(id) => self.bot.get_chat(teloxide::types::ChatId(*id)).await,
            ResolveQuery::Username(name) => {
                self.bot
                    .get_chat(Recipient::ChannelUsername(name.clone()))
                    .await
            }
        }
        .map_err(|e| Error::ResolutionFailed(format!("{input}: {e}")))?;

        let username = chat.username().map(str::to_owned);
        let title = chat
            .title()
            .map(str::to_owned)
            .or_else(|| username.clone())
            .unwrap_or_else(|| chat.id.0.to_string());

        Ok(Target {
            id: TargetId(chat.id.0),
            title,
            username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_ids() {
        assert_eq!(
            parse_target_input(" -1001234567890 ").unwrap(),
            ResolveQuery::Id(-1001234567890)
        );
    }

    #[test]
    fn parses_usernames_with_and_without_at() {
        assert_eq!(
            parse_target_input("@mychat").unwrap(),
            ResolveQuery::Username("@mychat".to_string())
        );
        assert_eq!(
            parse_target_input("mychat").unwrap(),
            ResolveQuery::Username("@mychat".to_string())
        );
    }

    #[test]
    fn parses_tme_links() {
        assert_eq!(
            parse_target_input("https://t.me/mychat").unwrap(),
            ResolveQuery::Username("@mychat".to_string())
        );
        assert_eq!(
            parse_target_input("t.me/+AbCdEf123").unwrap(),
            ResolveQuery::Username("@AbCdEf123".to_string())
        );
        assert_eq!(
            parse_target_input("https://t.me/joinchat/mychat").unwrap(),
            ResolveQuery::Username("@mychat".to_string())
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_target_input("   ").is_err());
        assert!(parse_target_input("t.me/").is_err());
        assert!(parse_target_input("@").is_err());
    }
}
