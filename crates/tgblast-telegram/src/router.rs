use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;
use tracing::info;

use tgblast_core::{
    config::Config,
    mailer::Mailer,
    ports::BroadcastTransport,
    storage::{JsonSettingsStore, JsonTargetStore},
    throttle::{ThrottleConfig, ThrottledTransport},
};

use crate::{handlers, TelegramResolver, TelegramSender};

/// What the next free-form message from a chat is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingInput {
    Target,
    Delay,
    Message,
    Tags,
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub mailer: Mailer,
    /// Per-chat multi-step input state for the menu flows.
    pub pending: Arc<Mutex<HashMap<i64, PendingInput>>>,
}

impl AppState {
    pub async fn pending_for(&self, chat_id: i64) -> Option<PendingInput> {
        self.pending.lock().await.get(&chat_id).copied()
    }

    pub async fn set_pending(&self, chat_id: i64, input: PendingInput) {
        self.pending.lock().await.insert(chat_id, input);
    }

    pub async fn clear_pending(&self, chat_id: i64) {
        self.pending.lock().await.remove(&chat_id);
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!(bot = me.username(), "tgblast started");
    }

    let raw: Arc<dyn BroadcastTransport> = Arc::new(TelegramSender::new(bot.clone()));
    let transport: Arc<dyn BroadcastTransport> = if cfg.throttle_sends {
        Arc::new(ThrottledTransport::new(raw, ThrottleConfig::default()))
    } else {
        raw
    };

    let mailer = Mailer::load(
        transport,
        Arc::new(TelegramResolver::new(bot.clone())),
        Arc::new(JsonTargetStore::new(cfg.targets_file.clone())),
        Arc::new(JsonSettingsStore::new(cfg.settings_file.clone())),
        cfg.max_concurrent_sends,
    )
    .await;

    let status = mailer.status().await;
    info!(
        targets = status.target_count,
        delay_seconds = status.delay_seconds,
        total_cycles = status.total_cycles_sent,
        "state loaded"
    );

    let state = Arc::new(AppState {
        cfg,
        mailer,
        pending: Arc::new(Mutex::new(HashMap::new())),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
