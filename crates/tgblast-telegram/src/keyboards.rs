//! Operator reply keyboards.

use teloxide::types::{KeyboardButton, KeyboardMarkup};

use tgblast_core::domain::Target;

pub const BTN_VIEW_TARGETS: &str = "📋 View targets";
pub const BTN_ADD_TARGET: &str = "➕ Add target";
pub const BTN_REMOVE_TARGET: &str = "🗑 Remove target";
pub const BTN_DELAY: &str = "⏰ Delay";
pub const BTN_COMPOSE: &str = "✏️ Compose message";
pub const BTN_START_MAILING: &str = "🟢 Start mailing";
pub const BTN_STOP_MAILING: &str = "🔴 Stop mailing";
pub const BTN_SEND_ONCE: &str = "📤 Send once";
pub const BTN_STATUS: &str = "📊 Status";
pub const BTN_HELP: &str = "❓ Help";
pub const BTN_CANCEL: &str = "❌ Cancel";
pub const BTN_ADD_TAGS: &str = "✅ Add tags";
pub const BTN_AUTO_REPEAT: &str = "🔄 Auto-repeat";

/// Prefix for the per-target buttons of the removal keyboard.
pub const REMOVE_PREFIX: &str = "🗑 ";

pub fn main_keyboard(is_running: bool) -> KeyboardMarkup {
    let mailing_toggle = if is_running {
        BTN_STOP_MAILING
    } else {
        BTN_START_MAILING
    };

    KeyboardMarkup::new([
        [
            KeyboardButton::new(BTN_VIEW_TARGETS),
            KeyboardButton::new(BTN_ADD_TARGET),
        ],
        [
            KeyboardButton::new(BTN_REMOVE_TARGET),
            KeyboardButton::new(BTN_DELAY),
        ],
        [
            KeyboardButton::new(BTN_COMPOSE),
            KeyboardButton::new(mailing_toggle),
        ],
        [
            KeyboardButton::new(BTN_SEND_ONCE),
            KeyboardButton::new(BTN_STATUS),
        ],
        [KeyboardButton::new(BTN_HELP), KeyboardButton::new(BTN_CANCEL)],
    ])
    .resize_keyboard(true)
}

pub fn cancel_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new([[KeyboardButton::new(BTN_CANCEL)]]).resize_keyboard(true)
}

pub fn compose_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new([
        [
            KeyboardButton::new(BTN_ADD_TAGS),
            KeyboardButton::new(BTN_SEND_ONCE),
        ],
        [
            KeyboardButton::new(BTN_AUTO_REPEAT),
            KeyboardButton::new(BTN_CANCEL),
        ],
    ])
    .resize_keyboard(true)
}

/// One button per target, plus Cancel.
pub fn remove_keyboard(targets: &[Target]) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = targets
        .iter()
        .map(|t| vec![KeyboardButton::new(format!("{REMOVE_PREFIX}{}", t.title))])
        .collect();
    rows.push(vec![KeyboardButton::new(BTN_CANCEL)]);
    KeyboardMarkup::new(rows).resize_keyboard(true)
}
