use serde::{Deserialize, Serialize};

pub const MIN_DELAY_SECONDS: u64 = 1;
pub const MAX_DELAY_SECONDS: u64 = 3600;

/// Durable mailing settings.
///
/// The serialized form is the on-disk record. `repeat_count` is the cumulative
/// number of completed mailing cycles; `max_repeats` is advisory only and is
/// surfaced in the status view without ever stopping the loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailingSettings {
    pub mailing_enabled: bool,
    pub delay_seconds: u64,
    pub simultaneous_sending: bool,
    pub auto_repeat: bool,
    pub repeat_count: u64,
    pub max_repeats: u64,
}

impl Default for MailingSettings {
    fn default() -> Self {
        Self {
            mailing_enabled: false,
            delay_seconds: 60,
            simultaneous_sending: true,
            auto_repeat: false,
            repeat_count: 0,
            max_repeats: 10,
        }
    }
}

pub fn delay_in_range(seconds: u64) -> bool {
    (MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS).contains(&seconds)
}
