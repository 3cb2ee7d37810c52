use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    domain::{Target, TargetId},
    settings::MailingSettings,
    Result,
};

/// Limits of a transport implementation (Telegram, or a stub in tests).
#[derive(Clone, Copy, Debug)]
pub struct TransportCapabilities {
    pub max_text_len: usize,
    pub max_caption_len: usize,
    pub max_photo_bytes: usize,
}

/// Hexagonal port for outbound delivery.
///
/// Telegram is the first implementation; the shape is small enough that other
/// messengers can fit behind it with their own capability limits.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    fn capabilities(&self) -> TransportCapabilities;

    async fn send_text(&self, target: TargetId, body: &str) -> Result<()>;

    /// Send the attachment and caption together as one visual message,
    /// not as a generic file attachment.
    async fn send_photo(&self, target: TargetId, caption: &str, photo: Bytes) -> Result<()>;
}

/// Turns raw operator input (id, username, invite link) into a concrete
/// [`Target`] via a network lookup.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn resolve(&self, input: &str) -> Result<Target>;
}

/// Durable storage for the target list.
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Target>>;
    async fn save(&self, targets: &[Target]) -> Result<()>;
}

/// Durable storage for mailing settings.
///
/// `load` returns `None` when no prior record exists; the caller substitutes
/// defaults. `save` must be idempotent.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Option<MailingSettings>>;
    async fn save(&self, settings: &MailingSettings) -> Result<()>;
}
