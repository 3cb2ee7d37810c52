use bytes::Bytes;

use crate::{Error, Result};

/// The single pending payload to be broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComposedMessage {
    Text { body: String },
    Photo { body: String, data: Bytes },
}

impl ComposedMessage {
    pub fn body(&self) -> &str {
        match self {
            Self::Text { body } | Self::Photo { body, .. } => body,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
        }
    }

    fn body_mut(&mut self) -> &mut String {
        match self {
            Self::Text { body } | Self::Photo { body, .. } => body,
        }
    }
}

/// Holds zero or one composed message.
///
/// A send never clears the store: the message persists for reuse across
/// manual sends and auto-mailing cycles until the operator replaces it or the
/// process restarts. This is deliberate, not a leak.
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    current: Option<ComposedMessage>,
}

impl MessageStore {
    /// Replace the current message with a text payload, discarding any
    /// previous message entirely.
    pub fn set_text(&mut self, body: impl Into<String>) {
        self.current = Some(ComposedMessage::Text { body: body.into() });
    }

    /// Replace the current message with a photo payload.
    ///
    /// `max_photo_bytes` comes from the transport's capabilities.
    pub fn set_photo(
        &mut self,
        body: impl Into<String>,
        data: Bytes,
        max_photo_bytes: usize,
    ) -> Result<()> {
        if data.len() > max_photo_bytes {
            return Err(Error::AttachmentTooLarge {
                size: data.len(),
                limit: max_photo_bytes,
            });
        }
        self.current = Some(ComposedMessage::Photo {
            body: body.into(),
            data,
        });
        Ok(())
    }

    /// Append one "@name" mention per supplied name to the body, in order,
    /// each trimmed of surrounding whitespace. Creates the body if it was
    /// empty. The variant tag never changes.
    pub fn append_tags(&mut self, names: &[String]) -> Result<()> {
        let message = self.current.as_mut().ok_or(Error::NoComposedMessage)?;

        let tags = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| format!("@{n}"))
            .collect::<Vec<_>>()
            .join("\n");
        if tags.is_empty() {
            return Ok(());
        }

        let body = message.body_mut();
        if body.is_empty() {
            *body = tags;
        } else {
            body.push_str("\n\n");
            body.push_str(&tags);
        }
        Ok(())
    }

    pub fn peek(&self) -> Option<&ComposedMessage> {
        self.current.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }
}
