//! Rendered operator-facing texts and send helpers.

use teloxide::prelude::*;
use teloxide::types::{ChatId, KeyboardMarkup, ParseMode};

use tgblast_core::{
    domain::Target,
    formatting::{escape_html, format_delay},
    mailer::{CycleReport, MailingStatus},
    Error,
};

pub async fn send_html(bot: &Bot, chat: ChatId, html: &str) {
    let _ = bot
        .send_message(chat, html.to_string())
        .parse_mode(ParseMode::Html)
        .await;
}

pub async fn send_html_kb(bot: &Bot, chat: ChatId, html: &str, kb: KeyboardMarkup) {
    let _ = bot
        .send_message(chat, html.to_string())
        .parse_mode(ParseMode::Html)
        .reply_markup(kb)
        .await;
}

pub fn welcome_text() -> String {
    "🤖 <b>Personal broadcast bot</b>\n\n\
     I send your composed message to every registered target chat.\n\n\
     <b>Quick start:</b>\n\
     1. Compose a message via '✏️ Compose message'\n\
     2. Set the delay via '⏰ Delay'\n\
     3. Start the loop via '🟢 Start mailing'\n\n\
     Use the keyboard below to begin."
        .to_string()
}

pub fn help_text() -> String {
    "❓ <b>Help</b>\n\n\
     <b>How it works:</b>\n\
     • '✏️ Compose message' — text, or a photo with a caption (sent as a \
     visible photo, not a file)\n\
     • '📤 Send once' — one mailing cycle right now\n\
     • '🟢 Start mailing' — repeat the cycle automatically with your delay \
     until you stop it\n\
     • '⏰ Delay' — seconds between cycles (1-3600)\n\
     • '✅ Add tags' — append @username mentions to the composed message\n\n\
     The composed message is kept after sending, so the loop reuses it every \
     cycle until you replace it.\n\n\
     Commands: /targets /add /remove /delay /compose /tags /send /run /stop \
     /status /help"
        .to_string()
}

pub fn target_list_text(targets: &[Target]) -> String {
    let mut out = String::from("📋 <b>Your targets:</b>\n\n");
    for (i, target) in targets.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   ID: <code>{}</code>\n\n",
            i + 1,
            escape_html(&target.title),
            target.id.0
        ));
    }
    out.push_str(&format!("<b>Total:</b> {} targets", targets.len()));
    out
}

pub fn status_text(status: &MailingStatus) -> String {
    let mailing = if status.is_running {
        "Running"
    } else {
        "Stopped"
    };
    let message = status.message_kind.unwrap_or("not composed");

    format!(
        "📊 <b>Status</b>\n\n\
         • Targets: <code>{}</code>\n\
         • Delay: <code>{}</code>\n\
         • Mailing: <code>{mailing}</code>\n\
         • Total cycles sent: <code>{}</code>\n\
         • Auto-repeat: <code>{}</code> (advisory limit: {})\n\
         • Composed message: <code>{message}</code>",
        status.target_count,
        format_delay(status.delay_seconds),
        status.total_cycles_sent,
        if status.auto_repeat { "on" } else { "off" },
        status.max_repeats,
    )
}

pub fn cycle_report_text(report: &CycleReport) -> String {
    if report.failed == 0 {
        format!(
            "✅ Delivered to {} targets! (total cycles: {})",
            report.delivered, report.total_cycles
        )
    } else {
        format!(
            "⚠️ Delivered to {} targets, failed for {} (total cycles: {})",
            report.delivered, report.failed, report.total_cycles
        )
    }
}

/// Operator-friendly rendering of a core error.
pub fn describe_error(e: &Error) -> String {
    match e {
        Error::DuplicateTarget(title) => {
            format!("❌ '{}' is already in your target list.", escape_html(title))
        }
        Error::TargetNotFound(matcher) => {
            format!("❌ Target '{}' not found.", escape_html(matcher))
        }
        Error::ResolutionFailed(_) => {
            "❌ Could not find that chat. Check the link/ID and try again.".to_string()
        }
        Error::NoComposedMessage | Error::NothingToSend => {
            "❌ No message to send. Compose one first via '✏️ Compose message'.".to_string()
        }
        Error::NoTargets => "❌ No targets added. Add targets first.".to_string(),
        Error::DelayOutOfRange(_) => {
            "❌ Please enter a number from 1 to 3600 seconds (1 hour).".to_string()
        }
        Error::AttachmentTooLarge { size, limit } => format!(
            "❌ Photo is too large: {size} bytes (the transport allows {limit})."
        ),
        other => format!("❌ Error: {}", escape_html(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tgblast_core::domain::TargetId;

    #[test]
    fn target_list_escapes_titles() {
        let text = target_list_text(&[Target {
            id: TargetId(5),
            title: "<b>raw".to_string(),
            username: None,
        }]);
        assert!(text.contains("&lt;b&gt;raw"));
        assert!(text.contains("<code>5</code>"));
        assert!(text.contains("Total:</b> 1 targets"));
    }

    #[test]
    fn cycle_report_distinguishes_clean_and_partial() {
        let clean = cycle_report_text(&CycleReport {
            delivered: 3,
            failed: 0,
            total_cycles: 4,
        });
        assert!(clean.starts_with('✅'));

        let partial = cycle_report_text(&CycleReport {
            delivered: 2,
            failed: 1,
            total_cycles: 5,
        });
        assert!(partial.starts_with('⚠'));
        assert!(partial.contains("failed for 1"));
    }
}
