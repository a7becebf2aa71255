//! Broadcast dialogue routing and launch.

use std::sync::Arc;

use teloxide::{net::Download, prelude::*};

use avio_core::{
    audit::AuditEvent,
    broadcast::{run_broadcast, BroadcastDraft, BroadcastOutcome, DialogueInput, DialogueReply},
    domain::ChatId,
    formatting::escape_html,
    messaging::{MediaAttachment, MediaKind},
    Result,
};

use crate::router::AppState;

use super::commands::reply;

/// `/broadcast <country>` entry point.
pub async fn begin_dialogue(state: &AppState, args: &str) -> Result<String> {
    let chat = ChatId(state.cfg.operator_chat_id);
    let arg = Some(args).filter(|a| !a.trim().is_empty());
    let reply = state
        .dialogues
        .begin(chat, arg, state.directory.as_ref())
        .await?;
    Ok(reply_text(&reply))
}

/// Free-text and media from the operator chat, fed into the dialogue.
pub async fn handle_dialogue_input(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let chat = ChatId(state.cfg.operator_chat_id);

    let input = match extract_input(&bot, &msg).await {
        Ok(input) => input,
        Err(e) => {
            tracing::error!("media download failed: {e}");
            reply(&state, "⚠️ Could not download the attachment; send it again.").await;
            return Ok(());
        }
    };

    let Some(input) = input else {
        // Stickers, voice and the like only matter while a dialogue is open.
        if state.dialogues.clear(chat).await {
            reply(&state, "❓ Unrecognized input; the broadcast dialogue was cleared.").await;
        }
        return Ok(());
    };

    match state.dialogues.offer(chat, input).await {
        DialogueReply::Launch(draft) => launch(&state, draft).await,
        // Ordinary chatter in the operator chat outside a dialogue.
        DialogueReply::NoSession => {}
        other => reply(&state, &reply_text(&other)).await,
    }
    Ok(())
}

fn reply_text(r: &DialogueReply) -> String {
    match r {
        DialogueReply::UnknownCountry { available } => {
            if available.is_empty() {
                "📭 No registered countries yet.".to_string()
            } else {
                format!(
                    "🌍 Specify a country: {}",
                    available
                        .iter()
                        .map(|c| escape_html(c))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
        DialogueReply::PromptText { country } => format!(
            "📝 Broadcasting to <b>{}</b>. Send the message text.",
            escape_html(country)
        ),
        DialogueReply::PromptMedia { country, .. } => format!(
            "📎 Text saved for <b>{}</b>. Attach a photo or video, or type \"skip\".",
            escape_html(country)
        ),
        DialogueReply::EmptyTextRejected => {
            "✏️ The message text cannot be empty. Send the text.".to_string()
        }
        DialogueReply::InvalidMediaRejected => {
            "📎 Attach a photo or video, or type \"skip\".".to_string()
        }
        DialogueReply::Unrecognized => {
            "❓ Unrecognized input; the broadcast dialogue was cleared.".to_string()
        }
        DialogueReply::NoSession | DialogueReply::Launch(_) => String::new(),
    }
}

async fn extract_input(bot: &Bot, msg: &Message) -> anyhow::Result<Option<DialogueInput>> {
    if let Some(text) = msg.text() {
        return Ok(Some(DialogueInput::Text(text.to_string())));
    }
    if let Some(photos) = msg.photo() {
        let Some(best) = photos.last() else {
            return Ok(None);
        };
        let bytes = download(bot, best.file.id.clone()).await?;
        return Ok(Some(DialogueInput::Media(MediaAttachment::new(
            MediaKind::Photo,
            bytes,
            "photo.jpg",
        ))));
    }
    if let Some(video) = msg.video() {
        let bytes = download(bot, video.file.id.clone()).await?;
        let name = video
            .file_name
            .clone()
            .unwrap_or_else(|| "video.mp4".to_string());
        return Ok(Some(DialogueInput::Media(MediaAttachment::new(
            MediaKind::Video,
            bytes,
            name,
        ))));
    }
    Ok(None)
}

async fn download(bot: &Bot, file_id: String) -> anyhow::Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let mut buf = Vec::new();
    bot.download_file(&file.path, &mut buf).await?;
    Ok(buf)
}

async fn launch(state: &Arc<AppState>, draft: BroadcastDraft) {
    let pacing = state.cfg.broadcast_pacing;
    let delivery = state.delivery.clone();
    let transport = state.transport.clone();
    let audit = state.audit.clone();
    let op = ChatId(state.cfg.operator_chat_id);
    let country = draft.country.clone();
    let text = draft.text.clone();

    let id = state
        .tasks
        .spawn(format!("broadcast to {country}"), move |token| async move {
            let report = match run_broadcast(&delivery, &draft, pacing, &token).await {
                Ok(BroadcastOutcome::EmptySegment { country }) => {
                    format!("📭 No recipients in <b>{}</b>.", escape_html(&country))
                }
                Ok(BroadcastOutcome::Finished(report)) => {
                    audit.record(AuditEvent::broadcast(
                        &report.country,
                        &text,
                        report.delivered,
                        report.total,
                    ));
                    let status = if report.cancelled { " (cancelled)" } else { "" };
                    format!(
                        "📢 Broadcast to <b>{}</b> finished{status}: {}/{} delivered.",
                        escape_html(&report.country),
                        report.delivered,
                        report.total
                    )
                }
                Err(e) => format!(
                    "⚠️ Broadcast failed: <code>{}</code>",
                    escape_html(&e.to_string())
                ),
            };
            if let Err(e) = transport.send_html(op, &report).await {
                tracing::error!("broadcast report failed: {e}");
            }
        })
        .await;

    reply(
        state,
        &format!(
            "🚀 Broadcast to <b>{}</b> started as task #{id}.",
            escape_html(&country)
        ),
    )
    .await;
}
