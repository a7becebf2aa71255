//! Operator command surface.
//!
//! Every command ends with an explicit reply in the operator chat, success
//! or not. Recipient identifiers are `<id>` or `@handle`.

use std::sync::Arc;

use teloxide::prelude::*;

use avio_core::{
    audit::AuditEvent,
    directory::{resolve_recipient, Resolved},
    domain::{ChatId, UserRecord},
    export::users_svg,
    formatting::{code, escape_html},
    series::run_series,
    totals::error_content,
    Result,
};

use crate::router::AppState;

use super::broadcast;

pub fn parse_command(text: &str) -> (String, String) {
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

pub async fn reply(state: &AppState, html: &str) {
    if html.is_empty() {
        return;
    }
    let op = ChatId(state.cfg.operator_chat_id);
    if let Err(e) = state.transport.send_html(op, html).await {
        tracing::error!("operator reply failed: {e}");
    }
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, args) = parse_command(text);

    let result = match cmd.as_str() {
        "hello" => Ok("👋 Yes, I am here.".to_string()),
        "help" | "start" => Ok(help_text()),
        "send_total" => send_total(&state, &args).await,
        "send_series" => send_series(&state, &args).await,
        "send_error" => send_error(&state, &args).await,
        "get_all_users" => export_users(&state).await,
        "broadcast" => broadcast::begin_dialogue(&state, &args).await,
        "clean" => Ok(clean_dialogue(&state).await),
        "cancel" => Ok(cancel(&state, &args).await),
        "tasks" => Ok(list_tasks(&state).await),
        other => Ok(format!(
            "❓ Unknown command {}. See /help.",
            code(format!("/{other}"))
        )),
    };

    let html = result.unwrap_or_else(|e| {
        tracing::error!("command /{cmd} failed: {e}");
        format!("⚠️ Operation failed: <code>{}</code>", escape_html(&e.to_string()))
    });
    reply(&state, &html).await;
    Ok(())
}

fn help_text() -> String {
    [
        "<b>Commands</b>",
        "/hello — check that the bot is alive",
        "/send_total &lt;id|@handle&gt; — send a total to one user",
        "/send_series &lt;id|@handle&gt; — timed series of totals",
        "/send_error &lt;id|@handle&gt; — send an error notice",
        "/get_all_users — export the user table",
        "/broadcast &lt;country&gt; — broadcast to a country segment",
        "/clean — clear the pending broadcast dialogue",
        "/tasks — list running background tasks",
        "/cancel [id|all] — cancel a task, all tasks, or the pending dialogue",
    ]
    .join("\n")
}

/// Resolve the argument to a directory record, or produce the reply that
/// explains why not.
async fn require_recipient(
    state: &AppState,
    ident: &str,
    usage: &str,
) -> Result<std::result::Result<UserRecord, String>> {
    if ident.is_empty() {
        return Ok(Err(format!("Usage: {usage}")));
    }
    match resolve_recipient(state.directory.as_ref(), ident).await? {
        Resolved::Found(rec) => Ok(Ok(rec)),
        Resolved::NotFound => Ok(Err(format!(
            "🔍 User {} not found.",
            code(ident)
        ))),
    }
}

async fn send_total(state: &AppState, ident: &str) -> Result<String> {
    let rec = match require_recipient(state, ident, "/send_total &lt;id|@handle&gt;").await? {
        Ok(rec) => rec,
        Err(reply) => return Ok(reply),
    };

    let Some(content) = state.totals.total_content(&state.locales, &rec.country).await? else {
        return Ok("⚠️ No clips in the totals directory.".to_string());
    };

    // Already resolved above; deliver straight to the id.
    if state.delivery.deliver_reliable(rec.id, &content).await {
        state.audit.record(AuditEvent::sent("total", rec.id.0, true));
        Ok(format!("✅ Total sent to {}.", code(rec.id.0)))
    } else {
        state.audit.record(AuditEvent::sent("total", rec.id.0, false));
        Ok(format!("🚫 Could not deliver the total to {}.", code(rec.id.0)))
    }
}

async fn send_series(state: &AppState, ident: &str) -> Result<String> {
    let rec = match require_recipient(state, ident, "/send_series &lt;id|@handle&gt;").await? {
        Ok(rec) => rec,
        Err(reply) => return Ok(reply),
    };

    let count = state.cfg.series_count;
    let interval = state.cfg.series_interval;
    state.audit.record(AuditEvent::series_started(rec.id.0, count));

    let delivery = state.delivery.clone();
    let totals = state.totals.clone();
    let transport = state.transport.clone();
    let op = ChatId(state.cfg.operator_chat_id);
    let user = rec.id;

    let id = state
        .tasks
        .spawn(format!("series to {}", user.0), move |token| async move {
            let outcome = run_series(&delivery, &totals, user, count, interval, &token).await;
            let status = if outcome.cancelled { " (cancelled)" } else { "" };
            let report = format!(
                "📤 Series to {} finished{status}: {}/{} delivered.",
                code(user.0),
                outcome.delivered,
                outcome.attempted
            );
            if let Err(e) = transport.send_html(op, &report).await {
                tracing::error!("series report failed: {e}");
            }
        })
        .await;

    Ok(format!(
        "⏳ Series #{id} started for {}: {count} items every {}s.",
        code(user.0),
        interval.as_secs()
    ))
}

async fn send_error(state: &AppState, ident: &str) -> Result<String> {
    let rec = match require_recipient(state, ident, "/send_error &lt;id|@handle&gt;").await? {
        Ok(rec) => rec,
        Err(reply) => return Ok(reply),
    };

    let content = error_content(&state.locales, &rec.country).await;
    if state.delivery.deliver_reliable(rec.id, &content).await {
        state.audit.record(AuditEvent::sent("error", rec.id.0, true));
        Ok(format!("✅ Error notice sent to {}.", code(rec.id.0)))
    } else {
        state.audit.record(AuditEvent::sent("error", rec.id.0, false));
        Ok(format!("🚫 Could not deliver the notice to {}.", code(rec.id.0)))
    }
}

async fn export_users(state: &AppState) -> Result<String> {
    let users = state.directory.list_all().await?;
    if users.is_empty() {
        return Ok("📭 No registered users.".to_string());
    }

    let svg = users_svg(&users);
    let caption = format!("Registered users: {}", users.len());
    state
        .transport
        .send_document(
            ChatId(state.cfg.operator_chat_id),
            svg.into_bytes(),
            "users.svg",
            Some(&caption),
        )
        .await
        .map_err(|e| avio_core::Error::External(e.to_string()))?;

    Ok(String::new())
}

async fn clean_dialogue(state: &AppState) -> String {
    if state.dialogues.clear(ChatId(state.cfg.operator_chat_id)).await {
        "🧹 Broadcast dialogue cleared.".to_string()
    } else {
        "Nothing pending.".to_string()
    }
}

async fn cancel(state: &AppState, args: &str) -> String {
    if args.is_empty() {
        return if state.dialogues.clear(ChatId(state.cfg.operator_chat_id)).await {
            "🧹 Pending broadcast dialogue cleared.".to_string()
        } else {
            "Nothing pending. Use /cancel &lt;id&gt; for background tasks.".to_string()
        };
    }

    if args.eq_ignore_ascii_case("all") {
        let n = state.tasks.cancel_all().await;
        return format!("🛑 Cancelled {n} task(s).");
    }

    match args.parse::<u64>() {
        Ok(id) if state.tasks.cancel(id).await => format!("🛑 Task #{id} cancelled."),
        Ok(id) => format!("No running task #{id}."),
        Err(_) => format!("Bad task id {}.", code(args)),
    }
}

async fn list_tasks(state: &AppState) -> String {
    let tasks = state.tasks.list().await;
    if tasks.is_empty() {
        return "No background tasks.".to_string();
    }
    let mut out = String::from("<b>Background tasks</b>");
    for t in tasks {
        out.push_str(&format!("\n#{} — {}", t.id, escape_html(&t.label)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testutil::{app_state, record, test_config, CountingDirectory};

    #[tokio::test]
    async fn send_error_resolves_the_recipient_once() {
        let directory =
            Arc::new(CountingDirectory::with(&[record(10, Some("alice"), "Russia")]).await);
        let (state, transport) = app_state(test_config("cmd-error"), directory.clone());

        let reply = send_error(&state, "10").await.unwrap();
        assert!(reply.starts_with("✅"), "{reply}");
        assert_eq!(transport.sends_to(10).await.len(), 1);
        assert_eq!(directory.resolution_count(), 1);
    }

    #[tokio::test]
    async fn send_total_resolves_the_recipient_once() {
        let dir = std::env::temp_dir().join(format!("avio-cmd-totals-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("clip.gif"), b"clip-bytes").unwrap();

        let directory =
            Arc::new(CountingDirectory::with(&[record(10, Some("alice"), "Russia")]).await);
        let mut cfg = test_config("cmd-total");
        cfg.total_dir = dir.clone();
        let (state, transport) = app_state(cfg, directory.clone());

        let reply = send_total(&state, "@alice").await.unwrap();
        assert!(reply.starts_with("✅"), "{reply}");
        assert_eq!(transport.sends_to(10).await, vec!["media:clip.gif".to_string()]);
        assert_eq!(directory.resolution_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn strips_bot_suffix_and_lowercases() {
        assert_eq!(
            parse_command("/Broadcast@aviobot Russia"),
            ("broadcast".to_string(), "Russia".to_string())
        );
        assert_eq!(parse_command("/tasks"), ("tasks".to_string(), String::new()));
        assert_eq!(
            parse_command("/send_total  @Alice "),
            ("send_total".to_string(), "@Alice".to_string())
        );
    }
}
