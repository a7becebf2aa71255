//! Country-segmented broadcast: operator dialogue plus the sending engine.
//!
//! The dialogue collects a draft across three operator messages (country,
//! text, optional media) with at most one session per operator chat; the
//! engine then delivers the draft to every member of the segment as it
//! exists at launch time.

use std::{collections::HashMap, time::Duration};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    delivery::{DeliveryOutcome, DeliveryService},
    directory::UserDirectory,
    domain::ChatId,
    locale::language_for_country,
    messaging::{Content, MediaAttachment, MediaKind},
    Result,
};

/// Case-insensitive keyword that skips the media step.
pub const SKIP_KEYWORD: &str = "skip";

/// In-progress broadcast, owned by the dialogue until launch and discarded
/// after the run (never archived).
#[derive(Clone, Debug)]
pub struct BroadcastDraft {
    pub country: String,
    pub text: String,
    pub media: Option<MediaAttachment>,
}

#[derive(Clone, Debug)]
enum DialogueState {
    AwaitingText { country: String },
    AwaitingMedia { country: String, text: String },
}

/// Operator input fed into an active dialogue.
#[derive(Clone, Debug)]
pub enum DialogueInput {
    Text(String),
    Media(MediaAttachment),
}

/// Typed result of one dialogue step; the adapter maps these to operator
/// messages uniformly instead of formatting inside the machine.
#[derive(Clone, Debug)]
pub enum DialogueReply {
    /// No or unknown country; no session was created.
    UnknownCountry { available: Vec<String> },
    PromptText { country: String },
    PromptMedia { country: String, text: String },
    /// Blank message text; state unchanged.
    EmptyTextRejected,
    /// Not a photo, video, or the skip keyword; state unchanged.
    InvalidMediaRejected,
    /// Draft complete; the caller launches the sending run.
    Launch(BroadcastDraft),
    /// Input matched no expected shape; the session was force-cleared.
    Unrecognized,
    NoSession,
}

/// Per-operator-chat dialogue sessions behind a scoped API.
#[derive(Default)]
pub struct BroadcastDialogues {
    sessions: Mutex<HashMap<i64, DialogueState>>,
}

impl BroadcastDialogues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a dialogue for `chat`.
    ///
    /// The country is validated against the directory's current segments;
    /// on a miss no session is created and the valid set is reported.
    pub async fn begin(
        &self,
        chat: ChatId,
        country_arg: Option<&str>,
        directory: &dyn UserDirectory,
    ) -> Result<DialogueReply> {
        let available = directory.list_countries().await?;

        let Some(country) = country_arg.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(DialogueReply::UnknownCountry { available });
        };
        if !available.iter().any(|c| c == country) {
            return Ok(DialogueReply::UnknownCountry { available });
        }

        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            chat.0,
            DialogueState::AwaitingText {
                country: country.to_string(),
            },
        );
        Ok(DialogueReply::PromptText {
            country: country.to_string(),
        })
    }

    /// Route one operator input into the chat's session.
    pub async fn offer(&self, chat: ChatId, input: DialogueInput) -> DialogueReply {
        let mut sessions = self.sessions.lock().await;

        let Some(state) = sessions.get(&chat.0).cloned() else {
            return DialogueReply::NoSession;
        };

        match (state, input) {
            (DialogueState::AwaitingText { country }, DialogueInput::Text(text)) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return DialogueReply::EmptyTextRejected;
                }
                sessions.insert(
                    chat.0,
                    DialogueState::AwaitingMedia {
                        country: country.clone(),
                        text: text.clone(),
                    },
                );
                DialogueReply::PromptMedia { country, text }
            }
            (DialogueState::AwaitingText { .. }, DialogueInput::Media(_)) => {
                // Wrong shape for this step: never leave a dangling session.
                sessions.remove(&chat.0);
                DialogueReply::Unrecognized
            }
            (DialogueState::AwaitingMedia { country, text }, DialogueInput::Media(media)) => {
                match media.kind {
                    MediaKind::Photo | MediaKind::Video => {
                        sessions.remove(&chat.0);
                        DialogueReply::Launch(BroadcastDraft {
                            country,
                            text,
                            media: Some(media),
                        })
                    }
                    MediaKind::Animation => DialogueReply::InvalidMediaRejected,
                }
            }
            (DialogueState::AwaitingMedia { country, text }, DialogueInput::Text(word)) => {
                if word.trim().eq_ignore_ascii_case(SKIP_KEYWORD) {
                    sessions.remove(&chat.0);
                    DialogueReply::Launch(BroadcastDraft {
                        country,
                        text,
                        media: None,
                    })
                } else {
                    DialogueReply::InvalidMediaRejected
                }
            }
        }
    }

    /// Drop a pending session. Returns whether one existed.
    pub async fn clear(&self, chat: ChatId) -> bool {
        self.sessions.lock().await.remove(&chat.0).is_some()
    }

    pub async fn is_active(&self, chat: ChatId) -> bool {
        self.sessions.lock().await.contains_key(&chat.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastReport {
    pub country: String,
    pub delivered: usize,
    pub total: usize,
    pub cancelled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The segment resolved to zero recipients; nothing was sent.
    EmptySegment { country: String },
    Finished(BroadcastReport),
}

/// Deliver a completed draft to its segment.
///
/// The segment is resolved exactly once, then recipients are processed in
/// directory order. A rate-limited recipient costs one backoff wait and is
/// skipped (bounding total run time); unreachable and failed recipients are
/// counted as non-delivered. Only segment resolution can fail hard.
pub async fn run_broadcast(
    delivery: &DeliveryService,
    draft: &BroadcastDraft,
    pacing: Duration,
    token: &CancellationToken,
) -> Result<BroadcastOutcome> {
    let ids = delivery.directory().list_by_country(&draft.country).await?;
    let total = ids.len();
    if total == 0 {
        return Ok(BroadcastOutcome::EmptySegment {
            country: draft.country.clone(),
        });
    }

    tracing::info!(country = %draft.country, total, "broadcast started");

    let mut delivered = 0usize;
    let mut cancelled = false;

    for (i, id) in ids.iter().enumerate() {
        if token.is_cancelled() {
            cancelled = true;
            break;
        }

        // Localization follows the recipient's own country, not the segment.
        match delivery.directory().get_user(*id).await {
            Ok(Some(user)) => {
                let lang = language_for_country(&user.country);
                tracing::debug!(user = id.0, lang, "broadcast item");
            }
            Ok(None) => {
                tracing::warn!(user = id.0, "skipping: recipient left the directory");
                continue;
            }
            Err(e) => {
                tracing::error!(user = id.0, "skipping: directory lookup failed: {e}");
                continue;
            }
        }

        let content = match &draft.media {
            Some(media) => Content::Media {
                media: media.clone(),
                caption: Some(draft.text.clone()),
                spoiler: false,
            },
            None => Content::text(draft.text.clone()),
        };

        match delivery.deliver(*id, &content).await {
            DeliveryOutcome::Delivered => delivered += 1,
            DeliveryOutcome::RateLimited(wait) => {
                // Wait out the backoff once, then move on; this recipient is
                // skipped rather than retried to bound the broadcast.
                tracing::warn!(user = id.0, ?wait, "rate limited, skipping recipient");
                tokio::select! {
                    _ = token.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = sleep(wait) => {}
                }
            }
            DeliveryOutcome::Unreachable | DeliveryOutcome::Failed => {}
        }

        if i + 1 < total {
            tokio::select! {
                _ = token.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = sleep(pacing) => {}
            }
        }
    }

    let report = BroadcastReport {
        country: draft.country.clone(),
        delivered,
        total,
        cancelled,
    };
    tracing::info!(
        country = %report.country,
        delivered = report.delivered,
        total = report.total,
        cancelled = report.cancelled,
        "broadcast finished"
    );
    Ok(BroadcastOutcome::Finished(report))
}
