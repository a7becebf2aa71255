//! Totals content: random clip from the totals directory plus a random
//! localized phrase, sent spoilered.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

use crate::{
    locale::LocaleStore,
    messaging::{Content, MediaAttachment, MediaKind},
    Result,
};

/// Clip library backed by a directory of `.gif` / `.mp4` files.
pub struct TotalLibrary {
    dir: PathBuf,
}

impl TotalLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pick a random clip path, or `None` when the directory is missing or
    /// holds no clips.
    pub fn pick_clip(&self) -> Option<PathBuf> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                tracing::error!(dir = %self.dir.display(), "totals dir unreadable: {e}");
                return None;
            }
        };

        let clips: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| is_clip(p))
            .collect();

        if clips.is_empty() {
            tracing::error!(dir = %self.dir.display(), "no clips in totals dir");
            return None;
        }

        clips.choose(&mut rand::thread_rng()).cloned()
    }

    /// Build one total: random clip, random localized phrase, spoilered.
    ///
    /// Returns `Ok(None)` when no clip is available; the caller reports that
    /// to the operator instead of sending.
    pub async fn total_content(
        &self,
        locales: &LocaleStore,
        country: &str,
    ) -> Result<Option<Content>> {
        let Some(path) = self.pick_clip() else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "total.gif".to_string());

        let bundle = locales.for_country(country).await;
        let caption = pick_phrase(&bundle.total, "Your total is ready!");

        Ok(Some(Content::Media {
            media: MediaAttachment::new(MediaKind::Animation, bytes, filename),
            caption: Some(caption),
            spoiler: true,
        }))
    }
}

/// Random localized error notice.
pub async fn error_content(locales: &LocaleStore, country: &str) -> Content {
    let bundle = locales.for_country(country).await;
    Content::text(pick_phrase(
        &bundle.error,
        "Something went wrong, try again later.",
    ))
}

fn pick_phrase(options: &[String], fallback: &str) -> String {
    options
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

fn is_clip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            e == "gif" || e == "mp4"
        })
        .unwrap_or(false)
}
