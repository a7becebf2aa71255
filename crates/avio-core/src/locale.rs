//! Message localization.
//!
//! Bundles are JSON files named `<lang>.json` in the configured lang dir.
//! A missing or broken file falls back to the built-in English bundle, so
//! a send never fails for want of a translation.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use serde::Deserialize;
use tokio::sync::Mutex;

/// One language's worth of message templates.
#[derive(Clone, Debug, Deserialize)]
pub struct MessageBundle {
    pub welcome: String,
    pub final_welcome: String,
    pub already_registered: String,
    pub enter_password: String,
    pub password_correct: String,
    pub password_incorrect: String,
    pub sync: String,
    pub total: Vec<String>,
    pub error: Vec<String>,
}

impl MessageBundle {
    /// Built-in fallback bundle (English).
    pub fn fallback() -> Self {
        Self {
            welcome: "@{username}, you have successfully registered! Contact the operator for further instructions.".to_string(),
            final_welcome: "🎉 You have successfully registered!".to_string(),
            already_registered: "🔍 You are already registered!".to_string(),
            enter_password: "🔐 Enter password:".to_string(),
            password_correct: "✅ Password correct! Synchronize your account:".to_string(),
            password_incorrect: "❌ Wrong password. Try again:".to_string(),
            sync: "🔄 Synchronize your account".to_string(),
            total: vec![
                "🎯 Here's your total!".to_string(),
                "🚀 Catch the moment!".to_string(),
                "✅ Your total is ready!".to_string(),
                "🔥 Total delivered!".to_string(),
                "💥 Check this out!".to_string(),
                "🌟 Your result is here!".to_string(),
                "⚡ Total incoming!".to_string(),
                "🎰 Ready for the total?".to_string(),
                "🏆 Here it comes!".to_string(),
                "🎉 Total for you!".to_string(),
            ],
            error: vec![
                "🤖 Neural networks can make mistakes, it's okay!".to_string(),
                "⚠️ Something went wrong, try again!".to_string(),
                "📞 Contact support.".to_string(),
            ],
        }
    }
}

/// Country -> language code. Unlisted countries get the default language.
pub fn language_for_country(country: &str) -> &'static str {
    match country {
        "Russia" | "Belarus" | "Kazakhstan" => "ru",
        "Spain" | "Mexico" => "es",
        "United States" | "United Kingdom" | "Australia" => "en",
        _ => "en",
    }
}

/// Loads and caches per-language bundles from disk.
pub struct LocaleStore {
    dir: PathBuf,
    fallback: Arc<MessageBundle>,
    cache: Mutex<HashMap<String, Arc<MessageBundle>>>,
}

impl LocaleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback: Arc::new(MessageBundle::fallback()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Bundle for a language code, falling back to the built-in English
    /// bundle when the file is missing or unparseable.
    pub async fn load(&self, lang: &str) -> Arc<MessageBundle> {
        {
            let cache = self.cache.lock().await;
            if let Some(bundle) = cache.get(lang) {
                return bundle.clone();
            }
        }

        let bundle = match self.read_bundle(lang) {
            Some(b) => Arc::new(b),
            None => {
                if lang != "en" {
                    tracing::warn!(lang, "no locale bundle, falling back to en");
                }
                // `en.json` may itself override the built-in defaults.
                self.read_bundle("en")
                    .map(Arc::new)
                    .unwrap_or_else(|| self.fallback.clone())
            }
        };

        let mut cache = self.cache.lock().await;
        cache.insert(lang.to_string(), bundle.clone());
        bundle
    }

    /// Bundle for a recipient's country.
    pub async fn for_country(&self, country: &str) -> Arc<MessageBundle> {
        self.load(language_for_country(country)).await
    }

    fn read_bundle(&self, lang: &str) -> Option<MessageBundle> {
        let path = self.dir.join(format!("{lang}.json"));
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::warn!(path = %path.display(), "broken locale bundle: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_lang_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("avio-lang-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn falls_back_to_builtin_on_missing_lang() {
        let dir = tmp_lang_dir("missing");
        let store = LocaleStore::new(&dir);

        let bundle = store.load("de").await;
        assert_eq!(bundle.enter_password, "🔐 Enter password:");
        assert_eq!(bundle.total.len(), 10);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn loads_bundle_from_disk_and_caches() {
        let dir = tmp_lang_dir("ru");
        let mut bundle = serde_json::json!({
            "welcome": "привет @{username}",
            "final_welcome": "готово",
            "already_registered": "уже зарегистрированы",
            "enter_password": "введите пароль",
            "password_correct": "верно",
            "password_incorrect": "неверно",
            "sync": "синхронизация",
            "total": ["тотал"],
            "error": ["ошибка"]
        });
        std::fs::write(dir.join("ru.json"), bundle.to_string()).unwrap();

        let store = LocaleStore::new(&dir);
        let loaded = store.load("ru").await;
        assert_eq!(loaded.enter_password, "введите пароль");

        // Cached: editing the file after the first load must not change the bundle.
        bundle["enter_password"] = serde_json::json!("другое");
        std::fs::write(dir.join("ru.json"), bundle.to_string()).unwrap();
        let again = store.load("ru").await;
        assert_eq!(again.enter_password, "введите пароль");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn country_language_mapping() {
        assert_eq!(language_for_country("Russia"), "ru");
        assert_eq!(language_for_country("Spain"), "es");
        assert_eq!(language_for_country("Atlantis"), "en");
    }
}
