//! Small HTML helpers for Telegram's HTML parse mode.

/// Escape text for HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap a value in `<code>` tags, escaping it first.
pub fn code(text: impl ToString) -> String {
    format!("<code>{}</code>", escape_html(&text.to_string()))
}

/// Wrap text in a Telegram spoiler.
pub fn spoiler(text: &str) -> String {
    format!("<tg-spoiler>{}</tg-spoiler>", escape_html(text))
}
