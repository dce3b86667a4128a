//! Helpers for `parse_mode=HTML` message text.

/// Escapes the three characters the Bot API HTML parser treats specially.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether `handle` can be a Telegram username: 1 to 32 characters of
/// ASCII letters, digits and underscores.
#[must_use]
pub fn is_valid_handle(handle: &str) -> bool {
    (1..=32).contains(&handle.len())
        && handle.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A user's name, linked to their profile when they have a public handle.
///
/// Anything that is not a valid handle is dropped, so the link target never
/// carries markup.
#[must_use]
pub fn user_mention(first_name: &str, username: Option<&str>) -> String {
    match username {
        Some(handle) if is_valid_handle(handle) => {
            format!("<a href=\"https://t.me/{handle}\">{}</a>", escape(first_name))
        }
        _ => escape(first_name),
    }
}
