//! Inline keyboards attached to bot messages.

use serde::Serialize;

/// Callback payloads carried by wizard buttons.
pub mod callback {
    pub const CREATE_GIVEAWAY: &str = "create_giveaway";
    pub const CONDITION_SUBSCRIPTION: &str = "condition_subscription";
    pub const RETRY_CHECK: &str = "retry_check";
    pub const ADD_CHANNEL: &str = "add_channel";
    pub const FINISH_CHANNELS: &str = "finish_channels";
    pub const CONFIRM_CREATE: &str = "confirm_create";
    pub const CANCEL_CREATE: &str = "cancel_create";
}

/// A single inline button; exactly one of `callback_data` / `url` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineButton {
    #[must_use]
    pub fn callback(text: &str, data: &str) -> Self {
        Self {
            text: text.to_owned(),
            callback_data: Some(data.to_owned()),
            url: None,
        }
    }

    #[must_use]
    pub fn url(text: &str, url: &str) -> Self {
        Self {
            text: text.to_owned(),
            callback_data: None,
            url: Some(url.to_owned()),
        }
    }
}

/// `InlineKeyboardMarkup` as the Bot API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// One button per row.
    #[must_use]
    pub fn column(buttons: Vec<InlineButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Every callback payload on the keyboard, in display order.
    pub fn callbacks(&self) -> impl Iterator<Item = &str> {
        self.inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| b.callback_data.as_deref())
    }

    #[must_use]
    pub fn create_giveaway() -> Self {
        Self::column(vec![InlineButton::callback(
            "🎉 Create giveaway",
            callback::CREATE_GIVEAWAY,
        )])
    }

    #[must_use]
    pub fn conditions() -> Self {
        Self::column(vec![InlineButton::callback(
            "✅ Channel subscription",
            callback::CONDITION_SUBSCRIPTION,
        )])
    }

    #[must_use]
    pub fn retry_check() -> Self {
        Self::column(vec![InlineButton::callback(
            "🔄 Try again",
            callback::RETRY_CHECK,
        )])
    }

    #[must_use]
    pub fn more_channels() -> Self {
        Self::column(vec![
            InlineButton::callback("➕ Add another channel", callback::ADD_CHANNEL),
            InlineButton::callback("✅ Continue", callback::FINISH_CHANNELS),
        ])
    }

    #[must_use]
    pub fn confirm() -> Self {
        Self::column(vec![
            InlineButton::callback("✅ Create giveaway", callback::CONFIRM_CREATE),
            InlineButton::callback("❌ Cancel", callback::CANCEL_CREATE),
        ])
    }

    /// URL button opening the mini-app for one giveaway.
    ///
    /// Channel posts cannot carry `web_app` buttons, so this is a plain link.
    #[must_use]
    pub fn participate(link: &str) -> Self {
        Self::column(vec![InlineButton::url("🎁 Participate", link)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_serialization_skips_empty_fields() {
        let json = serde_json::to_value(InlineKeyboard::retry_check()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inline_keyboard": [[{"text": "🔄 Try again", "callback_data": "retry_check"}]]
            })
        );
    }

    #[test]
    fn test_participate_is_url_button() {
        let keyboard = InlineKeyboard::participate("https://app/index.html?draw_id=1");
        let button = &keyboard.inline_keyboard[0][0];
        assert_eq!(button.url.as_deref(), Some("https://app/index.html?draw_id=1"));
        assert!(button.callback_data.is_none());
    }

    #[test]
    fn test_more_channels_layout() {
        let keyboard = InlineKeyboard::more_channels();
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(
            keyboard.callbacks().collect::<Vec<_>>(),
            vec![callback::ADD_CHANNEL, callback::FINISH_CHANNELS]
        );
    }
}
