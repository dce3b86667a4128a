//! Texts the wizard sends. All of them use `parse_mode=HTML`.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Utc};

use super::state::Draft;
use crate::config::DATE_FORMAT;
use crate::store::{Giveaway, GiveawayId, RequiredChannel};
use crate::telegram::html::escape;

pub const STEP_TITLE: &str = "📝 <b>Step 1/6: Title</b>\n\nEnter the giveaway title:";

pub const STEP_PRIZES: &str = "🎁 <b>Step 2/6: Prizes</b>\n\n\
    Enter the prizes, one per line:\n\n\
    Example:\n1. Phone\n2. Headphones\n3. Premium subscription";

pub const STEP_WINNER_COUNT: &str =
    "🏆 <b>Step 3/6: Number of winners</b>\n\nEnter the number of winners:";

pub const STEP_CONDITIONS: &str =
    "✅ <b>Step 4/6: Conditions</b>\n\nChoose the participation condition:";

pub const STEP_CHANNEL: &str = "📢 <b>Step 5/6: Channels</b>\n\n\
    Enter the channel username (@channelname or https://t.me/channelname):";

pub const NEXT_CHANNEL: &str = "📢 Enter the username of the next channel:";

pub const MORE_CHANNELS: &str = "Do you want to add another channel?";

pub const STEP_END_DATE: &str = "📅 <b>Step 6/6: End date</b>\n\n\
    Enter the date and time the giveaway ends\n\
    Format: DD.MM.YYYY HH:MM\n\nExample: 31.12.2099 23:59";

pub const EMPTY_TEXT: &str = "❌ Please send a non-empty text message.";
pub const INVALID_WINNER_COUNT: &str =
    "❌ Please enter a whole number of winners greater than 0!";
pub const INVALID_DATE_FORMAT: &str = "❌ Invalid date format!\n\n\
    Use DD.MM.YYYY HH:MM\nFor example: 31.12.2099 23:59";
pub const DATE_NOT_IN_FUTURE: &str = "❌ The end date must be in the future!\nPlease try again.";
pub const NEED_CHANNEL: &str = "❌ Add at least one verified channel first.";
pub const USE_BUTTONS: &str = "Please use the buttons below.";
pub const SAVE_FAILED: &str =
    "❌ Could not save the giveaway. Please press \"Create giveaway\" again.";
pub const CANCELLED: &str = "❌ Giveaway creation cancelled.";

#[must_use]
pub fn checking_channel(channel: &str) -> String {
    format!("⏳ Checking {}...", escape(channel))
}

#[must_use]
pub fn not_subscribed(channel: &str, retry: bool) -> String {
    if retry {
        format!("❌ You are still not subscribed to {}", escape(channel))
    } else {
        format!(
            "❌ You are not subscribed to {}\n\nPlease subscribe and try again.",
            escape(channel)
        )
    }
}

#[must_use]
pub fn bot_not_admin(channel: &str, retry: bool) -> String {
    if retry {
        format!("❌ The bot is still not an administrator of {}", escape(channel))
    } else {
        format!(
            "❌ The bot is not an administrator of {}\n\n\
             Please make the bot an administrator with these rights:\n\
             • View members\n• Post messages\n\nThen try again.",
            escape(channel)
        )
    }
}

#[must_use]
pub fn channel_added(channel: &str, total: usize) -> String {
    format!(
        "✅ Channel {} added!\n\nChannels so far: {total}",
        escape(channel)
    )
}

#[must_use]
pub fn duplicate_channel(channel: &str) -> String {
    format!("ℹ️ {} is already on the list.", escape(channel))
}

#[must_use]
pub fn format_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(DATE_FORMAT).to_string()
}

fn summary(
    title: &str,
    prizes: &str,
    channels: &[RequiredChannel],
    ends_at: DateTime<Utc>,
    winner_count: u32,
    offset: FixedOffset,
) -> String {
    let mut text = format!(
        "🎉 <b>{}</b>\n\n🎁 <b>Prizes:</b>\n{}\n\n✅ <b>Conditions:</b>\n",
        escape(title),
        escape(prizes)
    );
    for channel in channels {
        let _ = writeln!(text, "• Subscribe to {}", escape(&channel.username));
    }
    let _ = write!(
        text,
        "\n📅 <b>Results:</b> {}\n🏆 <b>Winners:</b> {winner_count}",
        format_date(ends_at, offset)
    );
    text
}

/// Preview shown before confirmation.
#[must_use]
pub fn preview(draft: &Draft, ends_at: DateTime<Utc>, offset: FixedOffset) -> String {
    let body = summary(
        &draft.title,
        &draft.prizes,
        &draft.channels,
        ends_at,
        draft.winner_count,
        offset,
    );
    format!("✅ <b>Giveaway preview:</b>\n\n{body}")
}

/// Post published in the first channel.
#[must_use]
pub fn announcement(giveaway: &Giveaway, offset: FixedOffset) -> String {
    let body = summary(
        &giveaway.title,
        &giveaway.prizes,
        &giveaway.channels,
        giveaway.ends_at,
        giveaway.winner_count,
        offset,
    );
    format!("{body}\n\n👇 Press the button below to participate")
}

#[must_use]
pub fn created(giveaway: &Giveaway, channel: &str, offset: FixedOffset) -> String {
    format!(
        "✅ <b>Giveaway created!</b>\n\nGiveaway ID: <code>{}</code>\nPublished in: {}\n\n\
         The giveaway ends automatically on {}",
        giveaway.id,
        escape(channel),
        format_date(giveaway.ends_at, offset)
    )
}

#[must_use]
pub fn publish_failed(giveaway: &Giveaway, channel: &str) -> String {
    format!(
        "❌ The giveaway <code>{}</code> was saved but could not be posted to {}.\n\n\
         Check the bot's rights in the channel.",
        giveaway.id,
        escape(channel)
    )
}

/// Mini-app link for one giveaway.
#[must_use]
pub fn participate_link(webapp_url: &str, id: GiveawayId) -> String {
    format!("{}/index.html?draw_id={id}", webapp_url.trim_end_matches('/'))
}
