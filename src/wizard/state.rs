//! Wizard states, the draft, and input validation.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use thiserror::Error;

use crate::config::DATE_FORMAT;
use crate::store::{NewGiveaway, RequiredChannel};
use crate::telegram::UserId;

/// Where a creation conversation currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Title,
    Prizes,
    WinnerCount,
    Conditions,
    ChannelInput,
    /// `channel` failed verification and waits for a retry or a new channel.
    ChannelVerifying { channel: String },
    MoreChannels,
    EndDate,
    Confirming,
    Done,
    Cancelled,
}

impl WizardState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

/// Giveaway fields collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub prizes: String,
    pub winner_count: u32,
    pub channels: Vec<RequiredChannel>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Draft {
    /// Appends a verified channel unless it is already listed.
    ///
    /// Returns `false` for a duplicate.
    pub fn add_channel(&mut self, username: &str) -> bool {
        if self.has_channel(username) {
            return false;
        }
        self.channels.push(RequiredChannel::verified(username));
        true
    }

    #[must_use]
    pub fn has_channel(&self, username: &str) -> bool {
        self.channels
            .iter()
            .any(|c| c.username.eq_ignore_ascii_case(username))
    }

    #[must_use]
    pub fn has_verified_channel(&self) -> bool {
        self.channels.iter().any(|c| c.is_verified)
    }

    /// The insert payload, once every field is filled in.
    #[must_use]
    pub fn to_new_giveaway(&self, owner_id: UserId) -> Option<NewGiveaway> {
        Some(NewGiveaway {
            owner_id,
            title: self.title.clone(),
            prizes: self.prizes.clone(),
            winner_count: self.winner_count,
            channels: self.channels.clone(),
            ends_at: self.ends_at?,
        })
    }
}

/// Canonical `@handle` for whatever the creator typed.
///
/// `@name` is kept as is, a `t.me/` link is reduced to its path, and a bare
/// name gets an `@` prefix.
#[must_use]
pub fn normalize_channel(input: &str) -> String {
    let input = input.trim();
    if input.starts_with('@') {
        return input.to_owned();
    }
    match input.rsplit_once("t.me/") {
        Some((_, path)) => format!("@{}", path.trim_matches('/')),
        None => format!("@{input}"),
    }
}

/// A positive winner count, or `None`.
#[must_use]
pub fn parse_winner_count(input: &str) -> Option<u32> {
    input.trim().parse::<u32>().ok().filter(|&n| n >= 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EndDateError {
    #[error("end date must look like 31.12.2099 23:59")]
    Format,

    #[error("end date must be in the future")]
    NotInFuture,
}

/// Parses `DD.MM.YYYY HH:MM` typed in `offset` and returns it in UTC.
pub fn parse_end_date(
    input: &str,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, EndDateError> {
    let naive =
        NaiveDateTime::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| EndDateError::Format)?;
    let ends_at = naive
        .and_local_timezone(offset)
        .single()
        .ok_or(EndDateError::Format)?
        .with_timezone(&Utc);

    if ends_at <= now {
        return Err(EndDateError::NotInFuture);
    }
    Ok(ends_at)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn moscow() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("mychannel"), "@mychannel");
        assert_eq!(normalize_channel("https://t.me/mychannel"), "@mychannel");
        assert_eq!(normalize_channel("t.me/mychannel/"), "@mychannel");
        assert_eq!(normalize_channel("@mychannel"), "@mychannel");
        assert_eq!(normalize_channel("  @mychannel  "), "@mychannel");
    }

    #[test]
    fn test_parse_winner_count() {
        assert_eq!(parse_winner_count("abc"), None);
        assert_eq!(parse_winner_count("0"), None);
        assert_eq!(parse_winner_count("-2"), None);
        assert_eq!(parse_winner_count("3"), Some(3));
        assert_eq!(parse_winner_count(" 12 "), Some(12));
    }

    #[test]
    fn test_parse_end_date_uses_offset() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let parsed = parse_end_date("31.12.2099 23:59", moscow(), now).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2099, 12, 31, 20, 59, 0).unwrap());
    }

    #[test]
    fn test_parse_end_date_rejects_past_and_garbage() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            parse_end_date("01.01.2020 00:00", moscow(), now),
            Err(EndDateError::NotInFuture)
        );
        assert_eq!(
            parse_end_date("2099-12-31 23:59", moscow(), now),
            Err(EndDateError::Format)
        );
        assert_eq!(
            parse_end_date("31.12.2099", moscow(), now),
            Err(EndDateError::Format)
        );
    }

    #[test]
    fn test_draft_rejects_duplicate_channel() {
        let mut draft = Draft::default();
        assert!(draft.add_channel("@chan"));
        assert!(!draft.add_channel("@Chan"));
        assert_eq!(draft.channels.len(), 1);
        assert!(draft.has_verified_channel());
    }

    #[test]
    fn test_incomplete_draft_has_no_payload() {
        let draft = Draft {
            title: "T".to_owned(),
            winner_count: 1,
            ..Draft::default()
        };
        assert!(draft.to_new_giveaway(1).is_none());
    }
}
