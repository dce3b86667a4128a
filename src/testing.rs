//! Test doubles: a scriptable gateway and a store that always fails.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::store::{
    Giveaway, GiveawayId, GiveawayStatus, GiveawayStore, InMemoryStore, NewGiveaway,
    Participant, StoreError, Winner,
};
use crate::telegram::{
    BotIdentity, ChatTarget, InlineKeyboard, MemberStatus, MessageRef, MessagingGateway,
    TelegramError, UserId,
};

pub const BOT_ID: UserId = 999;

/// A message the code under test delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: ChatTarget,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

impl SentMessage {
    pub fn callbacks(&self) -> Vec<String> {
        self.keyboard
            .as_ref()
            .map(|k| k.callbacks().map(str::to_owned).collect())
            .unwrap_or_default()
    }
}

/// Membership answers are scripted per `(chat, user)`; anything unscripted
/// fails like Telegram does for an unknown user.
#[derive(Debug, Default)]
pub struct MockGateway {
    statuses: Mutex<HashMap<(String, UserId), Result<MemberStatus, TelegramError>>>,
    send_failures: Mutex<HashMap<String, TelegramError>>,
    self_failure: Mutex<Option<TelegramError>>,
    sent: Mutex<Vec<SentMessage>>,
    answered: Mutex<Vec<String>>,
    next_message_id: AtomicI64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, chat: &str, user: UserId, status: MemberStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert((chat.to_owned(), user), Ok(status));
    }

    /// Makes `user` a member and the bot an administrator of `chat`.
    pub fn allow(&self, chat: &str, user: UserId) {
        self.set_status(chat, user, MemberStatus::Member);
        self.set_status(chat, BOT_ID, MemberStatus::Administrator);
    }

    pub fn fail_status(&self, chat: &str, user: UserId, err: TelegramError) {
        self.statuses
            .lock()
            .unwrap()
            .insert((chat.to_owned(), user), Err(err));
    }

    pub fn fail_sends_to(&self, chat: &str, err: TelegramError) {
        self.send_failures
            .lock()
            .unwrap()
            .insert(chat.to_owned(), err);
    }

    pub fn restore_sends_to(&self, chat: &str) {
        self.send_failures.lock().unwrap().remove(chat);
    }

    pub fn fail_get_self(&self, err: TelegramError) {
        *self.self_failure.lock().unwrap() = Some(err);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat: impl Into<ChatTarget>) -> Vec<SentMessage> {
        let chat = chat.into();
        self.sent()
            .into_iter()
            .filter(|m| m.chat == chat)
            .collect()
    }

    pub fn last_sent(&self) -> Option<SentMessage> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }
}

fn user_not_found() -> TelegramError {
    TelegramError::Api {
        code: 400,
        description: "Bad Request: user not found".to_owned(),
    }
}

impl MessagingGateway for MockGateway {
    async fn get_chat_member(
        &self,
        chat: &ChatTarget,
        user: UserId,
    ) -> Result<MemberStatus, TelegramError> {
        self.statuses
            .lock()
            .unwrap()
            .get(&(chat.to_string(), user))
            .cloned()
            .unwrap_or_else(|| Err(user_not_found()))
    }

    async fn send_message(
        &self,
        chat: &ChatTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef, TelegramError> {
        if let Some(err) = self.send_failures.lock().unwrap().get(&chat.to_string()) {
            return Err(err.clone());
        }

        self.sent.lock().unwrap().push(SentMessage {
            chat: chat.clone(),
            text: text.to_owned(),
            keyboard: keyboard.cloned(),
        });
        let chat_id = match chat {
            ChatTarget::Id(id) => *id,
            ChatTarget::Username(_) => -1_001,
        };
        Ok(MessageRef {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn get_self(&self) -> Result<BotIdentity, TelegramError> {
        if let Some(err) = self.self_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(BotIdentity {
            id: BOT_ID,
            first_name: "Giveaway Bot".to_owned(),
            username: Some("giveaway_test_bot".to_owned()),
        })
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        self.answered.lock().unwrap().push(callback_id.to_owned());
        Ok(())
    }
}

/// A store whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingStore;

fn offline() -> StoreError {
    StoreError::Backend("database is offline".to_owned())
}

impl GiveawayStore for FailingStore {
    async fn create_giveaway(&self, _new: NewGiveaway) -> Result<Giveaway, StoreError> {
        Err(offline())
    }

    async fn giveaway(&self, _id: GiveawayId) -> Result<Option<Giveaway>, StoreError> {
        Err(offline())
    }

    async fn giveaways_by_status(
        &self,
        _status: GiveawayStatus,
    ) -> Result<Vec<Giveaway>, StoreError> {
        Err(offline())
    }

    async fn set_published_message(
        &self,
        _id: GiveawayId,
        _message: MessageRef,
    ) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn add_participant(&self, _participant: Participant) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn participant(
        &self,
        _id: GiveawayId,
        _user_id: UserId,
    ) -> Result<Option<Participant>, StoreError> {
        Err(offline())
    }

    async fn participants(&self, _id: GiveawayId) -> Result<Vec<Participant>, StoreError> {
        Err(offline())
    }

    async fn winners(&self, _id: GiveawayId) -> Result<Vec<Winner>, StoreError> {
        Err(offline())
    }

    async fn complete_giveaway(
        &self,
        _id: GiveawayId,
        _winners: Vec<Winner>,
    ) -> Result<bool, StoreError> {
        Err(offline())
    }

    async fn pending_announcements(&self) -> Result<Vec<Giveaway>, StoreError> {
        Err(offline())
    }

    async fn mark_results_announced(&self, _id: GiveawayId) -> Result<(), StoreError> {
        Err(offline())
    }
}

/// An in-memory store whose single-participant lookup never finds anything,
/// as when a concurrent registration commits between lookup and insert.
#[derive(Debug, Default)]
pub struct StaleLookupStore(pub InMemoryStore);

impl GiveawayStore for StaleLookupStore {
    async fn create_giveaway(&self, new: NewGiveaway) -> Result<Giveaway, StoreError> {
        self.0.create_giveaway(new).await
    }

    async fn giveaway(&self, id: GiveawayId) -> Result<Option<Giveaway>, StoreError> {
        self.0.giveaway(id).await
    }

    async fn giveaways_by_status(
        &self,
        status: GiveawayStatus,
    ) -> Result<Vec<Giveaway>, StoreError> {
        self.0.giveaways_by_status(status).await
    }

    async fn set_published_message(
        &self,
        id: GiveawayId,
        message: MessageRef,
    ) -> Result<(), StoreError> {
        self.0.set_published_message(id, message).await
    }

    async fn add_participant(&self, participant: Participant) -> Result<(), StoreError> {
        self.0.add_participant(participant).await
    }

    async fn participant(
        &self,
        _id: GiveawayId,
        _user_id: UserId,
    ) -> Result<Option<Participant>, StoreError> {
        Ok(None)
    }

    async fn participants(&self, id: GiveawayId) -> Result<Vec<Participant>, StoreError> {
        self.0.participants(id).await
    }

    async fn winners(&self, id: GiveawayId) -> Result<Vec<Winner>, StoreError> {
        self.0.winners(id).await
    }

    async fn complete_giveaway(
        &self,
        id: GiveawayId,
        winners: Vec<Winner>,
    ) -> Result<bool, StoreError> {
        self.0.complete_giveaway(id, winners).await
    }

    async fn pending_announcements(&self) -> Result<Vec<Giveaway>, StoreError> {
        self.0.pending_announcements().await
    }

    async fn mark_results_announced(&self, id: GiveawayId) -> Result<(), StoreError> {
        self.0.mark_results_announced(id).await
    }
}
