// src/client/conversation.rs
// Entries are never re-sorted; pending replies are resolved by request id.

use super::{ClientError, RequestId};
use crate::models::chat::{Message, Role, ASSISTANT_AUTHOR};
use chrono::{DateTime, Utc};

pub const WELCOME_MESSAGE: &str = "Welcome! 👋 Start the conversation by sending a message.";
pub const HISTORY_ERROR_MESSAGE: &str = "Failed to load chat history. Please refresh the page.";
pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Uninitialized,
    Loading,
    Populated,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Loaded, optimistic, resolved or synthetic message.
    Message(Message),
    /// Typing placeholder for an in-flight submission. Never persisted.
    PendingReply {
        request_id: RequestId,
        model_tag: String,
        created_at: DateTime<Utc>,
    },
}

impl Entry {
    pub fn message(&self) -> Option<&Message> {
        match self {
            Entry::Message(message) => Some(message),
            Entry::PendingReply { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Entry::PendingReply { .. })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Entry::Message(message) => message.created_at,
            Entry::PendingReply { created_at, .. } => *created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    author: String,
    state: HistoryState,
    entries: Vec<Entry>,
    initialized: bool,
}

impl Conversation {
    /// `author` is the id stamped on optimistic user messages.
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            state: HistoryState::Uninitialized,
            entries: Vec::new(),
            initialized: false,
        }
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(Entry::message)
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        match self.entries.last() {
            Some(Entry::PendingReply { request_id, .. }) => Some(*request_id),
            _ => None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.pending_request().is_some()
    }

    /// The first load clears the list; a refetch keeps it until it resolves.
    pub fn begin_loading(&mut self) {
        if !self.initialized {
            self.entries.clear();
        }
        self.state = HistoryState::Loading;
    }

    pub fn history_loaded(&mut self, messages: Vec<Message>) {
        if !messages.is_empty() {
            self.entries = messages.into_iter().map(Entry::Message).collect();
            self.initialized = true;
        } else if !self.initialized {
            let mut welcome = Message::synthetic(Role::Assistant, WELCOME_MESSAGE);
            welcome.created_at = self.next_timestamp();
            self.entries = vec![Entry::Message(welcome)];
            self.initialized = true;
        }
        self.state = HistoryState::Populated;
    }

    pub fn history_failed(&mut self) {
        self.entries = vec![Entry::Message(Message::synthetic(Role::System, HISTORY_ERROR_MESSAGE))];
        self.state = HistoryState::Failed;
    }

    /// Optimistically appends the user's message and a typing placeholder.
    pub fn begin_submit(&mut self, model_tag: &str, content: &str) -> Result<RequestId, ClientError> {
        if content.is_empty() {
            return Err(ClientError::Validation(EMPTY_MESSAGE_ERROR.to_string()));
        }
        if self.is_submitting() {
            return Err(ClientError::SubmissionInFlight);
        }

        let created_at = self.next_timestamp();
        let request_id = RequestId::new();
        self.entries.push(Entry::Message(Message {
            user_id: self.author.clone(),
            model_tag: model_tag.to_string(),
            role: Role::User,
            content: content.to_string(),
            created_at,
        }));
        self.entries.push(Entry::PendingReply {
            request_id,
            model_tag: model_tag.to_string(),
            created_at,
        });
        Ok(request_id)
    }

    /// Replaces the placeholder of `request_id` with the assistant's reply.
    /// Returns `false` when no such placeholder exists.
    pub fn resolve_reply(&mut self, request_id: RequestId, response: impl Into<String>) -> bool {
        let Some(index) = self.position_of(request_id) else {
            tracing::debug!(%request_id, "ignoring reply for unknown request");
            return false;
        };
        let created_at = self.next_timestamp();
        let model_tag = match &self.entries[index] {
            Entry::PendingReply { model_tag, .. } => model_tag.clone(),
            Entry::Message(_) => unreachable!("position_of only matches placeholders"),
        };
        self.entries[index] = Entry::Message(Message {
            user_id: ASSISTANT_AUTHOR.to_string(),
            model_tag,
            role: Role::Assistant,
            content: response.into(),
            created_at,
        });
        true
    }

    /// Drops the placeholder of `request_id`; the user's message stays.
    pub fn reject_reply(&mut self, request_id: RequestId) -> bool {
        match self.position_of(request_id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    fn position_of(&self, request_id: RequestId) -> Option<usize> {
        self.entries.iter().position(|entry| {
            matches!(entry, Entry::PendingReply { request_id: id, .. } if *id == request_id)
        })
    }

    // Never earlier than anything already shown, whatever the local clock says.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.entries.last() {
            Some(last) => now.max(last.created_at()),
            None => now,
        }
    }
}
