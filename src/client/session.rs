// src/client/session.rs
// Calls race the session's cancellation token; a cancelled call leaves the conversation untouched.

use super::cache::SessionCache;
use super::conversation::Conversation;
use super::scroll::ScrollHandle;
use super::{ChatApi, ClientError};
use crate::models::{catalog::Model, chat::Message};
use crate::rpc::SendInput;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct ChatSession<A: ?Sized> {
    api: Arc<A>,
    conversation: Conversation,
    cache: SessionCache,
    cancel: CancellationToken,
    scroll: Option<ScrollHandle>,
}

impl<A: ChatApi + ?Sized> ChatSession<A> {
    pub fn new(api: Arc<A>, author: impl Into<String>) -> Self {
        Self {
            api,
            conversation: Conversation::new(author),
            cache: SessionCache::default(),
            cancel: CancellationToken::new(),
            scroll: None,
        }
    }

    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = cache;
        self
    }

    /// Notifies `scroll` after every change to the visible list.
    pub fn with_scroll(mut self, scroll: ScrollHandle) -> Self {
        self.scroll = Some(scroll);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Token to cancel from the owner's teardown path.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Seeds the cache with data fetched outside the session, e.g. a prefetch batch.
    pub fn prime(&mut self, models: Option<Vec<Model>>, history: Option<Vec<Message>>) {
        if let Some(models) = models {
            self.cache.store_models(models);
        }
        if let Some(history) = history {
            self.cache.store_history(history);
        }
    }

    pub async fn load_models(&mut self) -> Result<Vec<Model>, ClientError> {
        if let Some(models) = self.cache.models() {
            return Ok(models.to_vec());
        }
        let models = self.run(self.api.list_models()).await?;
        self.cache.store_models(models.clone());
        Ok(models)
    }

    /// Loads history into the conversation. Failures are absorbed into the
    /// list as a synthetic error entry and also returned.
    pub async fn load_history(&mut self) -> Result<(), ClientError> {
        if self.is_disposed() {
            return Err(ClientError::Cancelled);
        }
        if self.conversation.is_submitting() {
            return Err(ClientError::SubmissionInFlight);
        }

        if let Some(history) = self.cache.history() {
            let history = history.to_vec();
            self.conversation.history_loaded(history);
            self.changed();
            return Ok(());
        }

        self.conversation.begin_loading();
        self.changed();

        match self.run(self.api.history()).await {
            Ok(history) => {
                self.cache.store_history(history.clone());
                self.conversation.history_loaded(history);
                self.changed();
                Ok(())
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                tracing::warn!("failed to load chat history: {}", e);
                self.conversation.history_failed();
                self.changed();
                Err(e)
            }
        }
    }

    /// Sends `content`, returning the assistant's reply.
    pub async fn submit(&mut self, model_tag: &str, content: &str) -> Result<String, ClientError> {
        if self.is_disposed() {
            return Err(ClientError::Cancelled);
        }

        let request_id = self.conversation.begin_submit(model_tag, content)?;
        self.changed();

        let input = SendInput {
            model_tag: model_tag.to_string(),
            prompt: content.to_string(),
        };
        match self.run(self.api.send(input)).await {
            Ok(output) => {
                self.conversation.resolve_reply(request_id, output.response.clone());
                self.cache.invalidate_history();
                self.changed();
                Ok(output.response)
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                tracing::warn!(%request_id, "send failed: {}", e);
                self.conversation.reject_reply(request_id);
                // the prompt may have been stored before the failure
                self.cache.invalidate_history();
                self.changed();
                Err(e)
            }
        }
    }

    /// Drops cached data and cancels anything in flight.
    pub fn logout(&mut self) {
        self.cache.clear();
        self.dispose();
    }

    pub fn dispose(&mut self) {
        self.cancel.cancel();
    }

    async fn run<T, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            result = call => result,
        }
    }

    fn changed(&self) {
        if let Some(scroll) = &self.scroll {
            scroll.notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::conversation::{Entry, HistoryState, HISTORY_ERROR_MESSAGE, WELCOME_MESSAGE};
    use crate::models::chat::Role;
    use crate::rpc::{ErrorCode, RpcError, SendOutput};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MockApi {
        fail_send: bool,
        fail_history: bool,
        hang: bool,
        history: Mutex<Vec<Message>>,
        history_calls: AtomicUsize,
        model_calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatApi for MockApi {
        async fn send(&self, input: SendInput) -> Result<SendOutput, ClientError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail_send {
                return Err(RpcError::new(ErrorCode::StorageFailure, "Failed to store user message").into());
            }
            Ok(SendOutput {
                response: format!("You said: {}", input.prompt),
            })
        }

        async fn history(&self) -> Result<Vec<Message>, ClientError> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_history {
                return Err(RpcError::new(ErrorCode::HistoryUnavailable, "Failed to fetch message history").into());
            }
            Ok(self.history.lock().unwrap().clone())
        }

        async fn list_models(&self) -> Result<Vec<Model>, ClientError> {
            self.model_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Model::new("gpt-4o")])
        }
    }

    fn contents(session: &ChatSession<MockApi>) -> Vec<(Role, String)> {
        session
            .conversation()
            .entries()
            .iter()
            .map(|e| {
                let m = e.message().expect("no pending entries after resolution");
                (m.role, m.content.clone())
            })
            .collect()
    }

    #[tokio::test]
    async fn successful_send_replaces_typing_with_reply() {
        let mut session = ChatSession::new(Arc::new(MockApi::default()), "user-1");

        let reply = session.submit("gpt-4o", "hello").await.unwrap();
        assert_eq!(reply, "You said: hello");
        assert_eq!(
            contents(&session),
            [
                (Role::User, "hello".to_string()),
                (Role::Assistant, "You said: hello".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn failed_send_keeps_only_the_user_message() {
        let api = MockApi {
            fail_send: true,
            ..MockApi::default()
        };
        let mut session = ChatSession::new(Arc::new(api), "user-1");

        let err = session.submit("gpt-4o", "hello").await.unwrap_err();
        assert!(matches!(err, ClientError::Rpc(ref e) if e.code == ErrorCode::StorageFailure));
        assert_eq!(contents(&session), [(Role::User, "hello".to_string())]);

        // the session stays usable
        assert!(!session.conversation().is_submitting());
    }

    #[tokio::test]
    async fn empty_history_shows_the_welcome_entry() {
        let mut session = ChatSession::new(Arc::new(MockApi::default()), "user-1");
        session.load_history().await.unwrap();

        assert_eq!(session.conversation().state(), HistoryState::Populated);
        assert_eq!(contents(&session), [(Role::Assistant, WELCOME_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn history_failure_becomes_an_inline_error() {
        let api = MockApi {
            fail_history: true,
            ..MockApi::default()
        };
        let mut session = ChatSession::new(Arc::new(api), "user-1");

        assert!(session.load_history().await.is_err());
        assert_eq!(session.conversation().state(), HistoryState::Failed);
        assert_eq!(contents(&session), [(Role::System, HISTORY_ERROR_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn cached_history_and_models_skip_the_network() {
        let api = Arc::new(MockApi::default());
        api.history.lock().unwrap().push(Message {
            user_id: "user-1".into(),
            model_tag: "gpt-4o".into(),
            role: Role::User,
            content: "earlier".into(),
            created_at: Utc::now(),
        });
        let mut session = ChatSession::new(api.clone(), "user-1");

        session.load_history().await.unwrap();
        session.load_history().await.unwrap();
        assert_eq!(api.history_calls.load(Ordering::SeqCst), 1);

        session.load_models().await.unwrap();
        session.load_models().await.unwrap();
        assert_eq!(api.model_calls.load(Ordering::SeqCst), 1);

        // a send makes the cached history stale
        session.submit("gpt-4o", "more").await.unwrap();
        session.load_history().await.unwrap();
        assert_eq!(api.history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_send_refetches_history() {
        let api = Arc::new(MockApi {
            fail_send: true,
            ..MockApi::default()
        });
        let earlier = Message {
            user_id: "user-1".into(),
            model_tag: "gpt-4o".into(),
            role: Role::User,
            content: "earlier".into(),
            created_at: Utc::now(),
        };
        api.history.lock().unwrap().push(earlier.clone());
        let mut session = ChatSession::new(api.clone(), "user-1");
        session.load_history().await.unwrap();

        assert!(session.submit("gpt-4o", "hello").await.is_err());
        // the server kept the prompt even though the reply failed
        api.history.lock().unwrap().push(Message {
            content: "hello".into(),
            ..earlier
        });

        session.load_history().await.unwrap();
        assert_eq!(api.history_calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            contents(&session),
            [(Role::User, "earlier".to_string()), (Role::User, "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn primed_data_is_served_from_the_cache() {
        let api = Arc::new(MockApi::default());
        let mut session = ChatSession::new(api.clone(), "user-1");
        session.prime(Some(vec![Model::new("gpt-4")]), Some(vec![]));

        let models = session.load_models().await.unwrap();
        assert_eq!(models[0].tag, "gpt-4");
        session.load_history().await.unwrap();
        assert_eq!(api.model_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.history_calls.load(Ordering::SeqCst), 0);
        assert_eq!(contents(&session), [(Role::Assistant, WELCOME_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn cancelled_calls_do_not_touch_the_conversation() {
        let api = MockApi {
            hang: true,
            ..MockApi::default()
        };
        let mut session = ChatSession::new(Arc::new(api), "user-1");
        let token = session.cancellation_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = session.submit("gpt-4o", "hello").await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));

        // optimistic entries stay as they were when the session was torn down
        let entries = session.conversation().entries();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[1], Entry::PendingReply { .. }));

        assert!(matches!(session.submit("gpt-4o", "again").await, Err(ClientError::Cancelled)));
        assert!(matches!(session.load_history().await, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn changes_notify_the_scroller() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let (handle, _task) = crate::client::scroll::spawn_scroller(
            Duration::from_millis(1),
            CancellationToken::new(),
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            },
        );

        let mut session = ChatSession::new(Arc::new(MockApi::default()), "user-1").with_scroll(handle);
        session.submit("gpt-4o", "hello").await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
