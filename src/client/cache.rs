// src/client/cache.rs
use crate::models::{catalog::Model, chat::Message};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

#[derive(Debug, Clone)]
pub struct SessionCache {
    stale_time: Duration,
    models: Option<Cached<Vec<Model>>>,
    history: Option<Cached<Vec<Message>>>,
}

impl SessionCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            stale_time,
            models: None,
            history: None,
        }
    }

    pub fn models(&self) -> Option<&[Model]> {
        self.fresh(&self.models).map(Vec::as_slice)
    }

    pub fn store_models(&mut self, models: Vec<Model>) {
        self.models = Some(Cached {
            value: models,
            fetched_at: Instant::now(),
        });
    }

    pub fn history(&self) -> Option<&[Message]> {
        self.fresh(&self.history).map(Vec::as_slice)
    }

    pub fn store_history(&mut self, history: Vec<Message>) {
        self.history = Some(Cached {
            value: history,
            fetched_at: Instant::now(),
        });
    }

    pub fn invalidate_history(&mut self) {
        self.history = None;
    }

    pub fn clear(&mut self) {
        self.models = None;
        self.history = None;
    }

    fn fresh<'a, T>(&self, entry: &'a Option<Cached<T>>) -> Option<&'a T> {
        entry
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.stale_time)
            .map(|cached| &cached.value)
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_go_stale() {
        let mut cache = SessionCache::default();
        cache.store_models(vec![Model::new("gpt-4o")]);
        assert_eq!(cache.models().map(|m| m.len()), Some(1));

        tokio::time::advance(DEFAULT_STALE_TIME + Duration::from_secs(1)).await;
        assert!(cache.models().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_everything() {
        let mut cache = SessionCache::default();
        cache.store_models(vec![Model::new("gpt-4o")]);
        cache.store_history(vec![]);
        assert!(cache.history().is_some());

        cache.invalidate_history();
        assert!(cache.history().is_none());
        assert!(cache.models().is_some());

        cache.clear();
        assert!(cache.models().is_none());
    }
}
