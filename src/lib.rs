// lib.rs - Main library file that exports all modules
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rpc;
pub mod services;
pub mod store;

use config::Settings;
use services::{chat::ChatService, responder::EchoResponder};
use std::sync::Arc;
use store::Store;

// AppState holds the store handle, the chat service built on it, and settings
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub chat: ChatService,
    pub settings: Settings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, settings: Settings) -> Self {
        let chat = ChatService::new(store.clone(), Arc::new(EchoResponder));
        Self { store, chat, settings }
    }
}
