//! In-memory relay for controller tests.
//!
//! Each operation replays results pushed in advance and panics when its
//! script runs dry, which doubles as the "request task crashed" case.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::{ChatApi, ChatRequest, RemoteConfig, SaveConfigRequest, TestConfigRequest};
use crate::error::ApiError;
use crate::tui::AppEvent;

#[derive(Default)]
pub struct ScriptedApi {
    get_config: Mutex<VecDeque<Result<Option<RemoteConfig>, ApiError>>>,
    save_config: Mutex<VecDeque<Result<Option<String>, ApiError>>>,
    test_config: Mutex<VecDeque<Result<Option<String>, ApiError>>>,
    chat: Mutex<VecDeque<Result<String, ApiError>>>,
    saved: Mutex<Vec<SaveConfigRequest>>,
    tested: Mutex<Vec<TestConfigRequest>>,
    chats: Mutex<Vec<ChatRequest>>,
    get_config_calls: Mutex<usize>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_get_config(&self, result: Result<Option<RemoteConfig>, ApiError>) {
        self.get_config.lock().unwrap().push_back(result);
    }

    pub fn push_save_config(&self, result: Result<Option<String>, ApiError>) {
        self.save_config.lock().unwrap().push_back(result);
    }

    pub fn push_test_config(&self, result: Result<Option<String>, ApiError>) {
        self.test_config.lock().unwrap().push_back(result);
    }

    pub fn push_chat(&self, result: Result<String, ApiError>) {
        self.chat.lock().unwrap().push_back(result);
    }

    pub fn get_config_calls(&self) -> usize {
        *self.get_config_calls.lock().unwrap()
    }

    pub fn saved(&self) -> Vec<SaveConfigRequest> {
        self.saved.lock().unwrap().clone()
    }

    pub fn tested(&self) -> Vec<TestConfigRequest> {
        self.tested.lock().unwrap().clone()
    }

    pub fn chat_calls(&self) -> usize {
        self.chats.lock().unwrap().len()
    }

    pub fn chat_messages(&self) -> Vec<String> {
        self.chats
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }
}

#[async_trait]
impl ChatApi for ScriptedApi {
    async fn get_config(&self) -> Result<Option<RemoteConfig>, ApiError> {
        *self.get_config_calls.lock().unwrap() += 1;
        let next = self.get_config.lock().unwrap().pop_front();
        next.expect("no scripted get_config result")
    }

    async fn save_config(&self, request: &SaveConfigRequest) -> Result<Option<String>, ApiError> {
        self.saved.lock().unwrap().push(request.clone());
        let next = self.save_config.lock().unwrap().pop_front();
        next.expect("no scripted save_config result")
    }

    async fn test_config(&self, request: &TestConfigRequest) -> Result<Option<String>, ApiError> {
        self.tested.lock().unwrap().push(request.clone());
        let next = self.test_config.lock().unwrap().pop_front();
        next.expect("no scripted test_config result")
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        self.chats.lock().unwrap().push(request.clone());
        let next = self.chat.lock().unwrap().pop_front();
        next.expect("no scripted chat result")
    }
}

pub async fn next_event(rx: &mut UnboundedReceiver<AppEvent>) -> AppEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for completion")
        .expect("event channel closed")
}
