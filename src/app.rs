use std::sync::Arc;
use std::time::Instant;

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::ChatApi;
use crate::busy::BusyIndicator;
use crate::chat::{ChatReply, ChatSession};
use crate::config::ClientConfig;
use crate::countdown::Countdown;
use crate::input::TextField;
use crate::notify::Notifier;
use crate::settings::{ConfigClient, ConfigOutcome, SettingsForm};
use crate::transcript::Transcript;
use crate::tui::AppEvent;

/// Rows the message box may grow to before it scrolls.
pub const MAX_INPUT_LINES: u16 = 6;

/// Sole owner of all UI state. Only the main loop mutates it; request tasks
/// report back through `AppEvent`s instead.
pub struct App {
    pub should_quit: bool,

    pub transcript: Transcript,
    pub notifier: Notifier,
    pub busy: BusyIndicator,
    pub settings: SettingsForm,
    pub input: TextField,
    pub countdown: Option<Countdown>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Transcript viewport, updated during render
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_lines: u16, // wrapped content rows, measured by the renderer
    pub transcript_area: Option<Rect>,

    chat: ChatSession,
    config_client: ConfigClient,
}

impl App {
    pub fn new(api: Arc<dyn ChatApi>, events: UnboundedSender<AppEvent>, config: &ClientConfig) -> Self {
        let countdown = match config.countdown_target() {
            Ok(target) => Countdown::from_local(target),
            Err(err) => {
                tracing::warn!(%err, "countdown disabled");
                None
            }
        };

        Self {
            should_quit: false,

            transcript: Transcript::new(),
            notifier: Notifier::new(),
            busy: BusyIndicator::default(),
            settings: SettingsForm::default(),
            input: TextField::new(),
            countdown,

            animation_frame: 0,

            transcript_scroll: 0,
            transcript_height: 0,
            transcript_lines: 0,
            transcript_area: None,

            chat: ChatSession::new(Arc::clone(&api), events.clone()),
            config_client: ConfigClient::new(api, events, config.defaults()),
        }
    }

    /// Session start: fetch the relay's current configuration.
    pub fn start(&mut self) {
        self.config_client.load(&mut self.busy);
    }

    pub fn send_message(&mut self) {
        let text = self.input.value().to_string();
        if self.chat.send(&mut self.transcript, &text).is_some() {
            self.input.clear();
        }
    }

    pub fn save_settings(&mut self) {
        let _ = self.config_client.save(
            self.settings.api_url.value(),
            self.settings.api_key.value(),
            self.settings.model_name.value(),
            &mut self.busy,
            &mut self.notifier,
        );
    }

    pub fn test_settings(&mut self) {
        let _ = self.config_client.test(
            self.settings.api_url.value(),
            self.settings.api_key.value(),
            &mut self.busy,
            &mut self.notifier,
        );
    }

    pub fn open_settings(&mut self) {
        self.settings.open();
    }

    pub fn close_settings(&mut self) {
        self.settings.close();
    }

    pub fn on_chat_reply(&mut self, reply: ChatReply) {
        self.chat.resolve(&mut self.transcript, reply);
    }

    pub fn on_config_outcome(&mut self, outcome: ConfigOutcome) {
        self.config_client.settle(
            outcome,
            &mut self.settings,
            &mut self.busy,
            &mut self.notifier,
        );
    }

    pub fn chats_in_flight(&self) -> usize {
        self.chat.in_flight()
    }

    pub fn tick(&mut self) {
        self.notifier.prune(Instant::now());
        if self.chat.in_flight() > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn input_height(&self) -> u16 {
        (self.input.line_count() as u16).clamp(1, MAX_INPUT_LINES) + 2 // +2 for borders
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.transcript_lines.saturating_sub(self.transcript_height);
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(max);
    }

    /// Scroll the transcript so the newest entry is visible
    pub fn scroll_to_bottom(&mut self) {
        self.transcript_scroll = self.transcript_lines.saturating_sub(self.transcript_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteConfig;
    use crate::chat::NETWORK_ERROR_TEXT;
    use crate::error::ApiError;
    use crate::notify::Severity;
    use crate::settings::KEY_CONFIGURED_HINT;
    use crate::testing::{next_event, ScriptedApi};
    use crate::transcript::Author;
    use tokio::sync::mpsc;

    fn app(api: Arc<ScriptedApi>) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(api, tx, &ClientConfig::new()), rx)
    }

    async fn pump(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        match next_event(rx).await {
            AppEvent::Chat(reply) => app.on_chat_reply(reply),
            AppEvent::Config(outcome) => app.on_config_outcome(outcome),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.input.insert(c);
        }
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Ok("Hi there".into()));
        let (mut app, mut rx) = app(api);

        type_text(&mut app, "Hello");
        app.send_message();
        assert!(app.input.is_empty());
        assert!(!app.busy.is_active());

        pump(&mut app, &mut rx).await;

        let messages: Vec<(Author, &str)> = app
            .transcript
            .iter()
            .map(|m| (m.author, m.body.as_str()))
            .collect();
        assert_eq!(
            messages,
            vec![(Author::User, "Hello"), (Author::Assistant, "Hi there")]
        );
        assert_eq!(app.transcript.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_shows_network_error() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Err(ApiError::transport("socket closed")));
        let (mut app, mut rx) = app(api);

        type_text(&mut app, "Hello");
        app.send_message();
        pump(&mut app, &mut rx).await;

        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.last().unwrap().body, NETWORK_ERROR_TEXT);
        assert_eq!(app.transcript.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_input_is_kept_and_not_sent() {
        let api = Arc::new(ScriptedApi::new());
        let (mut app, _rx) = app(api.clone());

        type_text(&mut app, "   ");
        app.send_message();

        assert_eq!(app.input.value(), "   ");
        assert!(app.transcript.is_empty());
        assert_eq!(api.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_start_loads_configuration() {
        let api = Arc::new(ScriptedApi::new());
        api.push_get_config(Ok(Some(RemoteConfig {
            api_url: Some("X".into()),
            model_name: Some("Y".into()),
            has_api_key: true,
        })));
        let (mut app, mut rx) = app(api.clone());

        app.start();
        assert!(app.busy.is_active());
        pump(&mut app, &mut rx).await;

        assert_eq!(api.get_config_calls(), 1);
        assert!(!app.busy.is_active());
        assert_eq!(app.settings.api_url.value(), "X");
        assert_eq!(app.settings.model_name.value(), "Y");
        assert_eq!(app.settings.key_hint.as_deref(), Some(KEY_CONFIGURED_HINT));
    }

    #[tokio::test]
    async fn test_save_from_form_closes_panel() {
        let api = Arc::new(ScriptedApi::new());
        api.push_save_config(Ok(Some("Saved".into())));
        let (mut app, mut rx) = app(api.clone());

        app.open_settings();
        app.settings.api_url.set("https://llm.example");
        app.settings.api_key.set("sk-abc");
        app.settings.model_name.set("glm-4");
        app.save_settings();
        pump(&mut app, &mut rx).await;

        assert!(!app.settings.open);
        assert!(!app.busy.is_active());
        assert_eq!(api.saved().len(), 1);
        assert_eq!(
            app.notifier.iter().next().map(|n| n.severity),
            Some(Severity::Success)
        );
    }

    #[tokio::test]
    async fn test_chat_does_not_touch_busy() {
        let api = Arc::new(ScriptedApi::new());
        api.push_chat(Ok("pong".into()));
        let (mut app, mut rx) = app(api);

        type_text(&mut app, "ping");
        app.send_message();
        assert_eq!(app.chats_in_flight(), 1);
        assert!(!app.busy.is_active());

        pump(&mut app, &mut rx).await;
        assert_eq!(app.chats_in_flight(), 0);
    }

    #[test]
    fn test_input_height_is_capped() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(ScriptedApi::new()), tx, &ClientConfig::new());
        assert_eq!(app.input_height(), 3);

        app.input.set("1\n2\n3\n4\n5\n6\n7\n8");
        assert_eq!(app.input_height(), MAX_INPUT_LINES + 2);
    }

    #[test]
    fn test_scroll_is_clamped_to_content() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(ScriptedApi::new()), tx, &ClientConfig::new());
        app.transcript_lines = 5;
        app.transcript_height = 4;

        app.scroll_to_bottom();
        assert_eq!(app.transcript_scroll, 1);

        app.scroll_up(5);
        assert_eq!(app.transcript_scroll, 0);
        app.scroll_down(10);
        assert_eq!(app.transcript_scroll, 1);
    }
}
