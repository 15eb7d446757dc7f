//! Endpoint configuration: the settings form and the client that loads,
//! saves and tests it through the relay.
//!
//! Every request raises the busy indicator before it is issued and lowers it
//! when its outcome comes back. The request runs in a spawned task whose
//! panics are converted into a transport failure, so an outcome always
//! arrives and the indicator is never left raised.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::api::{ChatApi, RemoteConfig, SaveConfigRequest, TestConfigRequest};
use crate::busy::BusyIndicator;
use crate::config::ConfigDefaults;
use crate::error::{ApiError, ValidationError};
use crate::input::TextField;
use crate::notify::{Notifier, Severity};
use crate::tui::AppEvent;

pub const KEY_CONFIGURED_HINT: &str = "Configured (type a new key to replace it)";

const LOAD_FAILED: &str = "Could not load configuration, check your network";
const SAVE_REJECTED: &str = "Failed to save configuration";
const SAVE_TRANSPORT: &str = "Error while saving configuration";
const SAVE_OK: &str = "Configuration saved";
const TEST_REJECTED: &str = "Connection test failed";
const TEST_TRANSPORT: &str = "Error while testing configuration";
const TEST_OK: &str = "Connection succeeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsField {
    #[default]
    ApiUrl,
    ApiKey,
    ModelName,
}

impl SettingsField {
    pub fn all() -> [SettingsField; 3] {
        [SettingsField::ApiUrl, SettingsField::ApiKey, SettingsField::ModelName]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::ApiUrl => "API URL",
            SettingsField::ApiKey => "API Key",
            SettingsField::ModelName => "Model",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SettingsField::ApiUrl => SettingsField::ApiKey,
            SettingsField::ApiKey => SettingsField::ModelName,
            SettingsField::ModelName => SettingsField::ApiUrl,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            SettingsField::ApiUrl => SettingsField::ModelName,
            SettingsField::ApiKey => SettingsField::ApiUrl,
            SettingsField::ModelName => SettingsField::ApiKey,
        }
    }
}

/// In-memory form fields. Nothing here outlives the session.
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub api_url: TextField,
    pub api_key: TextField,
    pub model_name: TextField,
    /// Shown in place of the key when the relay already holds one.
    pub key_hint: Option<String>,
    pub focus: SettingsField,
    pub open: bool,
}

impl SettingsForm {
    pub fn field(&self, field: SettingsField) -> &TextField {
        match field {
            SettingsField::ApiUrl => &self.api_url,
            SettingsField::ApiKey => &self.api_key,
            SettingsField::ModelName => &self.model_name,
        }
    }

    pub fn focused_mut(&mut self) -> &mut TextField {
        match self.focus {
            SettingsField::ApiUrl => &mut self.api_url,
            SettingsField::ApiKey => &mut self.api_key,
            SettingsField::ModelName => &mut self.model_name,
        }
    }

    pub fn open(&mut self) {
        self.open = true;
        self.focus = SettingsField::ApiUrl;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    fn apply_defaults(&mut self, defaults: &ConfigDefaults) {
        self.api_url.set(defaults.api_url.clone());
        self.model_name.set(defaults.model_name.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOp {
    Load,
    Save,
    Test,
}

/// Completion of one configuration request, delivered back to the main loop.
#[derive(Debug)]
pub enum ConfigOutcome {
    Loaded(Result<Option<RemoteConfig>, ApiError>),
    Saved(Result<Option<String>, ApiError>),
    Tested(Result<Option<String>, ApiError>),
}

impl ConfigOutcome {
    fn aborted(op: ConfigOp, err: ApiError) -> Self {
        match op {
            ConfigOp::Load => ConfigOutcome::Loaded(Err(err)),
            ConfigOp::Save => ConfigOutcome::Saved(Err(err)),
            ConfigOp::Test => ConfigOutcome::Tested(Err(err)),
        }
    }
}

pub fn validate_save(
    api_url: &str,
    api_key: &str,
    model_name: &str,
) -> Result<SaveConfigRequest, ValidationError> {
    let (api_url, api_key, model_name) = (api_url.trim(), api_key.trim(), model_name.trim());
    if api_url.is_empty() || model_name.is_empty() {
        return Err(ValidationError::MissingUrlOrModel);
    }
    if api_key.is_empty() {
        return Err(ValidationError::MissingKey);
    }
    Ok(SaveConfigRequest {
        api_url: api_url.to_string(),
        api_key: api_key.to_string(),
        model_name: model_name.to_string(),
    })
}

pub fn validate_test(api_url: &str, api_key: &str) -> Result<TestConfigRequest, ValidationError> {
    let (api_url, api_key) = (api_url.trim(), api_key.trim());
    if api_url.is_empty() || api_key.is_empty() {
        return Err(ValidationError::MissingUrlOrKey);
    }
    Ok(TestConfigRequest {
        api_url: api_url.to_string(),
        api_key: api_key.to_string(),
    })
}

pub struct ConfigClient {
    api: Arc<dyn ChatApi>,
    events: UnboundedSender<AppEvent>,
    defaults: ConfigDefaults,
}

impl ConfigClient {
    pub fn new(
        api: Arc<dyn ChatApi>,
        events: UnboundedSender<AppEvent>,
        defaults: ConfigDefaults,
    ) -> Self {
        Self {
            api,
            events,
            defaults,
        }
    }

    pub fn load(&self, busy: &mut BusyIndicator) {
        let api = Arc::clone(&self.api);
        self.dispatch(ConfigOp::Load, busy, async move {
            ConfigOutcome::Loaded(api.get_config().await)
        });
    }

    pub fn save(
        &self,
        api_url: &str,
        api_key: &str,
        model_name: &str,
        busy: &mut BusyIndicator,
        notifier: &mut Notifier,
    ) -> Result<(), ValidationError> {
        let request = validate_save(api_url, api_key, model_name)
            .inspect_err(|err| notifier.emit(err.to_string(), Severity::Error))?;

        let api = Arc::clone(&self.api);
        self.dispatch(ConfigOp::Save, busy, async move {
            ConfigOutcome::Saved(api.save_config(&request).await)
        });
        Ok(())
    }

    pub fn test(
        &self,
        api_url: &str,
        api_key: &str,
        busy: &mut BusyIndicator,
        notifier: &mut Notifier,
    ) -> Result<(), ValidationError> {
        let request = validate_test(api_url, api_key)
            .inspect_err(|err| notifier.emit(err.to_string(), Severity::Error))?;

        let api = Arc::clone(&self.api);
        self.dispatch(ConfigOp::Test, busy, async move {
            ConfigOutcome::Tested(api.test_config(&request).await)
        });
        Ok(())
    }

    fn dispatch<F>(&self, op: ConfigOp, busy: &mut BusyIndicator, request: F)
    where
        F: Future<Output = ConfigOutcome> + Send + 'static,
    {
        busy.set(true);
        debug!(?op, "config request issued");

        let events = self.events.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = match tokio::spawn(request).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    ConfigOutcome::aborted(op, ApiError::transport(format!("{op:?} task failed: {err}")))
                }
            };
            debug!(?op, elapsed_ms = started.elapsed().as_millis() as u64, "config request settled");
            let _ = events.send(AppEvent::Config(outcome));
        });
    }

    /// Applies a completed request. Lowers the busy indicator first, whatever
    /// the outcome.
    pub fn settle(
        &self,
        outcome: ConfigOutcome,
        form: &mut SettingsForm,
        busy: &mut BusyIndicator,
        notifier: &mut Notifier,
    ) {
        busy.set(false);

        match outcome {
            ConfigOutcome::Loaded(Ok(Some(remote))) => {
                form.api_url
                    .set(non_blank(remote.api_url).unwrap_or_else(|| self.defaults.api_url.clone()));
                form.model_name.set(
                    non_blank(remote.model_name).unwrap_or_else(|| self.defaults.model_name.clone()),
                );
                if remote.has_api_key {
                    form.key_hint = Some(KEY_CONFIGURED_HINT.to_string());
                }
                info!(has_api_key = remote.has_api_key, "configuration loaded");
            }
            ConfigOutcome::Loaded(Ok(None)) => {
                form.apply_defaults(&self.defaults);
                info!("relay has no configuration, using defaults");
            }
            ConfigOutcome::Loaded(Err(err)) => {
                form.apply_defaults(&self.defaults);
                if err.is_transport() {
                    warn!(%err, "loading configuration failed");
                    notifier.emit(LOAD_FAILED, Severity::Error);
                } else {
                    info!(%err, "relay declined to return configuration, using defaults");
                }
            }
            ConfigOutcome::Saved(Ok(message)) => {
                info!("configuration saved");
                notifier.emit(message.unwrap_or_else(|| SAVE_OK.to_string()), Severity::Success);
                form.close();
            }
            ConfigOutcome::Saved(Err(err)) => {
                warn!(%err, "saving configuration failed");
                notifier.emit(failure_text(&err, SAVE_REJECTED, SAVE_TRANSPORT), Severity::Error);
            }
            ConfigOutcome::Tested(Ok(message)) => {
                info!("configuration test passed");
                notifier.emit(message.unwrap_or_else(|| TEST_OK.to_string()), Severity::Success);
            }
            ConfigOutcome::Tested(Err(err)) => {
                warn!(%err, "configuration test failed");
                notifier.emit(failure_text(&err, TEST_REJECTED, TEST_TRANSPORT), Severity::Error);
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn failure_text(err: &ApiError, rejected: &str, transport: &str) -> String {
    match err {
        ApiError::Transport(_) => transport.to_string(),
        ApiError::Rejected { .. } => err.reason().unwrap_or(rejected).to_string(),
    }
}
