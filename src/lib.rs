pub mod api;
pub mod app;
pub mod busy;
pub mod chat;
pub mod config;
pub mod countdown;
pub mod error;
pub mod handler;
pub mod input;
pub mod logging;
pub mod notify;
pub mod settings;
pub mod transcript;
pub mod tui;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use api::{ChatApi, HttpBackend, RemoteConfig};
pub use app::App;
pub use config::ClientConfig;
pub use error::{ApiError, ValidationError};
pub use transcript::{Author, Message, MessageId, Transcript};
