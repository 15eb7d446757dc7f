use std::sync::Arc;

use anyhow::Result;

use lantern_chat::tui::{self, EventHandler, Tui};
use lantern_chat::{handler, logging, ui, App, ClientConfig, HttpBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = ClientConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_else(|_| ClientConfig::new());

    let log_path = logging::init(&config)?;
    if let Err(err) = &loaded {
        tracing::warn!(error = %err, "could not read client config, using defaults");
    }

    let server_url = config.server_url();
    tracing::info!(%server_url, log = %log_path.display(), "starting");
    let api = Arc::new(HttpBackend::new(&server_url));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(api, events.sender(), &config);
    app.start();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    tracing::info!("exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
