use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::input::TextField;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Chat(reply) => app.on_chat_reply(reply),
        AppEvent::Config(outcome) => app.on_config_outcome(outcome),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.settings.open {
        handle_settings_key(app, key);
    } else {
        handle_chat_key(app, key);
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        // Plain Enter sends; Shift/Alt+Enter breaks the line
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.input.insert('\n');
        }
        KeyCode::Enter => app.send_message(),

        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.open_settings();
        }

        // Transcript scrolling
        KeyCode::PageUp => app.scroll_up(app.transcript_height.max(1) / 2),
        KeyCode::PageDown => app.scroll_down(app.transcript_height.max(1) / 2),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),

        _ => edit_field(&mut app.input, key),
    }
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    // The busy overlay blocks the form until the request settles
    if app.busy.is_active() {
        if key.code == KeyCode::Esc {
            app.close_settings();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.close_settings(),
        KeyCode::Tab | KeyCode::Down => app.settings.focus = app.settings.focus.next(),
        KeyCode::BackTab | KeyCode::Up => app.settings.focus = app.settings.focus.prev(),
        KeyCode::Enter => app.save_settings(),
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.test_settings();
        }
        _ => edit_field(app.settings.focused_mut(), key),
    }
}

/// Single-line editing keys shared by the message box and settings fields.
fn edit_field(field: &mut TextField, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Home => field.move_home(),
        KeyCode::End => field.move_end(),
        KeyCode::Char(c)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            field.insert(c);
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_transcript = app
        .transcript_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_transcript {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
