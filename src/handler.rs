use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Shared line editing for the chat input and the location field.
/// Returns false if the key is not an editing key.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        _ => return false,
    }
    true
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick().await,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // The crisis dialog is modal
    if app.controller.crisis().is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            app.controller.dismiss_crisis();
        }
        return;
    }

    if app.show_settings {
        handle_settings(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_settings = false,
        KeyCode::Enter => app.save_settings(),
        _ => {
            if let Some(field) = app.controller.location_field_mut() {
                edit_line(field, &mut app.settings_cursor, key);
            }
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.controller.input().chars().count();
        }

        // Preset prompts are numbered from 1
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            app.send_preset(index);
        }

        KeyCode::Char('s') => app.open_settings(),
        KeyCode::Char('c') => app.controller.toggle_consent(),

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.transcript_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.transcript_height / 2);
        }
        KeyCode::Char('g') => app.transcript_scroll = 0,
        KeyCode::Char('G') => app.scroll_transcript_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.send_input(),
        KeyCode::Tab => app.input_mode = InputMode::Normal,
        _ => {
            edit_line(app.controller.input_mut(), &mut app.input_cursor, key);
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_transcript = app.transcript_area.is_some_and(|area| {
        mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height
    });
    if !in_transcript {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dost::backend::{AskRequest, AskResponse, BackendError, ChatBackend};
    use dost::{ChatController, MemoryStore, Widgets};
    use std::sync::Arc;

    struct Crisis;

    #[async_trait::async_trait]
    impl ChatBackend for Crisis {
        async fn ask(&self, _request: &AskRequest) -> Result<AskResponse, BackendError> {
            Ok(AskResponse {
                response: "Please talk to someone.".to_string(),
                mood: Some("sad".to_string()),
                is_crisis: Some(true),
                helpline: Some("Tele-MANAS: 14416".to_string()),
            })
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        let controller = ChatController::new(
            Arc::new(Crisis),
            Box::new(MemoryStore::new()),
            Widgets::all(vec!["\"I feel anxious\"".to_string()]),
        );
        App::new(controller, "http://test".to_string())
    }

    async fn settle(app: &mut App) {
        while app.controller.is_awaiting_reply() {
            tokio::task::yield_now().await;
            handle_event(app, AppEvent::Tick).await.unwrap();
        }
    }

    #[test]
    fn test_edit_line_handles_multibyte_chars() {
        let mut text = "héllo".to_string();
        let mut cursor = 2;
        edit_line(&mut text, &mut cursor, key(KeyCode::Backspace));
        assert_eq!(text, "hllo");
        edit_line(&mut text, &mut cursor, key(KeyCode::Char('é')));
        assert_eq!(text, "héllo");
        assert_eq!(cursor, 2);
    }

    #[tokio::test]
    async fn test_typing_and_enter_sends() {
        let mut app = app();
        for c in "hi".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Enter));
        settle(&mut app).await;

        let first = app.controller.transcript().messages().next().unwrap();
        assert_eq!(first.text, "hi");
        assert!(app.controller.crisis().is_some());
    }

    #[tokio::test]
    async fn test_crisis_dialog_swallows_keys_until_dismissed() {
        let mut app = app();
        app.input_mode = InputMode::Normal;
        handle_key(&mut app, key(KeyCode::Char('1')));
        settle(&mut app).await;
        assert!(app.controller.crisis().is_some());

        handle_key(&mut app, key(KeyCode::Char('q')));
        assert!(!app.should_quit);

        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.controller.crisis().is_none());
        handle_key(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_preset_key_sends_preset() {
        let mut app = app();
        app.input_mode = InputMode::Normal;
        handle_key(&mut app, key(KeyCode::Char('1')));

        let first = app.controller.transcript().messages().next().unwrap();
        assert_eq!(first.text, "I feel anxious");
        assert!(!app.controller.presets().unwrap().is_visible());
        settle(&mut app).await;
    }

    #[test]
    fn test_settings_popup_edits_and_saves_location() {
        let mut app = app();
        app.input_mode = InputMode::Normal;
        handle_key(&mut app, key(KeyCode::Char('s')));
        assert!(app.show_settings);

        for c in "  Paris  ".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Enter));

        assert!(!app.show_settings);
        assert_eq!(app.controller.stored_location(), Some("Paris".to_string()));
    }

    #[test]
    fn test_consent_toggle_key() {
        let mut app = app();
        app.input_mode = InputMode::Normal;
        assert_eq!(app.controller.consent(), Some(false));
        handle_key(&mut app, key(KeyCode::Char('c')));
        assert_eq!(app.controller.consent(), Some(true));
    }
}
