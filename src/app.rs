use ratatui::layout::Rect;
use dost::{ChatController, Entry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub controller: ChatController,
    pub endpoint: String,

    // Input line
    pub input_cursor: usize, // cursor position in chars

    // Transcript viewport
    pub transcript_scroll: u16,
    pub transcript_height: u16, // Inner height, updated during render
    pub transcript_width: u16,  // Inner width, for wrap calculations
    pub transcript_area: Option<Rect>,

    // Settings popup
    pub show_settings: bool,
    pub settings_cursor: usize,

    // One-line feedback in the footer
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing dots
}

impl App {
    pub fn new(controller: ChatController, endpoint: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            controller,
            endpoint,
            input_cursor: 0,
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            transcript_area: None,
            show_settings: false,
            settings_cursor: 0,
            status: None,
            animation_frame: 0,
        }
    }

    /// Tick animation frame and pick up a finished reply
    pub async fn tick(&mut self) {
        if self.controller.is_awaiting_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.controller.poll_reply().await;
    }

    pub fn send_input(&mut self) {
        if self.controller.is_awaiting_reply() && !self.controller.input().trim().is_empty() {
            self.status = Some("Still waiting for the last reply...".to_string());
            return;
        }
        if self.controller.dispatch(None) {
            self.input_cursor = 0;
            self.status = None;
        }
    }

    pub fn send_preset(&mut self, index: usize) {
        if self.controller.is_awaiting_reply() {
            self.status = Some("Still waiting for the last reply...".to_string());
            return;
        }
        if self.controller.dispatch_preset(index) {
            self.input_cursor = 0;
            self.status = None;
        }
    }

    pub fn open_settings(&mut self) {
        if let Some(field) = self.controller.location_field() {
            self.settings_cursor = field.chars().count();
            self.show_settings = true;
        }
    }

    pub fn save_settings(&mut self) {
        match self.controller.save_settings() {
            Ok(()) => {
                self.status = Some(match self.controller.stored_location() {
                    Some(location) => format!("Location set to {}", location),
                    None => "Location cleared".to_string(),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save settings");
                self.status = Some("Could not save settings".to_string());
            }
        }
        self.show_settings = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    /// Scroll so the newest entry is visible, if the transcript asked for it
    pub fn follow_transcript(&mut self) {
        if self.controller.transcript_mut().take_autoscroll() {
            self.scroll_transcript_to_bottom();
        }
    }

    pub fn scroll_transcript_to_bottom(&mut self) {
        let total_lines = self.transcript_line_count();
        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };

        self.transcript_scroll = total_lines.saturating_sub(visible_height);
    }

    /// Must agree with the layout in `ui::render_transcript`
    fn transcript_line_count(&self) -> u16 {
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for entry in self.controller.transcript().entries() {
            // Sender line ("You:" or "Dost:") plus the blank line after the entry
            total_lines = total_lines.saturating_add(2);
            match entry {
                Entry::Message(msg) => {
                    for line in msg.text.lines() {
                        total_lines =
                            total_lines.saturating_add(wrapped_line_count(line, wrap_width));
                    }
                }
                Entry::Typing(_) => total_lines = total_lines.saturating_add(1),
            }
        }
        total_lines.min(u16::MAX as usize) as u16
    }
}

/// Rows a line takes when word-wrapped to `width`, as `Wrap { trim: true }` lays it out
fn wrapped_line_count(line: &str, width: usize) -> usize {
    let width = width.max(1);
    let mut lines = 1;
    let mut used = 0;

    for word in line.split_whitespace() {
        let mut len = word.chars().count();
        let needed = if used == 0 { len } else { used + 1 + len };
        if needed <= width {
            used = needed;
            continue;
        }

        if used > 0 {
            lines += 1;
        }
        // Words wider than the pane are broken across rows
        while len > width {
            lines += 1;
            len -= width;
        }
        used = len;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use dost::{MemoryStore, Widgets};
    use dost::backend::{AskRequest, AskResponse, BackendError, ChatBackend};
    use std::sync::Arc;

    struct Echo;

    #[async_trait::async_trait]
    impl ChatBackend for Echo {
        async fn ask(&self, request: &AskRequest) -> Result<AskResponse, BackendError> {
            Ok(AskResponse::text(&request.message))
        }
    }

    fn app() -> App {
        let controller = ChatController::new(
            Arc::new(Echo),
            Box::new(MemoryStore::new()),
            Widgets::all(vec!["\"I feel anxious\"".to_string()]),
        );
        App::new(controller, "http://test".to_string())
    }

    #[tokio::test]
    async fn test_send_input_resets_cursor_and_replies_on_tick() {
        let mut app = app();
        app.controller.input_mut().push_str("hello");
        app.input_cursor = 5;

        app.send_input();
        assert_eq!(app.input_cursor, 0);
        assert!(app.controller.is_awaiting_reply());

        while app.controller.is_awaiting_reply() {
            tokio::task::yield_now().await;
            app.tick().await;
        }
        assert_eq!(app.controller.transcript().messages().count(), 2);
    }

    #[tokio::test]
    async fn test_second_send_while_waiting_sets_status() {
        let mut app = app();
        app.controller.input_mut().push_str("one");
        app.send_input();
        app.controller.input_mut().push_str("two");
        app.send_input();

        assert_eq!(app.controller.input(), "two");
        assert!(app.status.is_some());
    }

    #[test]
    fn test_save_settings_reports_outcome() {
        let mut app = app();
        app.open_settings();
        assert!(app.show_settings);
        if let Some(field) = app.controller.location_field_mut() {
            field.push_str(" Mumbai ");
        }
        app.save_settings();

        assert!(!app.show_settings);
        assert_eq!(app.status.as_deref(), Some("Location set to Mumbai"));
    }

    #[test]
    fn test_very_long_reply_clamps_scroll() {
        let mut app = app();
        app.transcript_height = 4;
        app.transcript_width = 40;
        app.controller
            .append_message(&"line\n".repeat(70_000), dost::Sender::Bot);
        app.follow_transcript();
        assert_eq!(app.transcript_scroll, u16::MAX - 4);
    }

    #[test]
    fn test_wrapped_line_count_breaks_on_words() {
        assert_eq!(wrapped_line_count("", 10), 1);
        assert_eq!(wrapped_line_count("hi there", 10), 1);
        // 20 chars, but no two words fit on one row together
        assert_eq!(wrapped_line_count("aaaaaa bbbbbb cccccc", 10), 3);
        assert_eq!(wrapped_line_count("aaaa bbbbb cc", 10), 2);
        assert_eq!(wrapped_line_count(&"x".repeat(25), 10), 3);
    }

    #[test]
    fn test_scroll_to_bottom_uses_viewport_height() {
        let mut app = app();
        app.transcript_height = 4;
        app.transcript_width = 40;
        for i in 0..5 {
            app.controller
                .append_message(&format!("message {}", i), dost::Sender::User);
        }
        app.follow_transcript();
        // 5 entries of 3 lines each, 4 visible
        assert_eq!(app.transcript_scroll, 11);
    }
}
