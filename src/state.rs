//! UI-agnostic transcript types
//!
//! The transcript is what the chat pane draws: user and bot messages in the
//! order they happened, interleaved with typing indicators for replies that
//! are still on their way.

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

/// Identity of one typing indicator, so a reply only removes its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypingId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Message(Message),
    Typing(TypingId),
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    next_typing: u64,
    autoscroll: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_message(&mut self, text: impl Into<String>, sender: Sender) {
        self.entries.push(Entry::Message(Message {
            text: text.into(),
            sender,
        }));
        self.autoscroll = true;
    }

    pub fn push_typing(&mut self) -> TypingId {
        let id = TypingId(self.next_typing);
        self.next_typing += 1;
        self.entries.push(Entry::Typing(id));
        self.autoscroll = true;
        id
    }

    /// Returns false if no indicator with this id is present.
    pub fn remove_typing(&mut self, id: TypingId) -> bool {
        match self.entries.iter().position(|e| *e == Entry::Typing(id)) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Message(m) => Some(m),
            Entry::Typing(_) => None,
        })
    }

    pub fn typing_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Typing(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the pending "scroll to the end" request set by the last append.
    pub fn take_autoscroll(&mut self) -> bool {
        std::mem::take(&mut self.autoscroll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_typing_only_removes_matching_id() {
        let mut t = Transcript::new();
        let first = t.push_typing();
        t.push_message("hi", Sender::User);
        let second = t.push_typing();

        assert!(t.remove_typing(second));
        assert_eq!(t.typing_count(), 1);
        assert_eq!(t.entries()[0], Entry::Typing(first));
    }

    #[test]
    fn test_remove_missing_typing_is_noop() {
        let mut t = Transcript::new();
        let id = t.push_typing();
        assert!(t.remove_typing(id));
        assert!(!t.remove_typing(id));
        assert!(t.is_empty());
    }

    #[test]
    fn test_autoscroll_is_consumed_once() {
        let mut t = Transcript::new();
        assert!(!t.take_autoscroll());
        t.push_message("hello", Sender::Bot);
        assert!(t.take_autoscroll());
        assert!(!t.take_autoscroll());
    }
}
