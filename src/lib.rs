pub mod backend;
pub mod config;
pub mod controller;
pub mod mood;
pub mod state;
pub mod storage;

// Re-export main types for convenience
pub use backend::{AskRequest, AskResponse, BackendError, ChatBackend, HttpBackend};
pub use config::Config;
pub use controller::{ChatController, CrisisAlert, PendingSend, PresetPanel, Widgets, FALLBACK_REPLY};
pub use mood::{Mood, MoodGauge, MoodTier};
pub use state::{Entry, Message, Sender, Transcript, TypingId};
pub use storage::{save_location, JsonFileStore, MemoryStore, PreferenceStore, LOCATION_KEY};
