//! The chat controller.
//!
//! Owns everything the chat screen shows (transcript, input line, preset
//! panel, mood gauge, crisis dialog, settings field, consent toggle) and the
//! one request that may be in flight. The terminal UI renders this state and
//! routes key presses to the methods here; nothing else mutates it.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::backend::{AskRequest, AskResponse, BackendError, ChatBackend};
use crate::mood::MoodGauge;
use crate::state::{Sender, Transcript, TypingId};
use crate::storage::{save_location, PreferenceStore, LOCATION_KEY};

/// Shown in place of a reply whenever the backend cannot be reached.
pub const FALLBACK_REPLY: &str =
    "I seem to be having trouble connecting. Please try again in a moment.";

/// Which optional elements exist on the chat screen.
#[derive(Debug, Clone, Default)]
pub struct Widgets {
    /// Labels of the preset prompt buttons; `None` means no preset panel
    pub preset_prompts: Option<Vec<String>>,
    pub consent_toggle: bool,
    pub settings: bool,
    pub mood_gauge: bool,
}

impl Widgets {
    pub fn all(preset_prompts: Vec<String>) -> Self {
        Self {
            preset_prompts: Some(preset_prompts),
            consent_toggle: true,
            settings: true,
            mood_gauge: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetPanel {
    prompts: Vec<String>,
    visible: bool,
}

impl PresetPanel {
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrisisAlert {
    pub helpline: Option<String>,
}

/// A send that has been rendered but not yet answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub indicator: TypingId,
    pub request: AskRequest,
}

struct InFlight {
    indicator: TypingId,
    task: JoinHandle<Result<AskResponse, BackendError>>,
}

pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    store: Box<dyn PreferenceStore>,
    transcript: Transcript,
    input: String,
    presets: Option<PresetPanel>,
    consent: Option<bool>,
    location_field: Option<String>,
    mood_gauge: Option<MoodGauge>,
    crisis: Option<CrisisAlert>,
    awaiting: Option<TypingId>,
    in_flight: Option<InFlight>,
}

impl ChatController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Box<dyn PreferenceStore>,
        widgets: Widgets,
    ) -> Self {
        // Prefill the settings field from whatever was saved last time
        let location_field = widgets
            .settings
            .then(|| store.get(LOCATION_KEY).unwrap_or_default());

        Self {
            backend,
            store,
            transcript: Transcript::new(),
            input: String::new(),
            presets: widgets.preset_prompts.map(|prompts| PresetPanel {
                prompts,
                visible: true,
            }),
            consent: widgets.consent_toggle.then_some(false),
            location_field,
            mood_gauge: widgets.mood_gauge.then(MoodGauge::new),
            crisis: None,
            awaiting: None,
            in_flight: None,
        }
    }

    // Accessors used by the renderer

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn presets(&self) -> Option<&PresetPanel> {
        self.presets.as_ref()
    }

    pub fn consent(&self) -> Option<bool> {
        self.consent
    }

    pub fn location_field(&self) -> Option<&str> {
        self.location_field.as_deref()
    }

    pub fn location_field_mut(&mut self) -> Option<&mut String> {
        self.location_field.as_mut()
    }

    pub fn mood_gauge(&self) -> Option<&MoodGauge> {
        self.mood_gauge.as_ref()
    }

    pub fn crisis(&self) -> Option<&CrisisAlert> {
        self.crisis.as_ref()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting.is_some()
    }

    pub fn stored_location(&self) -> Option<String> {
        self.store.get(LOCATION_KEY)
    }

    // Rendering primitives

    pub fn append_message(&mut self, text: &str, sender: Sender) {
        self.transcript.push_message(text, sender);
    }

    pub fn append_typing_indicator(&mut self) -> TypingId {
        self.transcript.push_typing()
    }

    pub fn remove_typing_indicator(&mut self, id: TypingId) {
        self.transcript.remove_typing(id);
    }

    pub fn update_mood_tracker(&mut self, mood: &str) {
        if let Some(gauge) = self.mood_gauge.as_mut() {
            if !gauge.apply(mood) {
                tracing::debug!(mood, "Ignoring unrecognized mood label");
            }
        }
    }

    // Sending

    /// Renders the user's turn and builds the request for it.
    ///
    /// Literal text is sent as given. An empty literal falls back to the
    /// trimmed input field. Returns `None` without touching any state when
    /// the message is blank or another reply is still pending.
    pub fn begin_send(&mut self, text: Option<&str>) -> Option<PendingSend> {
        let message = match text {
            Some(literal) if !literal.is_empty() => literal.to_string(),
            _ => self.input.trim().to_string(),
        };
        if message.trim().is_empty() {
            return None;
        }
        if self.awaiting.is_some() {
            tracing::debug!("Send rejected: a reply is still pending");
            return None;
        }

        self.append_message(&message, Sender::User);
        self.input.clear();
        if let Some(panel) = self.presets.as_mut() {
            panel.visible = false;
        }
        let indicator = self.append_typing_indicator();
        self.awaiting = Some(indicator);

        let request = AskRequest {
            message,
            location: self.store.get(LOCATION_KEY),
            consent: self.consent.unwrap_or(false),
        };
        tracing::info!(
            chars = request.message.chars().count(),
            has_location = request.location.is_some(),
            consent = request.consent,
            "Sending message"
        );

        Some(PendingSend { indicator, request })
    }

    /// Renders the outcome of a send started with [`Self::begin_send`].
    pub fn finish_send(&mut self, indicator: TypingId, result: Result<AskResponse, BackendError>) {
        self.remove_typing_indicator(indicator);
        if self.awaiting == Some(indicator) {
            self.awaiting = None;
        }

        match result {
            Ok(reply) => {
                self.append_message(&reply.response, Sender::Bot);

                if let Some(mood) = reply.mood.as_deref() {
                    self.update_mood_tracker(mood);
                }

                if reply.is_crisis.unwrap_or(false) {
                    tracing::warn!("Backend flagged the conversation as a crisis");
                    self.crisis = Some(CrisisAlert {
                        helpline: reply.helpline,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat request failed");
                self.append_message(FALLBACK_REPLY, Sender::Bot);
            }
        }
    }

    /// Sends and waits for the reply in place.
    pub async fn send_message(&mut self, text: Option<&str>) {
        let Some(pending) = self.begin_send(text) else {
            return;
        };

        let result = self.backend.ask(&pending.request).await;
        self.finish_send(pending.indicator, result);
    }

    /// Sends on a background task; the reply is picked up by [`Self::poll_reply`].
    pub fn dispatch(&mut self, text: Option<&str>) -> bool {
        let Some(pending) = self.begin_send(text) else {
            return false;
        };

        let backend = Arc::clone(&self.backend);
        let request = pending.request;
        let task = tokio::spawn(async move { backend.ask(&request).await });
        self.in_flight = Some(InFlight {
            indicator: pending.indicator,
            task,
        });
        true
    }

    /// Completes the background send if its task has finished.
    pub async fn poll_reply(&mut self) -> bool {
        let finished = self
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.task.is_finished());
        if !finished {
            return false;
        }

        let Some(flight) = self.in_flight.take() else {
            return false;
        };

        let result = match flight.task.await {
            Ok(result) => result,
            Err(e) => Err(BackendError::Aborted(e.to_string())),
        };
        self.finish_send(flight.indicator, result);
        true
    }

    /// Clicks the preset button at `index`.
    pub async fn click_preset(&mut self, index: usize) {
        if let Some(text) = self.preset_text(index) {
            self.send_message(Some(&text)).await;
        }
    }

    /// Background variant of [`Self::click_preset`] for the event loop.
    pub fn dispatch_preset(&mut self, index: usize) -> bool {
        match self.preset_text(index) {
            Some(text) => self.dispatch(Some(&text)),
            None => false,
        }
    }

    fn preset_text(&self, index: usize) -> Option<String> {
        self.presets
            .as_ref()
            .filter(|panel| panel.visible)
            .and_then(|panel| panel.prompts.get(index))
            .map(|label| label.replace('"', ""))
    }

    // Ancillary UI

    pub fn dismiss_crisis(&mut self) {
        self.crisis = None;
    }

    pub fn toggle_consent(&mut self) {
        if let Some(consent) = self.consent.as_mut() {
            *consent = !*consent;
        }
    }

    /// Stores the trimmed location field, or clears the preference when it is empty.
    pub fn save_settings(&mut self) -> Result<()> {
        let Some(field) = self.location_field.as_mut() else {
            return Ok(());
        };

        let saved = save_location(self.store.as_mut(), field)?;
        *field = saved.unwrap_or_default();
        Ok(())
    }
}
