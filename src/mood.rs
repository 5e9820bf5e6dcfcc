//! Mood labels reported by the backend and the gauge they drive.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Happy,
    Positive,
    Upset,
    Neutral,
    Anxious,
    Sad,
    Angry,
    Negative,
}

/// One of the three exclusive visual states of the gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodTier {
    Positive,
    Caution,
    Negative,
}

impl Mood {
    /// Case-insensitive lookup. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "happy" => Some(Mood::Happy),
            "positive" => Some(Mood::Positive),
            "upset" => Some(Mood::Upset),
            "neutral" => Some(Mood::Neutral),
            "anxious" => Some(Mood::Anxious),
            "sad" => Some(Mood::Sad),
            "angry" => Some(Mood::Angry),
            "negative" => Some(Mood::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Positive => "positive",
            Mood::Upset => "upset",
            Mood::Neutral => "neutral",
            Mood::Anxious => "anxious",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Negative => "negative",
        }
    }

    pub fn tier(&self) -> MoodTier {
        match self {
            Mood::Happy | Mood::Positive => MoodTier::Positive,
            Mood::Upset | Mood::Neutral | Mood::Anxious => MoodTier::Caution,
            Mood::Sad | Mood::Angry | Mood::Negative => MoodTier::Negative,
        }
    }
}

impl MoodTier {
    pub fn all() -> [MoodTier; 3] {
        [MoodTier::Positive, MoodTier::Caution, MoodTier::Negative]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MoodTier::Positive => "Positive",
            MoodTier::Caution => "Caution",
            MoodTier::Negative => "Low",
        }
    }

    /// Needle position on the gauge, from 0.0 (low) to 1.0 (positive)
    pub fn needle(&self) -> f64 {
        match self {
            MoodTier::Positive => 0.9,
            MoodTier::Caution => 0.5,
            MoodTier::Negative => 0.15,
        }
    }
}

/// Holds the latest tier only; there is no history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoodGauge {
    tier: Option<MoodTier>,
    last_mood: Option<Mood>,
}

impl MoodGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a label from the backend. Returns false and leaves the gauge
    /// untouched when the label is not recognized.
    pub fn apply(&mut self, label: &str) -> bool {
        match Mood::from_label(label) {
            Some(mood) => {
                self.tier = Some(mood.tier());
                self.last_mood = Some(mood);
                true
            }
            None => false,
        }
    }

    pub fn tier(&self) -> Option<MoodTier> {
        self.tier
    }

    pub fn last_mood(&self) -> Option<Mood> {
        self.last_mood
    }

    pub fn is_active(&self, tier: MoodTier) -> bool {
        self.tier == Some(tier)
    }
}
