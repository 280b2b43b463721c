use serde::{Deserialize, Serialize};
use std::fmt;

use crate::retention::{due_date, MIN_STABILITY, STABILITY_CEILING};

// Defaults for freshly created records
pub const INITIAL_RECOGNITION_STABILITY: f64 = 0.75;
pub const INITIAL_CHUNKING_STABILITY: f64 = 0.60;
pub const INITIAL_COMPOSING_STABILITY: f64 = 0.50;
pub const INITIAL_ACCURACY: f64 = 0.5;

/// Skill mode an item can be practised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Recognition,
    Chunking,
    Composing,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Recognition, Mode::Chunking, Mode::Composing];

    /// Next mode up, `None` at the top.
    pub fn next(self) -> Option<Mode> {
        match self {
            Mode::Recognition => Some(Mode::Chunking),
            Mode::Chunking => Some(Mode::Composing),
            Mode::Composing => None,
        }
    }

    /// One mode down, saturating at Recognition.
    pub fn lower(self) -> Mode {
        match self {
            Mode::Recognition => Mode::Recognition,
            Mode::Chunking => Mode::Recognition,
            Mode::Composing => Mode::Chunking,
        }
    }

    pub fn initial_stability(self) -> f64 {
        match self {
            Mode::Recognition => INITIAL_RECOGNITION_STABILITY,
            Mode::Chunking => INITIAL_CHUNKING_STABILITY,
            Mode::Composing => INITIAL_COMPOSING_STABILITY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Recognition => "recognition",
            Mode::Chunking => "chunking",
            Mode::Composing => "composing",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-mode memory state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeState {
    /// Stability in days
    #[serde(default)]
    pub stability: f64,
    /// Last presentation (ms)
    #[serde(default)]
    pub last_seen: i64,
    /// Due timestamp (ms)
    #[serde(default)]
    pub due: i64,
    /// Accuracy EWMA [0, 1]
    #[serde(default = "default_accuracy")]
    pub q: f64,
    #[serde(default)]
    pub streak: u32,
    /// Presentations in this mode
    #[serde(default)]
    pub n: u32,
}

fn default_accuracy() -> f64 {
    INITIAL_ACCURACY
}

impl ModeState {
    pub fn new(stability: f64, now: i64) -> Self {
        Self {
            stability,
            last_seen: now,
            due: now,
            q: INITIAL_ACCURACY,
            streak: 0,
            n: 0,
        }
    }

    /// Repair invalid numeric fields in place. Returns true if anything changed.
    pub fn normalize(&mut self, now: i64) -> bool {
        let mut repaired = false;
        if !(self.stability > 0.0 && self.stability.is_finite()) {
            self.stability = MIN_STABILITY;
            repaired = true;
        } else if self.stability < MIN_STABILITY {
            self.stability = MIN_STABILITY;
            repaired = true;
        } else if self.stability > STABILITY_CEILING {
            self.stability = STABILITY_CEILING;
            repaired = true;
        }
        if self.last_seen <= 0 {
            self.last_seen = now;
            repaired = true;
        }
        if self.due <= 0 {
            self.due = due_date(now, self.stability);
            repaired = true;
        }
        if !self.q.is_finite() {
            self.q = INITIAL_ACCURACY;
            repaired = true;
        } else if !(0.0..=1.0).contains(&self.q) {
            self.q = self.q.clamp(0.0, 1.0);
            repaired = true;
        }
        repaired
    }
}

/// Stored statistics for one learnable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStats {
    pub id: String,
    pub stage: Mode,
    pub introduced: bool,
    pub recognition: ModeState,
    pub chunking: ModeState,
    pub composing: ModeState,
}

impl ItemStats {
    /// Default record for a never-seen item.
    pub fn new(id: impl Into<String>, now: i64) -> Self {
        Self {
            id: id.into(),
            stage: Mode::Recognition,
            introduced: false,
            recognition: ModeState::new(Mode::Recognition.initial_stability(), now),
            chunking: ModeState::new(Mode::Chunking.initial_stability(), now),
            composing: ModeState::new(Mode::Composing.initial_stability(), now),
        }
    }

    pub fn mode(&self, mode: Mode) -> &ModeState {
        match mode {
            Mode::Recognition => &self.recognition,
            Mode::Chunking => &self.chunking,
            Mode::Composing => &self.composing,
        }
    }

    pub fn mode_mut(&mut self, mode: Mode) -> &mut ModeState {
        match mode {
            Mode::Recognition => &mut self.recognition,
            Mode::Chunking => &mut self.chunking,
            Mode::Composing => &mut self.composing,
        }
    }

    /// State of the currently active mode.
    pub fn active(&self) -> &ModeState {
        self.mode(self.stage)
    }

    /// Repair all mode states. Returns true if any field was rewritten.
    pub fn normalize(&mut self, now: i64) -> bool {
        let mut repaired = false;
        for mode in Mode::ALL {
            repaired |= self.mode_mut(mode).normalize(now);
        }
        repaired
    }
}

/// What to present next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub item_id: String,
    pub mode: Mode,
}

impl Presentation {
    pub fn new(item_id: impl Into<String>, mode: Mode) -> Self {
        Self {
            item_id: item_id.into(),
            mode,
        }
    }
}

/// Library-wide progress snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub coverage: f64,
    /// Items currently due
    pub debt: usize,
    /// Items inside the nearly-due band
    pub nearly_debt: usize,
    pub total_introduced: usize,
    pub total_items: usize,
}
