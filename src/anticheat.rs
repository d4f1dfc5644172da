//! Focus-loss detection.
//!
//! Hiding the app while a question is live costs a lifeline; the monitor
//! edge-detects the raw visibility reports so one excursion is charged
//! exactly once, however often the platform repeats the current state.

/// Raw visibility of the participant's screen, as reported by the host
/// platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// App is on screen.
    Visible,
    /// App is backgrounded, minimized, or the tab is hidden.
    Hidden,
}

/// A visibility edge the engine must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusBreach {
    /// Screen just went hidden during a live question; charge the penalty.
    Away,
    /// Screen came back after a charged excursion; surface the warning.
    Returned,
}

/// Warning shown when the participant comes back from a charged excursion.
pub const BREACH_WARNING: &str =
    "⚠️ SYSTEM BREACH DETECTED: You left the secure terminal! Lifeline Lost.";

/// Edge detector over visibility reports.
///
/// `armed` is whether a question is currently live; hiding at any other
/// time (hint screen, login, finish) is free.
#[derive(Debug, Clone)]
pub struct FocusMonitor {
    visibility: Visibility,
    charged: bool,
}

impl Default for FocusMonitor {
    fn default() -> Self {
        Self {
            visibility: Visibility::Visible,
            charged: false,
        }
    }
}

impl FocusMonitor {
    /// Feed one visibility report; returns the breach to act on, if any.
    pub fn observe(&mut self, visibility: Visibility, armed: bool) -> Option<FocusBreach> {
        if visibility == self.visibility {
            return None;
        }
        self.visibility = visibility;
        match visibility {
            Visibility::Hidden if armed => {
                self.charged = true;
                Some(FocusBreach::Away)
            }
            Visibility::Hidden => None,
            Visibility::Visible => {
                let was_charged = std::mem::take(&mut self.charged);
                (was_charged && armed).then_some(FocusBreach::Returned)
            }
        }
    }

    /// Forget any in-flight excursion, e.g. on full reset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
