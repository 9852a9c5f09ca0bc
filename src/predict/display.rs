//! Display collaborators for prediction results.

use crate::classifier::Digit;
use crate::predict::volume::Volume;
use crate::SLOT_COUNT;

/// Shown in a slot before it has a prediction.
pub const SLOT_PLACEHOLDER: &str = "-";

/// Receives prediction results and failure notifications.
pub trait PredictionView {
    /// Shows a slot's digit, or the placeholder for `None`.
    fn show_digit(&mut self, slot: usize, digit: Option<Digit>);
    /// Updates the aggregate text, the fill indicator and the playback gain.
    fn show_volume(&mut self, volume: Volume);
    /// Blocking user notification.
    fn alert(&mut self, message: &str);
}

/// In-memory result panel.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelState {
    /// Per-slot text: a digit or the placeholder
    pub slot_text: [String; SLOT_COUNT],
    /// Aggregate value, zero-padded to 3 characters
    pub volume_text: String,
    /// Fill indicator height (0-100)
    pub fill_percent: u16,
    /// Audio output gain (0.0-1.0)
    pub gain: f32,
    /// Alerts raised so far, oldest first
    pub alerts: Vec<String>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            slot_text: std::array::from_fn(|_| SLOT_PLACEHOLDER.to_string()),
            volume_text: Volume::ZERO.display_text(),
            fill_percent: 0,
            gain: 0.0,
            alerts: Vec::new(),
        }
    }
}

impl PanelState {
    /// Restores placeholders and silence. Past alerts are kept.
    pub fn reset(&mut self) {
        let alerts = std::mem::take(&mut self.alerts);
        *self = Self {
            alerts,
            ..Self::default()
        };
    }

    /// One-line summary, e.g. `[2 5 3] volume 100 (gain 1.00)`.
    pub fn summary(&self) -> String {
        format!(
            "[{}] volume {} (gain {:.2})",
            self.slot_text.join(" "),
            self.volume_text,
            self.gain
        )
    }
}

impl PredictionView for PanelState {
    fn show_digit(&mut self, slot: usize, digit: Option<Digit>) {
        if let Some(text) = self.slot_text.get_mut(slot) {
            *text = match digit {
                Some(d) => d.to_string(),
                None => SLOT_PLACEHOLDER.to_string(),
            };
        }
    }

    fn show_volume(&mut self, volume: Volume) {
        self.volume_text = volume.display_text();
        self.fill_percent = volume.fill_percent();
        self.gain = volume.gain();
    }

    fn alert(&mut self, message: &str) {
        crate::log(&format!("Alert: {}", message));
        self.alerts.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_panel() {
        let panel = PanelState::default();
        assert_eq!(panel.slot_text, ["-", "-", "-"]);
        assert_eq!(panel.volume_text, "000");
        assert_eq!(panel.fill_percent, 0);
        assert_eq!(panel.gain, 0.0);
    }

    #[test]
    fn test_show_and_reset() {
        let mut panel = PanelState::default();
        let seven = Digit::new(7).unwrap();
        panel.show_digit(2, Some(seven));
        panel.show_volume(Volume::from_digits([Digit::new(0).unwrap(), Digit::new(0).unwrap(), seven]));
        panel.alert("something");

        assert_eq!(panel.slot_text, ["-", "-", "7"]);
        assert_eq!(panel.volume_text, "007");
        assert_eq!(panel.fill_percent, 7);
        assert_eq!(panel.summary(), "[- - 7] volume 007 (gain 0.07)");

        panel.reset();
        assert_eq!(panel.slot_text, ["-", "-", "-"]);
        assert_eq!(panel.volume_text, "000");
        assert_eq!(panel.gain, 0.0);
        assert_eq!(panel.alerts, vec!["something".to_string()]);
    }

    #[test]
    fn test_out_of_range_slot_is_ignored() {
        let mut panel = PanelState::default();
        panel.show_digit(5, Digit::new(1));
        assert_eq!(panel, PanelState::default());
    }
}
