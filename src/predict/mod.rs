//! Prediction orchestration.
//!
//! Runs the three ink surfaces through blank detection, preprocessing and
//! classification in slot order, then maps the digits to a volume.

pub mod display;
pub mod volume;

pub use display::{PanelState, PredictionView};
pub use volume::Volume;

use crate::classifier::{ClassifierAdapter, ClassifierError, Digit, Readiness};
use crate::ink::InkSurface;
use crate::preprocess::{preprocess, PreprocessConfig};
use crate::SLOT_COUNT;

/// Why a prediction did not complete. The messages are user-facing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    /// Model still loading (or never started)
    #[error("Model is not loaded yet.")]
    NotReady,
    /// Slot (0-based) with no ink; the message numbers boxes from 1
    #[error("Please draw a digit in box #{}.", .slot + 1)]
    EmptySlot { slot: usize },
    /// Model could not be loaded; prediction stays disabled
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    /// Classification failed partway; the detail is logged, not shown
    #[error("An error occurred during prediction.")]
    Inference(String),
}

impl From<ClassifierError> for PredictError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::NotReady => PredictError::NotReady,
            ClassifierError::LoadFailed(msg) => PredictError::ModelLoad(msg),
            other => PredictError::Inference(other.to_string()),
        }
    }
}

/// A completed prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub digits: [Digit; SLOT_COUNT],
    pub volume: Volume,
}

/// Predicts the three digits and pushes the results to `view`.
///
/// Nothing is classified unless the model is ready and every slot has ink;
/// the first blank slot is reported. Slots are then classified one at a time,
/// each digit shown as soon as it is known. On a classification failure the
/// remaining slots are skipped and digits already shown stay visible.
///
/// Every error is also raised as an alert on `view`.
pub fn run_prediction(
    surfaces: &[InkSurface; SLOT_COUNT],
    adapter: &ClassifierAdapter,
    config: &PreprocessConfig,
    view: &mut dyn PredictionView,
) -> Result<Prediction, PredictError> {
    let result = predict_slots(surfaces, adapter, config, view);
    if let Err(e) = &result {
        if let PredictError::Inference(detail) = e {
            crate::log(&format!("Error during inference: {}", detail));
        }
        view.alert(&e.to_string());
    }
    result
}

fn predict_slots(
    surfaces: &[InkSurface; SLOT_COUNT],
    adapter: &ClassifierAdapter,
    config: &PreprocessConfig,
    view: &mut dyn PredictionView,
) -> Result<Prediction, PredictError> {
    match adapter.readiness() {
        Readiness::Ready => {}
        Readiness::Unloaded | Readiness::Loading => return Err(PredictError::NotReady),
        Readiness::Failed(msg) => return Err(PredictError::ModelLoad(msg)),
    }

    if let Some(slot) = surfaces.iter().position(InkSurface::is_blank) {
        return Err(PredictError::EmptySlot { slot });
    }

    let mut digits = Vec::with_capacity(SLOT_COUNT);
    for (slot, surface) in surfaces.iter().enumerate() {
        let tensor = preprocess(surface, config);
        let scores = adapter.classify(&tensor)?;
        let digit = scores.argmax();

        crate::log(&format!("Slot {}: predicted {}", slot + 1, digit));
        view.show_digit(slot, Some(digit));
        digits.push(digit);
    }

    let digits: [Digit; SLOT_COUNT] = digits
        .try_into()
        .map_err(|_| PredictError::Inference("slot count mismatch".to_string()))?;
    let volume = Volume::from_digits(digits);

    crate::log(&format!("Volume set to {}", volume.display_text()));
    view.show_volume(volume);

    Ok(Prediction { digits, volume })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ScoreVector, CLASS_COUNT};
    use crate::preprocess::NormalizedTensor;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns the queued digits in order, failing on call `fail_on` (0-based).
    struct ScriptedClassifier {
        digits: Vec<usize>,
        fail_on: Option<usize>,
        calls: Arc<AtomicUsize>,
    }

    impl Classifier for ScriptedClassifier {
        fn classify(&mut self, _: &NormalizedTensor) -> Result<ScoreVector, ClassifierError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(call) {
                return Err(ClassifierError::Inference("backend crashed".to_string()));
            }
            let mut scores = [0.0; CLASS_COUNT];
            scores[self.digits[call]] = 1.0;
            Ok(ScoreVector::new(scores))
        }
    }

    fn scripted(digits: &[usize], fail_on: Option<usize>) -> (ClassifierAdapter, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = ClassifierAdapter::ready(ScriptedClassifier {
            digits: digits.to_vec(),
            fail_on,
            calls: Arc::clone(&calls),
        });
        (adapter, calls)
    }

    fn inked() -> InkSurface {
        let mut surface = InkSurface::new(100, 100);
        surface.draw_segment((50.0, 20.0), (50.0, 80.0), 20.0);
        surface
    }

    fn blank() -> InkSurface {
        InkSurface::new(100, 100)
    }

    #[test]
    fn test_full_prediction() {
        let (adapter, calls) = scripted(&[0, 4, 2], None);
        let mut panel = PanelState::default();
        let surfaces = [inked(), inked(), inked()];

        let prediction =
            run_prediction(&surfaces, &adapter, &PreprocessConfig::default(), &mut panel).unwrap();

        assert_eq!(prediction.digits.map(Digit::value), [0, 4, 2]);
        assert_eq!(prediction.volume.value(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(panel.slot_text, ["0", "4", "2"]);
        assert_eq!(panel.volume_text, "042");
        assert_eq!(panel.fill_percent, 42);
        assert!((panel.gain - 0.42).abs() < 1e-6);
        assert!(panel.alerts.is_empty());
    }

    #[test]
    fn test_large_number_is_clamped() {
        let (adapter, _) = scripted(&[9, 9, 9], None);
        let mut panel = PanelState::default();
        let surfaces = [inked(), inked(), inked()];

        let prediction =
            run_prediction(&surfaces, &adapter, &PreprocessConfig::default(), &mut panel).unwrap();

        assert_eq!(prediction.volume.value(), 100);
        assert_eq!(panel.slot_text, ["9", "9", "9"]);
        assert_eq!(panel.volume_text, "100");
        assert_eq!(panel.gain, 1.0);
    }

    #[test]
    fn test_blank_slot_aborts_before_inference() {
        let (adapter, calls) = scripted(&[1, 2, 3], None);
        let mut panel = PanelState::default();
        let surfaces = [inked(), blank(), inked()];

        let err = run_prediction(&surfaces, &adapter, &PreprocessConfig::default(), &mut panel)
            .unwrap_err();

        assert_eq!(err, PredictError::EmptySlot { slot: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(panel.slot_text, ["-", "-", "-"]);
        assert_eq!(panel.alerts, vec!["Please draw a digit in box #2.".to_string()]);
    }

    #[test]
    fn test_first_blank_slot_is_reported() {
        let (adapter, _) = scripted(&[1, 2, 3], None);
        let mut panel = PanelState::default();
        let surfaces = [inked(), blank(), blank()];

        let err = run_prediction(&surfaces, &adapter, &PreprocessConfig::default(), &mut panel)
            .unwrap_err();
        assert_eq!(err, PredictError::EmptySlot { slot: 1 });
    }

    #[test]
    fn test_failure_keeps_earlier_results() {
        let (adapter, calls) = scripted(&[6, 6, 6], Some(1));
        let mut panel = PanelState::default();
        let surfaces = [inked(), inked(), inked()];

        let err = run_prediction(&surfaces, &adapter, &PreprocessConfig::default(), &mut panel)
            .unwrap_err();

        assert!(matches!(err, PredictError::Inference(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(panel.slot_text, ["6", "-", "-"]);
        assert_eq!(panel.volume_text, "000");
        assert_eq!(panel.gain, 0.0);
        assert_eq!(
            panel.alerts,
            vec!["An error occurred during prediction.".to_string()]
        );
    }

    #[test]
    fn test_not_ready_mutates_nothing() {
        let adapter = ClassifierAdapter::new();
        let mut panel = PanelState::default();
        let surfaces = [inked(), blank(), inked()];

        let err = run_prediction(&surfaces, &adapter, &PreprocessConfig::default(), &mut panel)
            .unwrap_err();

        // Readiness is checked before blank slots
        assert_eq!(err, PredictError::NotReady);
        assert_eq!(panel.slot_text, ["-", "-", "-"]);
        assert_eq!(panel.alerts, vec!["Model is not loaded yet.".to_string()]);
    }

    #[test]
    fn test_failed_model_load_is_reported() {
        let adapter = ClassifierAdapter::new();
        adapter
            .start_loading(|| Err(anyhow!("corrupt model")))
            .unwrap()
            .join()
            .unwrap();
        let mut panel = PanelState::default();
        let surfaces = [inked(), inked(), inked()];

        let err = run_prediction(&surfaces, &adapter, &PreprocessConfig::default(), &mut panel)
            .unwrap_err();

        assert!(matches!(err, PredictError::ModelLoad(msg) if msg.contains("corrupt model")));
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let messages = [
            PredictError::NotReady.to_string(),
            PredictError::EmptySlot { slot: 0 }.to_string(),
            PredictError::ModelLoad("x".to_string()).to_string(),
            PredictError::Inference("x".to_string()).to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(messages[1], "Please draw a digit in box #1.");
    }

    #[test]
    fn test_bad_output_maps_to_inference() {
        assert!(matches!(
            PredictError::from(ClassifierError::BadOutput(3)),
            PredictError::Inference(_)
        ));
        assert_eq!(
            PredictError::from(ClassifierError::NotReady),
            PredictError::NotReady
        );
    }
}
