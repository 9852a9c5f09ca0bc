//! Digit classifier boundary.
//!
//! This module provides:
//! - The `Classifier` trait every model backend implements
//! - Score vectors and first-maximum argmax
//! - `ClassifierAdapter`, which owns the model's readiness and loads it once
//!   on a background thread
//! - Model source resolution (local file or download) and the ONNX backend

#[cfg(feature = "onnx")]
pub mod onnx;
pub mod source;

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::preprocess::NormalizedTensor;

/// Number of digit classes the model scores.
pub const CLASS_COUNT: usize = 10;

/// Errors reported by the classifier boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("model is not loaded yet")]
    NotReady,
    #[error("model failed to load: {0}")]
    LoadFailed(String),
    #[error("model loading was already started")]
    AlreadyStarted,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("expected 10 scores, model returned {0}")]
    BadOutput(usize),
}

/// A single decimal digit, 0 through 9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digit(u8);

impl Digit {
    /// Returns `None` for values above 9.
    pub fn new(value: u8) -> Option<Self> {
        (value <= 9).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One score per digit class, index = digit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreVector([f32; CLASS_COUNT]);

impl ScoreVector {
    pub fn new(scores: [f32; CLASS_COUNT]) -> Self {
        Self(scores)
    }

    pub fn scores(&self) -> &[f32; CLASS_COUNT] {
        &self.0
    }

    /// Index of the highest score. Ties go to the lowest index; NaN never wins.
    pub fn argmax(&self) -> Digit {
        let mut best = 0;
        for (i, &score) in self.0.iter().enumerate().skip(1) {
            if score > self.0[best] || (self.0[best].is_nan() && !score.is_nan()) {
                best = i;
            }
        }
        Digit(best as u8)
    }
}

impl TryFrom<&[f32]> for ScoreVector {
    type Error = ClassifierError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        let scores: [f32; CLASS_COUNT] = values
            .try_into()
            .map_err(|_| ClassifierError::BadOutput(values.len()))?;
        Ok(Self(scores))
    }
}

/// A loaded model that scores one tensor at a time.
pub trait Classifier: Send {
    fn classify(&mut self, tensor: &NormalizedTensor) -> Result<ScoreVector, ClassifierError>;
}

/// Model lifecycle as seen by callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Unloaded => write!(f, "Unloaded"),
            Readiness::Loading => write!(f, "Loading"),
            Readiness::Ready => write!(f, "Ready"),
            Readiness::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}

/// Internal slot holding the model once it exists.
enum ModelState {
    Unloaded,
    Loading,
    Ready(Box<dyn Classifier>),
    Failed(String),
}

impl ModelState {
    fn readiness(&self) -> Readiness {
        match self {
            ModelState::Unloaded => Readiness::Unloaded,
            ModelState::Loading => Readiness::Loading,
            ModelState::Ready(_) => Readiness::Ready,
            ModelState::Failed(msg) => Readiness::Failed(msg.clone()),
        }
    }
}

struct Shared {
    state: Mutex<ModelState>,
    settled: Condvar,
}

/// Owns the classifier and its readiness.
///
/// Cloning yields another handle to the same model.
#[derive(Clone)]
pub struct ClassifierAdapter {
    shared: Arc<Shared>,
}

impl Default for ClassifierAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierAdapter {
    /// Creates an adapter with no model.
    pub fn new() -> Self {
        Self::with_state(ModelState::Unloaded)
    }

    /// Creates an adapter around an already loaded classifier.
    pub fn ready(classifier: impl Classifier + 'static) -> Self {
        Self::with_state(ModelState::Ready(Box::new(classifier)))
    }

    fn with_state(state: ModelState) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                settled: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ModelState> {
        // A panic inside a backend poisons the lock; the state itself stays usable
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current readiness.
    pub fn readiness(&self) -> Readiness {
        self.lock().readiness()
    }

    /// Loads the model on a background thread.
    ///
    /// Moves the adapter to `Loading` immediately, then to `Ready` or
    /// `Failed` when `loader` returns. Loading happens at most once per
    /// adapter; a failure is final.
    pub fn start_loading<F>(&self, loader: F) -> Result<JoinHandle<()>, ClassifierError>
    where
        F: FnOnce() -> anyhow::Result<Box<dyn Classifier>> + Send + 'static,
    {
        {
            let mut state = self.lock();
            if !matches!(*state, ModelState::Unloaded) {
                return Err(ClassifierError::AlreadyStarted);
            }
            *state = ModelState::Loading;
        }

        crate::log("Loading classifier model...");
        let shared = Arc::clone(&self.shared);

        Ok(thread::spawn(move || {
            let next = match loader() {
                Ok(classifier) => {
                    crate::log("Classifier model loaded successfully");
                    ModelState::Ready(classifier)
                }
                Err(e) => {
                    crate::log(&format!("Failed to load classifier model: {:#}", e));
                    ModelState::Failed(format!("{:#}", e))
                }
            };

            let mut state = shared
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *state = next;
            shared.settled.notify_all();
        }))
    }

    /// Blocks until loading has finished (or never started), up to `timeout`.
    ///
    /// Returns the readiness at the time of return.
    pub fn wait_until_settled(&self, timeout: Duration) -> Readiness {
        let guard = self.lock();
        let (guard, _) = self
            .shared
            .settled
            .wait_timeout_while(guard, timeout, |state| {
                matches!(state, ModelState::Loading)
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.readiness()
    }

    /// Scores one tensor.
    ///
    /// Fails fast with `NotReady` while the model is unloaded or loading, and
    /// with `LoadFailed` once loading has failed.
    pub fn classify(&self, tensor: &NormalizedTensor) -> Result<ScoreVector, ClassifierError> {
        let mut state = self.lock();
        match &mut *state {
            ModelState::Ready(classifier) => classifier.classify(tensor),
            ModelState::Unloaded | ModelState::Loading => Err(ClassifierError::NotReady),
            ModelState::Failed(msg) => Err(ClassifierError::LoadFailed(msg.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::mpsc::channel;

    /// Always returns the same scores.
    struct FixedClassifier(ScoreVector);

    impl Classifier for FixedClassifier {
        fn classify(&mut self, _: &NormalizedTensor) -> Result<ScoreVector, ClassifierError> {
            Ok(self.0)
        }
    }

    fn one_hot(digit: usize) -> ScoreVector {
        let mut scores = [0.0; CLASS_COUNT];
        scores[digit] = 1.0;
        ScoreVector::new(scores)
    }

    #[test]
    fn test_argmax_picks_highest() {
        assert_eq!(one_hot(7).argmax(), Digit(7));
        let scores = ScoreVector::new([-3.0, -1.0, -2.0, -0.5, -9.0, -4.0, -4.0, -4.0, -4.0, -4.0]);
        assert_eq!(scores.argmax().value(), 3);
    }

    #[test]
    fn test_argmax_tie_goes_to_first() {
        let scores = ScoreVector::new([0.3, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(scores.argmax().value(), 0);

        let scores = ScoreVector::new([0.0, 0.0, 0.0, 0.0, 0.9, 0.0, 0.0, 0.0, 0.9, 0.0]);
        assert_eq!(scores.argmax().value(), 4);
    }

    #[test]
    fn test_argmax_ignores_nan() {
        let mut scores = [0.1; CLASS_COUNT];
        scores[0] = f32::NAN;
        scores[5] = 0.8;
        assert_eq!(ScoreVector::new(scores).argmax().value(), 5);
    }

    #[test]
    fn test_score_vector_requires_ten_values() {
        let nine = [0.0f32; 9];
        assert_eq!(
            ScoreVector::try_from(&nine[..]),
            Err(ClassifierError::BadOutput(9))
        );
        let ten = [0.0f32; 10];
        assert!(ScoreVector::try_from(&ten[..]).is_ok());
    }

    #[test]
    fn test_digit_range() {
        assert_eq!(Digit::new(9).map(Digit::value), Some(9));
        assert_eq!(Digit::new(10), None);
        assert_eq!(Digit::new(0).unwrap().to_string(), "0");
    }

    #[test]
    fn test_unloaded_adapter_is_not_ready() {
        let adapter = ClassifierAdapter::new();
        assert_eq!(adapter.readiness(), Readiness::Unloaded);
        assert_eq!(
            adapter.classify(&NormalizedTensor::zeros(28)),
            Err(ClassifierError::NotReady)
        );
    }

    #[test]
    fn test_classify_while_loading_fails_fast() {
        let adapter = ClassifierAdapter::new();
        let (release, gate) = channel::<()>();

        let handle = adapter
            .start_loading(move || {
                gate.recv().ok();
                Ok(Box::new(FixedClassifier(one_hot(3))) as Box<dyn Classifier>)
            })
            .unwrap();

        assert_eq!(adapter.readiness(), Readiness::Loading);
        assert_eq!(
            adapter.classify(&NormalizedTensor::zeros(28)),
            Err(ClassifierError::NotReady)
        );

        release.send(()).unwrap();
        handle.join().unwrap();

        assert_eq!(adapter.readiness(), Readiness::Ready);
        let scores = adapter.classify(&NormalizedTensor::zeros(28)).unwrap();
        assert_eq!(scores.argmax().value(), 3);
    }

    #[test]
    fn test_load_failure_is_terminal() {
        let adapter = ClassifierAdapter::new();
        let handle = adapter
            .start_loading(|| Err(anyhow!("file not found")))
            .unwrap();
        handle.join().unwrap();

        assert!(matches!(adapter.readiness(), Readiness::Failed(msg) if msg.contains("file not found")));
        assert!(matches!(
            adapter.classify(&NormalizedTensor::zeros(28)),
            Err(ClassifierError::LoadFailed(_))
        ));
        // No second attempt
        assert_eq!(
            adapter
                .start_loading(|| Ok(Box::new(FixedClassifier(one_hot(1))) as Box<dyn Classifier>))
                .err(),
            Some(ClassifierError::AlreadyStarted)
        );
    }

    #[test]
    fn test_wait_until_settled() {
        let adapter = ClassifierAdapter::new();
        adapter
            .start_loading(|| {
                std::thread::sleep(Duration::from_millis(20));
                Ok(Box::new(FixedClassifier(one_hot(2))) as Box<dyn Classifier>)
            })
            .unwrap();

        assert_eq!(
            adapter.wait_until_settled(Duration::from_secs(10)),
            Readiness::Ready
        );
    }

    #[test]
    fn test_wait_returns_immediately_when_unloaded() {
        let adapter = ClassifierAdapter::new();
        assert_eq!(
            adapter.wait_until_settled(Duration::from_secs(10)),
            Readiness::Unloaded
        );
    }

    #[test]
    fn test_readiness_display() {
        assert_eq!(format!("{}", Readiness::Loading), "Loading");
        assert_eq!(
            format!("{}", Readiness::Failed("bad file".to_string())),
            "Failed: bad file"
        );
    }
}
