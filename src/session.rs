//! Drawing session: three ink surfaces, the pointer state machine, the
//! classifier handle and the result panel, driven by discrete input events.
//!
//! Events can be fed one at a time or replayed from a JSON script.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classifier::ClassifierAdapter;
use crate::config::AppConfig;
use crate::history::{append_prediction, init_csv};
use crate::ink::{InkCapture, InkSurface};
use crate::predict::{run_prediction, PanelState, PredictError, Prediction};
use crate::preprocess::PreprocessConfig;
use crate::SLOT_COUNT;

/// One user input. Coordinates are local to the slot being drawn on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown { slot: usize, x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    Predict,
    Clear,
}

impl std::fmt::Display for InputEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputEvent::PointerDown { slot, x, y } => {
                write!(f, "Pointer down on box #{} at ({}, {})", slot + 1, x, y)
            }
            InputEvent::PointerMove { x, y } => write!(f, "Pointer move to ({}, {})", x, y),
            InputEvent::PointerUp => write!(f, "Pointer up"),
            InputEvent::Predict => write!(f, "Predict"),
            InputEvent::Clear => write!(f, "Clear"),
        }
    }
}

/// Reads a JSON array of input events.
pub fn load_script(path: &Path) -> Result<Vec<InputEvent>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let events = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse script {}", path.display()))?;
    Ok(events)
}

/// All state behind one drawing screen.
pub struct Session {
    surfaces: [InkSurface; SLOT_COUNT],
    capture: InkCapture,
    adapter: ClassifierAdapter,
    preprocess: PreprocessConfig,
    panel: PanelState,
    history_path: Option<PathBuf>,
}

impl Session {
    /// Creates a session with blank surfaces sized from `config`.
    pub fn new(config: &AppConfig, adapter: ClassifierAdapter) -> Self {
        Self {
            surfaces: std::array::from_fn(|_| {
                InkSurface::new(config.canvas_width, config.canvas_height)
            }),
            capture: InkCapture::new(config.stroke_width),
            adapter,
            preprocess: config.preprocess(),
            panel: PanelState::default(),
            history_path: None,
        }
    }

    /// Records every successful prediction to the CSV at `path`.
    pub fn with_history(mut self, path: PathBuf) -> Result<Self> {
        init_csv(&path)?;
        self.history_path = Some(path);
        Ok(self)
    }

    pub fn surfaces(&self) -> &[InkSurface; SLOT_COUNT] {
        &self.surfaces
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    /// Replaces a slot's surface, e.g. with a loaded image.
    pub fn set_surface(&mut self, slot: usize, surface: InkSurface) -> Result<()> {
        let target = self
            .surfaces
            .get_mut(slot)
            .ok_or_else(|| anyhow!("No box #{}", slot + 1))?;
        *target = surface;
        Ok(())
    }

    /// Applies one input event.
    ///
    /// Prediction failures are alerted on the panel and returned.
    pub fn handle(&mut self, event: &InputEvent) -> Result<Option<Prediction>, PredictError> {
        match *event {
            InputEvent::PointerDown { slot, x, y } => {
                self.capture.pointer_down(&self.surfaces, slot, x, y);
                Ok(None)
            }
            InputEvent::PointerMove { x, y } => {
                self.capture.pointer_move(&mut self.surfaces, x, y);
                Ok(None)
            }
            InputEvent::PointerUp => {
                self.capture.pointer_up();
                Ok(None)
            }
            InputEvent::Predict => self.predict().map(Some),
            InputEvent::Clear => {
                self.clear();
                Ok(None)
            }
        }
    }

    /// Runs a prediction over the current surfaces.
    pub fn predict(&mut self) -> Result<Prediction, PredictError> {
        let prediction = run_prediction(
            &self.surfaces,
            &self.adapter,
            &self.preprocess,
            &mut self.panel,
        )?;

        if let Some(path) = &self.history_path {
            if let Err(e) = append_prediction(path, &prediction, Local::now()) {
                crate::log(&format!("Failed to record prediction history: {}", e));
            }
        }

        Ok(prediction)
    }

    /// Erases all ink and resets the panel to placeholders and silence.
    pub fn clear(&mut self) {
        self.capture.pointer_up();
        for surface in &mut self.surfaces {
            surface.clear();
        }
        self.panel.reset();
        crate::log("Cleared all boxes");
    }

    /// Feeds `events` in order. Failed predictions are alerted and replay
    /// continues. Returns the successful predictions.
    pub fn replay(&mut self, events: &[InputEvent]) -> Vec<Prediction> {
        let mut predictions = Vec::new();
        for event in events {
            if matches!(event, InputEvent::Predict | InputEvent::Clear) {
                crate::log(&format!("Replay: {}", event));
            }
            if let Ok(Some(prediction)) = self.handle(event) {
                predictions.push(prediction);
            }
        }
        predictions
    }
}
