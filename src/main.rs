//! Digit Volume
//!
//! Command-line front end: reads three digit images (or a recorded pointer
//! script), predicts the digits with the configured ONNX model and prints
//! the resulting volume.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use digit_volume::classifier::{Classifier, ClassifierAdapter, Readiness};
use digit_volume::config::{get_config, init_config, ModelConfig};
use digit_volume::ink::InkSurface;
use digit_volume::preprocess::preprocess;
use digit_volume::session::{load_script, Session};
use digit_volume::{benchmark, history, log, paths, SLOT_COUNT};

/// Longest time to wait for the model before giving up at startup.
const MODEL_LOAD_TIMEOUT: Duration = Duration::from_secs(600);

const USAGE: &str = "\
Usage:
  digit-volume predict <box1-image> <box2-image> <box3-image>
  digit-volume replay <events.json>
  digit-volume benchmark <digit-image>
  digit-volume preprocess <input-image> <output-png>";

fn main() -> Result<()> {
    // Route panics through the logger
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Unknown panic".to_string());
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    // Ensure output directories exist
    paths::ensure_directories()?;

    // Load configuration
    init_config();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

    match arg_refs.as_slice() {
        ["predict", a, b, c] => run_predict([*a, *b, *c]),
        ["replay", script] => run_replay(Path::new(script)),
        ["benchmark", image] => run_benchmark(Path::new(image)),
        ["preprocess", input, output] => run_preprocess(Path::new(input), Path::new(output)),
        _ => {
            eprintln!("{}", USAGE);
            Err(anyhow!("Unrecognized arguments: {:?}", args))
        }
    }
}

/// Opens the configured model on a background thread and waits for it.
fn load_model() -> Result<ClassifierAdapter> {
    let adapter = ClassifierAdapter::new();
    let model_config = get_config().model.clone();

    adapter.start_loading(move || open_classifier(&model_config))?;

    match adapter.wait_until_settled(MODEL_LOAD_TIMEOUT) {
        Readiness::Ready => Ok(adapter),
        Readiness::Failed(msg) => Err(anyhow!("Failed to load model: {}", msg)),
        other => Err(anyhow!("Model did not finish loading (state: {})", other)),
    }
}

#[cfg(feature = "onnx")]
fn open_classifier(config: &ModelConfig) -> Result<Box<dyn Classifier>> {
    digit_volume::classifier::onnx::load_configured(config)
}

#[cfg(not(feature = "onnx"))]
fn open_classifier(_config: &ModelConfig) -> Result<Box<dyn Classifier>> {
    Err(anyhow!("this build has no model backend (enable the `onnx` feature)"))
}

fn load_surface(path: &Path) -> Result<InkSurface> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(InkSurface::from_image(img))
}

fn new_session(adapter: ClassifierAdapter) -> Result<Session> {
    let config = get_config();
    let session = Session::new(config, adapter);
    if config.history_enabled {
        session.with_history(history::default_history_path())
    } else {
        Ok(session)
    }
}

fn run_predict(images: [&str; SLOT_COUNT]) -> Result<()> {
    let adapter = load_model()?;
    let mut session = new_session(adapter)?;

    for (slot, image) in images.iter().enumerate() {
        session.set_surface(slot, load_surface(Path::new(image))?)?;
    }

    let result = session.predict();
    log(&session.panel().summary());
    result?;
    Ok(())
}

fn run_replay(script: &Path) -> Result<()> {
    let events = load_script(script)?;
    log(&format!("Replaying {} events from {}", events.len(), script.display()));

    let adapter = load_model()?;
    let mut session = new_session(adapter)?;
    let predictions = session.replay(&events);

    log(&format!("Replay finished: {} successful predictions", predictions.len()));
    log(&session.panel().summary());
    Ok(())
}

fn run_benchmark(image: &Path) -> Result<()> {
    let config = get_config();
    let surface = load_surface(image)?;
    if surface.is_blank() {
        return Err(anyhow!("{} contains no ink", image.display()));
    }
    let tensor = preprocess(&surface, &config.preprocess());

    let adapter = load_model()?;
    let report = benchmark::run_benchmark(
        &adapter,
        &tensor,
        config.benchmark_warmup_runs,
        config.benchmark_runs,
    )?;

    println!("CPU inference avg: {:.3} ms", report.avg_ms);
    println!("Predicted digit: {}", report.digit);
    Ok(())
}

fn run_preprocess(input: &Path, output: &Path) -> Result<()> {
    let surface = load_surface(input)?;
    let tensor = preprocess(&surface, &get_config().preprocess());

    let output: PathBuf = if output.is_absolute() {
        output.to_path_buf()
    } else {
        paths::get_output_dir().join(output)
    };
    tensor
        .to_image()
        .save(&output)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    log(&format!("Preprocessed preview saved: {}", output.display()));
    Ok(())
}
