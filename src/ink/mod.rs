//! Ink surfaces and pointer capture.
//!
//! This module provides:
//! - The per-slot RGBA raster that strokes are drawn onto
//! - Blank detection and bounding-box extraction over that raster
//! - The pointer state machine that turns down/move/up events into strokes

pub mod capture;
pub mod surface;

pub use capture::InkCapture;
pub use surface::{BoundingBox, InkSurface};
