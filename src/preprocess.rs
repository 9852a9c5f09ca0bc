use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};

use crate::ink::InkSurface;

/// Side of the square input the digit model was trained on.
pub const MODEL_INPUT_SIDE: u32 = 28;

/// Geometry of the classifier input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Margin added to the digit's longest side before downscaling
    pub padding: u32,
    /// Side length of the square output
    pub side: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            padding: 40,
            side: MODEL_INPUT_SIDE,
        }
    }
}

/// Square single-channel classifier input, row-major, values in [-1, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedTensor {
    side: u32,
    data: Vec<f32>,
}

impl NormalizedTensor {
    /// All-zero tensor, the result for a surface without ink.
    pub fn zeros(side: u32) -> Self {
        Self {
            side,
            data: vec![0.0; (side * side) as usize],
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Model-boundary shape: (batch, channel, height, width).
    pub fn shape(&self) -> [usize; 4] {
        [1, 1, self.side as usize, self.side as usize]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Maps values back to 8-bit grayscale for inspection (-1 is black, 1 is white).
    pub fn to_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.side, self.side, |x, y| {
            let v = self.data[(y * self.side + x) as usize];
            Luma([(((v + 1.0) / 2.0).clamp(0.0, 1.0) * 255.0).round() as u8])
        })
    }
}

/// Converts one ink surface into the classifier's input tensor.
///
/// The ink's bounding box is pasted unscaled into the center of a black square
/// of side `max(box_w, box_h) + padding`, which is then downscaled to
/// `side x side` with a triangle (bilinear) filter. Each pixel's red channel
/// is mapped from [0, 255] to [-1, 1].
///
/// A surface with no ink yields an all-zero tensor.
pub fn preprocess(surface: &InkSurface, config: &PreprocessConfig) -> NormalizedTensor {
    let Some(bbox) = surface.bounding_box() else {
        return NormalizedTensor::zeros(config.side);
    };

    let box_w = bbox.width();
    let box_h = bbox.height();
    let new_size = box_w.max(box_h) + config.padding;

    let cropped =
        imageops::crop_imm(surface.image(), bbox.min_x, bbox.min_y, box_w, box_h).to_image();

    let mut centered: GrayImage = ImageBuffer::new(new_size, new_size);
    // Whole-pixel paste: an odd margin leaves the extra pixel on the right/bottom
    let paste_x = (new_size - box_w) / 2;
    let paste_y = (new_size - box_h) / 2;
    for (x, y, pixel) in cropped.enumerate_pixels() {
        // Ink composited over black
        let intensity = (pixel[0] as u32 * pixel[3] as u32 + 127) / 255;
        centered.put_pixel(paste_x + x, paste_y + y, Luma([intensity as u8]));
    }

    let resized = imageops::resize(&centered, config.side, config.side, FilterType::Triangle);

    let data = resized
        .pixels()
        .map(|p| p[0] as f32 / 255.0 * 2.0 - 1.0)
        .collect();

    NormalizedTensor {
        side: config.side,
        data,
    }
}
