use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};

/// Opaque white, the only color strokes are drawn with.
const INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Tightest rectangle containing every pixel with non-zero alpha.
///
/// Both corners are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    /// Counts both edge columns. A `max - min` width would crop the last
    /// column and row of ink and give a lone dot zero size.
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// A fixed-size drawing surface holding white ink on a transparent background.
#[derive(Clone, Debug)]
pub struct InkSurface {
    pixels: RgbaImage,
}

impl InkSurface {
    /// Creates a fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: ImageBuffer::new(width, height),
        }
    }

    /// Builds a surface from a decoded image.
    ///
    /// Images with an alpha channel are taken as-is (a saved canvas). Opaque
    /// images are read as white ink on black: alpha becomes the pixel's luma.
    pub fn from_image(img: DynamicImage) -> Self {
        if img.color().has_alpha() {
            return Self {
                pixels: img.to_rgba8(),
            };
        }

        let gray = img.to_luma8();
        let pixels = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            let luma = gray.get_pixel(x, y)[0];
            if luma == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 255, 255, luma])
            }
        });
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Read-only view of the raster.
    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Erases all ink.
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Returns true iff every pixel, read as a packed 32-bit RGBA word, is zero.
    ///
    /// Scans the whole raster.
    pub fn is_blank(&self) -> bool {
        self.pixels
            .as_raw()
            .chunks_exact(4)
            .all(|px| u32::from_ne_bytes([px[0], px[1], px[2], px[3]]) == 0)
    }

    /// Bounding box of all pixels with alpha > 0, or `None` if there are none.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;

        for (x, y, pixel) in self.pixels.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            bbox = Some(match bbox {
                None => BoundingBox {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            });
        }

        bbox
    }

    /// Draws a round-capped line segment of the given width.
    ///
    /// Every pixel whose center lies within `width / 2` of the segment becomes
    /// opaque white. Parts outside the surface are dropped. A zero-length
    /// segment draws a filled disc.
    pub fn draw_segment(&mut self, from: (f32, f32), to: (f32, f32), width: f32) {
        let radius = width / 2.0;
        if radius <= 0.0 {
            return;
        }

        let (w, h) = (self.width() as f32, self.height() as f32);
        let left = (from.0.min(to.0) - radius).floor().max(0.0);
        let top = (from.1.min(to.1) - radius).floor().max(0.0);
        let right = (from.0.max(to.0) + radius).ceil().min(w);
        let bottom = (from.1.max(to.1) + radius).ceil().min(h);
        if left >= right || top >= bottom {
            return;
        }

        let radius_sq = radius * radius;
        for y in top as u32..bottom as u32 {
            for x in left as u32..right as u32 {
                let center = (x as f32 + 0.5, y as f32 + 0.5);
                if distance_sq_to_segment(center, from, to) <= radius_sq {
                    self.pixels.put_pixel(x, y, INK);
                }
            }
        }
    }
}

/// Squared distance from point `p` to the segment `a`-`b`.
///
/// Works on offsets from `a` so that translated inputs give identical results.
fn distance_sq_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let (px, py) = (p.0 - a.0, p.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (ex, ey) = (px - t * dx, py - t * dy);
    ex * ex + ey * ey
}
