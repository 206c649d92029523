//! Contains the Viewport struct, which ties a pixel grid with an
//! origin at 0,0 to a rectangle on the complex plane and carries the
//! iteration cap for the render.  The mapping is affine and half-open:
//! pixel (0,0) lands exactly on the lower corner of the rectangle,
//! and the last pixel column and row land strictly inside it.

use num::Complex;

use errors::RenderError;

/// The immutable parameters of one render: pixel dimensions, the
/// complex-plane window, and the escape-iteration cap.
#[derive(Copy, Clone, Debug)]
pub struct Viewport {
    width: usize,
    height: usize,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    max_iter: u32,
}

impl Viewport {
    /// Constructor.  Rejects empty pixel grids, degenerate complex
    /// rectangles, and a zero iteration cap, since every one of those
    /// would make the pixel mapping meaningless.
    pub fn new(
        width: usize,
        height: usize,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        max_iter: u32,
    ) -> Result<Viewport, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::config("image dimensions must be positive"));
        }
        if !(x_max > x_min) {
            return Err(RenderError::config(
                "x_max must be greater than x_min on the complex plane",
            ));
        }
        if !(y_max > y_min) {
            return Err(RenderError::config(
                "y_max must be greater than y_min on the complex plane",
            ));
        }
        if max_iter == 0 {
            return Err(RenderError::config("iteration cap must be positive"));
        }
        Ok(Viewport {
            width,
            height,
            x_min,
            x_max,
            y_min,
            y_max,
            max_iter,
        })
    }

    /// Width of the pixel grid.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the pixel grid.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The escape-iteration cap handed to the kernel.
    pub fn max_iter(&self) -> u32 {
        self.max_iter
    }

    /// Given the column and row of a pixel, return the complex number
    /// at the equivalent location on the complex plane.  Linear in
    /// each axis independently; pixel (0,0) maps to (x_min, y_min).
    pub fn pixel_to_point(&self, x: usize, y: usize) -> Complex<f64> {
        Complex::new(
            self.x_min + (x as f64 / self.width as f64) * (self.x_max - self.x_min),
            self.y_min + (y as f64 / self.height as f64) * (self.y_max - self.y_min),
        )
    }
}
