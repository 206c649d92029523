//! The full set of invocation options, validated in one place before
//! any band is scheduled.

use std::path::PathBuf;

use num_cpus;

use bands;
use bands::Selection;
use errors::RenderError;
use planes::Viewport;

/// Everything one invocation needs to know.  Built by the CLI (or a
/// test) and handed to the scheduler and assembler.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Pixel width of the final image.
    pub width: usize,
    /// Pixel height of the final image.
    pub height: usize,
    /// Left edge of the complex-plane window.
    pub x_min: f64,
    /// Right edge of the complex-plane window.
    pub x_max: f64,
    /// Lower edge of the complex-plane window.
    pub y_min: f64,
    /// Upper edge of the complex-plane window.
    pub y_max: f64,
    /// Escape-iteration cap.
    pub max_iter: u32,
    /// Rows per band.
    pub chunk_size: usize,
    /// Maximum number of bands computing concurrently.
    pub num_workers: usize,
    /// Decode threads during assembly; 1 keeps assembly serial.
    pub decode_workers: usize,
    /// Where chunk artifacts live between compute and assembly.
    pub scratch_dir: PathBuf,
    /// The final image file.
    pub output: PathBuf,
    /// Which bands this invocation computes.
    pub selection: Selection,
    /// Suppress per-band progress lines.
    pub silent: bool,
    /// Retain chunk artifacts after assembly instead of deleting
    /// them as they are consumed.
    pub keep_chunks: bool,
}

impl Default for RenderConfig {
    /// The dimensions the renderer was built around: an 8000x6000
    /// view of the classic window, fifty rows per band.
    fn default() -> RenderConfig {
        RenderConfig {
            width: 8000,
            height: 6000,
            x_min: -2.0,
            x_max: 1.0,
            y_min: -1.5,
            y_max: 1.5,
            max_iter: 100,
            chunk_size: 50,
            num_workers: num_cpus::get(),
            decode_workers: 2,
            scratch_dir: PathBuf::from("chunks"),
            output: PathBuf::from("mandelbrot.png"),
            selection: Selection::All,
            silent: false,
            keep_chunks: false,
        }
    }
}

impl RenderConfig {
    /// Fails fast on anything that would make the run meaningless.
    /// Nothing is scheduled, created, or written before this passes.
    pub fn validate(&self) -> Result<(), RenderError> {
        self.viewport().map(|_| ())?;
        if self.chunk_size == 0 {
            return Err(RenderError::config("chunk size must be at least 1 row"));
        }
        if self.num_workers == 0 {
            return Err(RenderError::config("worker count must be at least 1"));
        }
        if self.decode_workers == 0 {
            return Err(RenderError::config("decoder count must be at least 1"));
        }
        self.selection.validate()
    }

    /// The viewport these options describe.
    pub fn viewport(&self) -> Result<Viewport, RenderError> {
        Viewport::new(
            self.width,
            self.height,
            self.x_min,
            self.x_max,
            self.y_min,
            self.y_max,
            self.max_iter,
        )
    }

    /// How many bands the image partitions into.
    pub fn num_bands(&self) -> usize {
        bands::num_bands(self.height, self.chunk_size)
    }
}
