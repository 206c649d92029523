#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Massbrot renderer
//!
//! Renders the Mandelbrot escape-time fractal at resolutions whose
//! full pixel buffer would never fit in memory.  The image is cut
//! into horizontal bands of rows; each band is computed on a bounded
//! worker pool, encoded, and parked on disk as its own small image.
//! A streaming assembly pass then walks the bands in row order and
//! feeds them, one row at a time, into a row-oriented PNG encoder, so
//! the complete raster exists only in the output file.
//!
//! An invocation may also compute just a subset of the bands: a
//! contiguous index range, or an interval-with-offset comb of the
//! band indices.  Those modes leave the band images behind instead of
//! assembling, which is what makes it possible to spread one huge
//! render across several machines and fuse the chunks afterwards.

extern crate crossbeam;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate png;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

pub mod assembler;
pub mod bands;
pub mod chunk;
pub mod color;
pub mod config;
pub mod errors;
pub mod escape;
pub mod planes;
pub mod pool;
pub mod progress;
pub mod scheduler;
pub mod store;

pub use assembler::{assemble, AssemblySummary};
pub use config::RenderConfig;
pub use errors::RenderError;
pub use scheduler::{render, RenderSummary, Scheduler};
