// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Persists computed bands as small PNG artifacts in a scratch
//! directory, one file per band index, named deterministically so a
//! later invocation (or another machine's copy job) can find them.
//! Every worker touches only the file matching its own band index, so
//! the directory needs no locking beyond what the OS gives distinct
//! files.

use std::fs;
use std::path::{Path, PathBuf};

use image;

use errors::RenderError;

/// Handle on the scratch directory holding chunk artifacts.  Cloning
/// is cheap; clones are handed to each compute task.
#[derive(Clone, Debug)]
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    /// Opens the store, creating the scratch directory if absent.  An
    /// unwritable location is fatal for the invocation.
    pub fn open(dir: &Path) -> Result<ChunkStore, RenderError> {
        fs::create_dir_all(dir).map_err(|cause| RenderError::Io {
            path: dir.display().to_string(),
            cause,
        })?;
        Ok(ChunkStore {
            dir: dir.to_path_buf(),
        })
    }

    /// The deterministic artifact path for a band index.
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("chunk_{}.png", index))
    }

    /// Encodes a band's pixel buffer and writes it under the band's
    /// artifact name.
    pub fn write(&self, index: usize, pixels: &[u8], width: u32, rows: u32) -> Result<(), RenderError> {
        debug_assert_eq!(pixels.len(), width as usize * rows as usize * 3);
        let path = self.chunk_path(index);
        image::save_buffer(&path, pixels, width, rows, image::ColorType::RGB(8)).map_err(
            |cause| RenderError::Io {
                path: path.display().to_string(),
                cause,
            },
        )
    }

    /// Decodes a band's artifact back into raw RGB bytes, verifying
    /// the shape.  Anything wrong with the artifact — missing file,
    /// truncated write, not an image, wrong dimensions — comes back
    /// as a recoverable `Decode` error so the caller can skip the
    /// band and keep assembling.
    pub fn read(&self, index: usize, width: u32, rows: u32) -> Result<Vec<u8>, RenderError> {
        let path = self.chunk_path(index);
        let decoded = image::open(&path).map_err(|err| RenderError::Decode {
            band: index,
            reason: err.to_string(),
        })?;
        let pixels = decoded.to_rgb();
        if pixels.width() != width || pixels.height() != rows {
            return Err(RenderError::Decode {
                band: index,
                reason: format!(
                    "expected {}x{} pixels, found {}x{}",
                    width,
                    rows,
                    pixels.width(),
                    pixels.height()
                ),
            });
        }
        Ok(pixels.into_raw())
    }

    /// Best-effort deletion of a consumed artifact.
    pub fn remove(&self, index: usize) {
        let path = self.chunk_path(index);
        if let Err(err) = fs::remove_file(&path) {
            debug!("could not remove {}: {}", path.display(), err);
        }
    }
}
