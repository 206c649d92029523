// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bands and band selection.  A band is a contiguous half-open range
//! of image rows, processed and persisted as one unit.  The bands of
//! an image tile `[0, height)` exactly and disjointly; the last band
//! may be shorter than the chunk size.  A `Selection` decides which
//! band indices an invocation computes, which is what lets one render
//! be split across repeated runs or several machines.

use errors::RenderError;

/// One contiguous row range `[y_start, y_end)` of the target image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Band {
    /// Position of this band in the `0..num_bands` numbering.
    pub index: usize,
    /// First image row covered by the band.
    pub y_start: usize,
    /// One past the last image row covered by the band.
    pub y_end: usize,
}

impl Band {
    /// Number of image rows in the band.
    pub fn rows(&self) -> usize {
        self.y_end - self.y_start
    }
}

/// How many bands a `height`-row image falls into at `chunk_size`
/// rows per band.
pub fn num_bands(height: usize, chunk_size: usize) -> usize {
    (height + chunk_size - 1) / chunk_size
}

/// Cuts `[0, height)` into bands of at most `chunk_size` rows.
pub fn partition(height: usize, chunk_size: usize) -> Vec<Band> {
    (0..num_bands(height, chunk_size))
        .map(|index| {
            let y_start = index * chunk_size;
            let y_end = if y_start + chunk_size < height {
                y_start + chunk_size
            } else {
                height
            };
            Band {
                index,
                y_start,
                y_end,
            }
        })
        .collect()
}

/// The policy choosing which bands a single invocation computes.
/// Exactly one is active per run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Every band.  The only policy that yields a final image in the
    /// same invocation.
    All,
    /// Bands with index in the half-open range `[start, end)`.
    Range {
        /// First selected band index.
        start: usize,
        /// One past the last selected band index.
        end: usize,
    },
    /// Bands where `(index + offset) % interval == 0` — a sparse,
    /// evenly spaced comb, one slice of a render spread over
    /// `interval` cooperating invocations.
    Interval {
        /// Spacing between selected bands.
        interval: usize,
        /// Phase of this invocation within the interval.
        offset: usize,
    },
}

impl Default for Selection {
    fn default() -> Selection {
        Selection::All
    }
}

impl Selection {
    /// Rejects parameter combinations under which the predicate is
    /// meaningless.  Called before any work is scheduled.
    pub fn validate(&self) -> Result<(), RenderError> {
        match *self {
            Selection::All => Ok(()),
            Selection::Range { start, end } => {
                if start < end {
                    Ok(())
                } else {
                    Err(RenderError::config(format!(
                        "band range {}:{} is empty",
                        start, end
                    )))
                }
            }
            Selection::Interval { interval, .. } => {
                if interval >= 1 {
                    Ok(())
                } else {
                    Err(RenderError::config("interval must be at least 1"))
                }
            }
        }
    }

    /// Whether the band at `index` is part of this invocation's work
    /// set.
    pub fn contains(&self, index: usize) -> bool {
        match *self {
            Selection::All => true,
            Selection::Range { start, end } => index >= start && index < end,
            Selection::Interval { interval, offset } => (index + offset) % interval == 0,
        }
    }

    /// True for the whole-image policy, the one that chains straight
    /// into assembly.
    pub fn is_all(&self) -> bool {
        *self == Selection::All
    }
}
