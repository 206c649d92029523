// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The work scheduler: partitions the image into bands, applies the
//! invocation's selection policy, and runs one compute-and-persist
//! task per selected band on a bounded worker pool.  A band that
//! fails — an I/O error writing its artifact, or an outright panic —
//! is logged with its index and counted; its siblings are never
//! disturbed, and the run finishes with that artifact absent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bands;
use bands::Band;
use chunk::render_band;
use config::RenderConfig;
use errors::RenderError;
use pool::TaskPool;
use progress::{ConsoleProgress, Progress, SilentProgress};
use store::ChunkStore;
use assembler;
use assembler::AssemblySummary;

/// What a compute pass accomplished.
#[derive(Clone, Debug, Default)]
pub struct RenderSummary {
    /// Bands the image partitions into.
    pub bands_total: usize,
    /// Bands the selection policy put in this invocation's work set.
    pub bands_selected: usize,
    /// Selected bands whose artifacts were written.
    pub bands_rendered: usize,
    /// Selected bands that failed; their artifacts are absent.
    pub bands_failed: usize,
}

/// Runs the compute phase of one invocation.
pub struct Scheduler {
    config: RenderConfig,
    progress: Arc<dyn Progress>,
}

impl Scheduler {
    /// A scheduler reporting to standard error, or silently when the
    /// configuration says so.
    pub fn new(config: RenderConfig) -> Scheduler {
        let progress: Arc<dyn Progress> = if config.silent {
            Arc::new(SilentProgress)
        } else {
            Arc::new(ConsoleProgress::new())
        };
        Scheduler { config, progress }
    }

    /// A scheduler with the caller's own progress reporter.
    pub fn with_progress(config: RenderConfig, progress: Arc<dyn Progress>) -> Scheduler {
        Scheduler { config, progress }
    }

    /// Partition, select, dispatch, wait.  Returns once every
    /// selected band has either persisted its artifact or failed.
    pub fn run(&self) -> Result<RenderSummary, RenderError> {
        self.config.validate()?;
        let viewport = Arc::new(self.config.viewport()?);
        let store = ChunkStore::open(&self.config.scratch_dir)?;

        let all_bands = bands::partition(self.config.height, self.config.chunk_size);
        let bands_total = all_bands.len();
        let selected: Vec<Band> = all_bands
            .into_iter()
            .filter(|band| self.config.selection.contains(band.index))
            .collect();
        let total = selected.len();
        info!("{} of {} bands selected", total, bands_total);
        if total == 0 {
            warn!("the selection matches no bands; nothing to do");
        }

        let completed = Arc::new(AtomicUsize::new(0));
        let width = self.config.width as u32;
        let pool = TaskPool::new(self.config.num_workers);
        let handles: Vec<_> = selected
            .iter()
            .map(|band| {
                let band = *band;
                let viewport = Arc::clone(&viewport);
                let store = store.clone();
                let completed = Arc::clone(&completed);
                let progress = Arc::clone(&self.progress);
                let handle = pool.enqueue(move || -> Result<(), RenderError> {
                    let pixels = render_band(&viewport, &band);
                    store.write(band.index, &pixels, width, band.rows() as u32)?;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.report(done, total);
                    Ok(())
                });
                (band.index, handle)
            })
            .collect();

        let mut bands_failed = 0;
        for (index, handle) in handles {
            match handle.wait() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    bands_failed += 1;
                    error!("band {} failed: {}", index, err);
                }
                Err(_) => {
                    bands_failed += 1;
                    error!("band {} panicked; its artifact is absent", index);
                }
            }
        }
        pool.shutdown();

        Ok(RenderSummary {
            bands_total,
            bands_selected: total,
            bands_rendered: total - bands_failed,
            bands_failed,
        })
    }
}

/// The whole pipeline for one invocation: compute every selected
/// band, then — only when the selection was the whole image — stream
/// the bands into the final file.  Range and interval runs stop after
/// compute; their observable result is the chunk artifacts on disk.
pub fn render(config: RenderConfig) -> Result<(RenderSummary, Option<AssemblySummary>), RenderError> {
    let assemble_after = config.selection.is_all();
    let summary = Scheduler::new(config.clone()).run()?;
    if assemble_after {
        let assembly = assembler::assemble(&config)?;
        Ok((summary, Some(assembly)))
    } else {
        info!(
            "partial render: {} artifacts left in {}",
            summary.bands_rendered,
            config.scratch_dir.display()
        );
        Ok((summary, None))
    }
}
