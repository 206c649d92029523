// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Streams persisted bands, in ascending row order, into a
//! row-oriented PNG encoder.  At no point does more than a handful of
//! bands' worth of pixels exist in memory — that bound is the entire
//! reason the pipeline chunks the image, and it is what makes
//! rendering at resolutions far beyond physical memory feasible.
//!
//! A band whose artifact is missing or unreadable is logged and
//! zero-filled: its rows are written black so the image keeps its
//! geometry, and assembly carries on.  Artifacts are deleted as they
//! are consumed unless the invocation asked to keep them.
//!
//! When more than one decode worker is configured, decoding runs on a
//! small crossbeam-scoped crew pulling band indices from a shared
//! iterator, while the single writer holds a reorder buffer and still
//! feeds the encoder strictly in band order — the PNG row stream is
//! sequential and is never reordered.

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crossbeam;
use crossbeam::channel;
use png;

use bands;
use bands::Band;
use config::RenderConfig;
use errors::RenderError;
use store::ChunkStore;

/// What an assembly pass accomplished.
#[derive(Clone, Debug, Default)]
pub struct AssemblySummary {
    /// Rows streamed into the final image, zero-filled ones included.
    pub rows_written: usize,
    /// Bands decoded and streamed intact.
    pub bands_assembled: usize,
    /// Bands that could not be decoded and were zero-filled.
    pub bands_skipped: usize,
}

/// The row-oriented sink over the final image: open with the target
/// dimensions, push rows top to bottom, close.  Backed by the png
/// crate's streaming writer, so rows go to disk as they arrive.
struct RowSink {
    stream: png::StreamWriter<'static, BufWriter<File>>,
    path: String,
}

impl RowSink {
    fn open(path: &Path, width: u32, height: u32) -> Result<RowSink, RenderError> {
        let file = File::create(path).map_err(|cause| RenderError::Io {
            path: path.display().to_string(),
            cause,
        })?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let stream = encoder
            .write_header()
            .and_then(|writer| writer.into_stream_writer())
            .map_err(|err| RenderError::Encode {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        Ok(RowSink {
            stream,
            path: path.display().to_string(),
        })
    }

    fn write_row(&mut self, row: &[u8]) -> Result<(), RenderError> {
        self.stream.write_all(row).map_err(|cause| RenderError::Io {
            path: self.path.clone(),
            cause,
        })
    }

    fn close(self) -> Result<(), RenderError> {
        let path = self.path;
        self.stream.finish().map_err(|err| RenderError::Encode {
            path,
            reason: err.to_string(),
        })
    }
}

/// Stitches the scratch directory's bands into the final image.
/// Expects one artifact per band index; each missing or corrupt one
/// costs a logged, zero-filled gap, never the run.  On a fatal error
/// the partially written output file is removed.
pub fn assemble(config: &RenderConfig) -> Result<AssemblySummary, RenderError> {
    config.validate()?;
    let store = ChunkStore::open(&config.scratch_dir)?;
    let all_bands = bands::partition(config.height, config.chunk_size);

    let outcome = RowSink::open(&config.output, config.width as u32, config.height as u32)
        .and_then(|sink| {
            if config.decode_workers > 1 {
                assemble_parallel(&store, sink, &all_bands, config)
            } else {
                assemble_serial(&store, sink, &all_bands, config)
            }
        });
    match outcome {
        Ok(summary) => {
            info!(
                "assembled {} rows into {} ({} bands, {} skipped)",
                summary.rows_written,
                config.output.display(),
                summary.bands_assembled,
                summary.bands_skipped
            );
            Ok(summary)
        }
        Err(err) => {
            // never leave a half-written final image behind
            let _ = fs::remove_file(&config.output);
            Err(err)
        }
    }
}

/// Streams one decoded (or unreadable) band into the sink and
/// reclaims its artifact.
fn emit_band(
    sink: &mut RowSink,
    store: &ChunkStore,
    config: &RenderConfig,
    blank_row: &[u8],
    band: &Band,
    decoded: Result<Vec<u8>, RenderError>,
    summary: &mut AssemblySummary,
) -> Result<(), RenderError> {
    match decoded {
        Ok(pixels) => {
            for row in pixels.chunks(blank_row.len()) {
                sink.write_row(row)?;
            }
            summary.bands_assembled += 1;
        }
        Err(err) => {
            warn!("band {} skipped during assembly: {}", band.index, err);
            for _ in 0..band.rows() {
                sink.write_row(blank_row)?;
            }
            summary.bands_skipped += 1;
        }
    }
    summary.rows_written += band.rows();
    if !config.keep_chunks {
        store.remove(band.index);
    }
    Ok(())
}

fn assemble_serial(
    store: &ChunkStore,
    mut sink: RowSink,
    all_bands: &[Band],
    config: &RenderConfig,
) -> Result<AssemblySummary, RenderError> {
    let width = config.width;
    let blank_row = vec![0 as u8; width * 3];
    let mut summary = AssemblySummary::default();
    for band in all_bands {
        let decoded = store.read(band.index, width as u32, band.rows() as u32);
        emit_band(&mut sink, store, config, &blank_row, band, decoded, &mut summary)?;
    }
    sink.close()?;
    Ok(summary)
}

/// The bounded-concurrency variant: decoding fans out, writing does
/// not.  Bands decoded ahead of the writer wait in a reorder buffer
/// keyed by band order; the buffer never holds more than the channel
/// capacity plus one in-flight band per decoder.
fn assemble_parallel(
    store: &ChunkStore,
    mut sink: RowSink,
    all_bands: &[Band],
    config: &RenderConfig,
) -> Result<AssemblySummary, RenderError> {
    let width = config.width;
    let decoders = config.decode_workers;
    let work = Arc::new(Mutex::new(all_bands.iter().cloned().enumerate()));
    let (sender, receiver) = channel::bounded(decoders);

    crossbeam::scope(|spawner| {
        for _ in 0..decoders {
            let work = Arc::clone(&work);
            let sender = sender.clone();
            let store = &store;
            spawner.spawn(move |_| loop {
                let next = { work.lock().unwrap().next() };
                match next {
                    Some((seq, band)) => {
                        let decoded = store.read(band.index, width as u32, band.rows() as u32);
                        // a send failure means the writer bailed out;
                        // nothing left to decode for
                        if sender.send((seq, band, decoded)).is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            });
        }
        drop(sender);

        let blank_row = vec![0 as u8; width * 3];
        let mut summary = AssemblySummary::default();
        let mut pending: BTreeMap<usize, (Band, Result<Vec<u8>, RenderError>)> = BTreeMap::new();
        let mut next_seq = 0;
        for (seq, band, decoded) in receiver.iter() {
            pending.insert(seq, (band, decoded));
            while let Some((band, decoded)) = pending.remove(&next_seq) {
                emit_band(&mut sink, store, config, &blank_row, &band, decoded, &mut summary)?;
                next_seq += 1;
            }
        }
        // the channel is closed; whatever is still pending is contiguous
        while let Some((band, decoded)) = pending.remove(&next_seq) {
            emit_band(&mut sink, store, config, &blank_row, &band, decoded, &mut summary)?;
            next_seq += 1;
        }
        sink.close()?;
        Ok(summary)
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image;
    use tempfile;

    use std::path::Path;

    const WIDTH: usize = 40;
    const HEIGHT: usize = 23;
    const CHUNK: usize = 6;

    fn test_config(scratch: &Path, output: &Path) -> RenderConfig {
        RenderConfig {
            width: WIDTH,
            height: HEIGHT,
            chunk_size: CHUNK,
            decode_workers: 1,
            scratch_dir: scratch.to_path_buf(),
            output: output.to_path_buf(),
            silent: true,
            ..RenderConfig::default()
        }
    }

    /// Every byte of image row `y` gets the value `y`, so assembly
    /// order mistakes are visible in the output.
    fn fill_store(store: &ChunkStore) {
        for band in bands::partition(HEIGHT, CHUNK) {
            let mut pixels = vec![0 as u8; band.rows() * WIDTH * 3];
            for r in 0..band.rows() {
                let value = (band.y_start + r) as u8;
                for byte in &mut pixels[r * WIDTH * 3..(r + 1) * WIDTH * 3] {
                    *byte = value;
                }
            }
            store
                .write(band.index, &pixels, WIDTH as u32, band.rows() as u32)
                .unwrap();
        }
    }

    fn row_of(decoded: &[u8], y: usize) -> &[u8] {
        &decoded[y * WIDTH * 3..(y + 1) * WIDTH * 3]
    }

    #[test]
    fn bands_come_out_in_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("scratch"), &dir.path().join("out.png"));
        let store = ChunkStore::open(&config.scratch_dir).unwrap();
        fill_store(&store);
        let summary = assemble(&config).unwrap();
        assert_eq!(summary.rows_written, HEIGHT);
        assert_eq!(summary.bands_assembled, bands::num_bands(HEIGHT, CHUNK));
        assert_eq!(summary.bands_skipped, 0);

        let decoded = image::open(&config.output).unwrap().to_rgb();
        assert_eq!(decoded.width() as usize, WIDTH);
        assert_eq!(decoded.height() as usize, HEIGHT);
        let raw = decoded.into_raw();
        for y in 0..HEIGHT {
            assert!(row_of(&raw, y).iter().all(|&byte| byte == y as u8));
        }
        // consumed artifacts are reclaimed
        assert!(!store.chunk_path(0).exists());
    }

    #[test]
    fn keep_mode_retains_artifacts_and_repeats_identically() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir.path().join("scratch"), &dir.path().join("a.png"));
        config.keep_chunks = true;
        let store = ChunkStore::open(&config.scratch_dir).unwrap();
        fill_store(&store);
        assemble(&config).unwrap();
        assert!(store.chunk_path(0).exists());

        let mut again = config.clone();
        again.output = dir.path().join("b.png");
        assemble(&again).unwrap();
        assert_eq!(
            fs::read(&config.output).unwrap(),
            fs::read(&again.output).unwrap()
        );
    }

    #[test]
    fn a_missing_band_becomes_a_black_gap() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("scratch"), &dir.path().join("out.png"));
        let store = ChunkStore::open(&config.scratch_dir).unwrap();
        fill_store(&store);
        fs::remove_file(store.chunk_path(1)).unwrap();

        let summary = assemble(&config).unwrap();
        assert_eq!(summary.bands_skipped, 1);
        assert_eq!(summary.rows_written, HEIGHT);

        let raw = image::open(&config.output).unwrap().to_rgb().into_raw();
        for y in 0..HEIGHT {
            let expected = if y >= CHUNK && y < 2 * CHUNK { 0 } else { y as u8 };
            assert!(row_of(&raw, y).iter().all(|&byte| byte == expected));
        }
    }

    #[test]
    fn parallel_decode_matches_serial_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let mut serial = test_config(&dir.path().join("scratch"), &dir.path().join("serial.png"));
        serial.keep_chunks = true;
        let store = ChunkStore::open(&serial.scratch_dir).unwrap();
        fill_store(&store);
        assemble(&serial).unwrap();

        let mut parallel = serial.clone();
        parallel.decode_workers = 3;
        parallel.output = dir.path().join("parallel.png");
        assemble(&parallel).unwrap();

        assert_eq!(
            fs::read(&serial.output).unwrap(),
            fs::read(&parallel.output).unwrap()
        );
    }

    #[test]
    fn parallel_decode_tolerates_gaps_too() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir.path().join("scratch"), &dir.path().join("out.png"));
        config.decode_workers = 3;
        let store = ChunkStore::open(&config.scratch_dir).unwrap();
        fill_store(&store);
        fs::remove_file(store.chunk_path(2)).unwrap();
        let summary = assemble(&config).unwrap();
        assert_eq!(summary.bands_skipped, 1);
        assert_eq!(summary.rows_written, HEIGHT);
    }

    #[test]
    fn an_unwritable_output_is_fatal_and_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(
            &dir.path().join("scratch"),
            &dir.path().join("no_such_dir").join("out.png"),
        );
        let store = ChunkStore::open(&config.scratch_dir).unwrap();
        fill_store(&store);
        assert!(assemble(&config).is_err());
        assert!(!config.output.exists());
    }
}
