extern crate clap;
extern crate env_logger;
extern crate massbrot;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::time::Instant;

use massbrot::bands::Selection;
use massbrot::{RenderConfig, RenderError};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const ITERATIONS: &str = "iterations";
const CHUNK_SIZE: &str = "chunk-size";
const WORKERS: &str = "workers";
const SCRATCH_DIR: &str = "scratch-dir";
const DECODERS: &str = "decoders";
const RANGE: &str = "range";
const INTERVAL: &str = "interval";
const OFFSET: &str = "offset";
const SILENT: &str = "silent";
const KEEP: &str = "keep";
const FUSE: &str = "fuse";

fn args<'a>() -> ArgMatches<'a> {
    App::new("massbrot")
        .version("0.1.0")
        .about("Chunked parallel Mandelbrot renderer for rasters too large to hold in memory")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Final image file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("8000x6000")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse output image size"))
                .help("Size of the output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .default_value("-2.0,-1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the complex-plane window"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .default_value("1.0,1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the complex-plane window"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Escape-iteration cap per point"),
        )
        .arg(
            Arg::with_name(CHUNK_SIZE)
                .long(CHUNK_SIZE)
                .short("c")
                .takes_value(true)
                .default_value("50")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse chunk size",
                        "Chunk size must be at least 1 row",
                    )
                })
                .help("Rows per band"),
        )
        .arg(
            Arg::with_name(WORKERS)
                .long(WORKERS)
                .short("w")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse worker count",
                        "Worker count must be at least 1",
                    )
                })
                .help("Max bands computing concurrently [default: all CPUs]"),
        )
        .arg(
            Arg::with_name(SCRATCH_DIR)
                .long(SCRATCH_DIR)
                .takes_value(true)
                .default_value("chunks")
                .help("Directory holding intermediate chunk images"),
        )
        .arg(
            Arg::with_name(DECODERS)
                .long(DECODERS)
                .takes_value(true)
                .default_value("2")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        64,
                        "Could not parse decoder count",
                        "Decoder count must be between 1 and 64",
                    )
                })
                .help("Decode threads during assembly; 1 keeps assembly serial"),
        )
        .arg(
            Arg::with_name(RANGE)
                .long(RANGE)
                .takes_value(true)
                .conflicts_with_all(&[INTERVAL, OFFSET])
                .validator(|s| {
                    validate_pair::<usize>(&s, ':', "Could not parse band range, expected START:END")
                })
                .help("Compute only bands in the half-open index range START:END"),
        )
        .arg(
            Arg::with_name(INTERVAL)
                .long(INTERVAL)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse interval",
                        "Interval must be at least 1",
                    )
                })
                .help("Compute only bands where (index + offset) % interval == 0"),
        )
        .arg(
            Arg::with_name(OFFSET)
                .long(OFFSET)
                .takes_value(true)
                .requires(INTERVAL)
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        usize::max_value(),
                        "Could not parse offset",
                        "Offset must be a non-negative integer",
                    )
                })
                .help("Phase of this invocation within the interval"),
        )
        .arg(
            Arg::with_name(SILENT)
                .long(SILENT)
                .help("Suppress per-band progress lines"),
        )
        .arg(
            Arg::with_name(KEEP)
                .long(KEEP)
                .help("Retain chunk artifacts after assembly"),
        )
        .arg(
            Arg::with_name(FUSE)
                .long(FUSE)
                .conflicts_with_all(&[RANGE, INTERVAL, OFFSET])
                .help("Skip computing; stitch the scratch directory's chunks into the final image"),
        )
        .get_matches()
}

fn build_config(matches: &ArgMatches) -> RenderConfig {
    let (width, height) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("size was validated");
    let (x_min, y_min) =
        parse_pair(matches.value_of(LEFTLOWER).unwrap(), ',').expect("corner was validated");
    let (x_max, y_max) =
        parse_pair(matches.value_of(RIGHTUPPER).unwrap(), ',').expect("corner was validated");

    let selection = if let Some(range) = matches.value_of(RANGE) {
        let (start, end) = parse_pair(range, ':').expect("range was validated");
        Selection::Range { start, end }
    } else if let Some(interval) = matches.value_of(INTERVAL) {
        let interval = usize::from_str(interval).expect("interval was validated");
        let offset = matches
            .value_of(OFFSET)
            .map(|s| usize::from_str(s).expect("offset was validated"))
            .unwrap_or(0);
        Selection::Interval { interval, offset }
    } else {
        Selection::All
    };

    RenderConfig {
        width,
        height,
        x_min,
        x_max,
        y_min,
        y_max,
        max_iter: u32::from_str(matches.value_of(ITERATIONS).unwrap())
            .expect("iterations were validated"),
        chunk_size: usize::from_str(matches.value_of(CHUNK_SIZE).unwrap())
            .expect("chunk size was validated"),
        num_workers: matches
            .value_of(WORKERS)
            .map(|s| usize::from_str(s).expect("workers were validated"))
            .unwrap_or_else(num_cpus::get),
        decode_workers: usize::from_str(matches.value_of(DECODERS).unwrap())
            .expect("decoders were validated"),
        scratch_dir: PathBuf::from(matches.value_of(SCRATCH_DIR).unwrap()),
        output: PathBuf::from(matches.value_of(OUTPUT).unwrap()),
        selection,
        silent: matches.is_present(SILENT),
        keep_chunks: matches.is_present(KEEP),
    }
}

fn run(matches: &ArgMatches, config: RenderConfig) -> Result<(), RenderError> {
    if matches.is_present(FUSE) {
        let assembly = massbrot::assemble(&config)?;
        println!(
            "{} rows written, {} bands fused, {} skipped",
            assembly.rows_written, assembly.bands_assembled, assembly.bands_skipped
        );
        return Ok(());
    }
    let (summary, assembly) = massbrot::render(config)?;
    println!(
        "{} of {} bands rendered ({} failed)",
        summary.bands_rendered, summary.bands_selected, summary.bands_failed
    );
    if let Some(assembly) = assembly {
        println!(
            "{} rows written, {} bands skipped",
            assembly.rows_written, assembly.bands_skipped
        );
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = args();
    let config = build_config(&matches);
    let started = Instant::now();
    match run(&matches, config) {
        Ok(()) => {
            println!("finished in {:.1}s", started.elapsed().as_secs_f64());
        }
        Err(err) => {
            eprintln!("massbrot: {}", err);
            process::exit(1);
        }
    }
}
