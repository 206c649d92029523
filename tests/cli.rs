extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn massbrot() -> Command {
    Command::cargo_bin("massbrot").unwrap()
}

fn base_args(scratch: &Path, output: &Path) -> Vec<String> {
    vec![
        "--output".to_string(),
        output.display().to_string(),
        "--size".to_string(),
        "64x48".to_string(),
        "--chunk-size".to_string(),
        "16".to_string(),
        "--iterations".to_string(),
        "30".to_string(),
        "--scratch-dir".to_string(),
        scratch.display().to_string(),
        "--silent".to_string(),
    ]
}

#[test]
fn full_render_produces_the_final_image() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("chunks");
    let output = dir.path().join("out.png");
    massbrot()
        .args(&base_args(&scratch, &output))
        .args(&["--workers", "2"])
        .assert()
        .success();

    let decoded = image::open(&output).unwrap().to_rgb();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    // consumed artifacts are reclaimed
    for index in 0..3 {
        assert!(!scratch.join(format!("chunk_{}.png", index)).exists());
    }
}

#[test]
fn range_runs_leave_chunks_and_no_final_image() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("chunks");
    let output = dir.path().join("out.png");
    massbrot()
        .args(&base_args(&scratch, &output))
        .args(&["--range", "1:3"])
        .assert()
        .success();

    assert!(!scratch.join("chunk_0.png").exists());
    assert!(scratch.join("chunk_1.png").exists());
    assert!(scratch.join("chunk_2.png").exists());
    assert!(!output.exists());
}

#[test]
fn interval_runs_select_the_comb() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("chunks");
    let output = dir.path().join("out.png");
    massbrot()
        .args(&base_args(&scratch, &output))
        .args(&["--interval", "2", "--offset", "1"])
        .assert()
        .success();

    assert!(!scratch.join("chunk_0.png").exists());
    assert!(scratch.join("chunk_1.png").exists());
    assert!(!scratch.join("chunk_2.png").exists());
    assert!(!output.exists());
}

#[test]
fn range_and_interval_are_mutually_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("chunks");
    let output = dir.path().join("out.png");
    massbrot()
        .args(&base_args(&scratch, &output))
        .args(&["--range", "0:2", "--interval", "2"])
        .assert()
        .failure();
}

#[test]
fn a_lone_offset_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("chunks");
    let output = dir.path().join("out.png");
    massbrot()
        .args(&base_args(&scratch, &output))
        .args(&["--offset", "1"])
        .assert()
        .failure();
}

#[test]
fn an_empty_band_range_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("chunks");
    let output = dir.path().join("out.png");
    massbrot()
        .args(&base_args(&scratch, &output))
        .args(&["--range", "5:2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
    assert!(!scratch.exists());
}

#[test]
fn fusion_stitches_partial_renders_into_the_same_image() {
    let dir = tempfile::tempdir().unwrap();

    // two partial invocations covering all three bands between them,
    // the way a distributed render would
    let scratch = dir.path().join("chunks");
    let fused = dir.path().join("fused.png");
    massbrot()
        .args(&base_args(&scratch, &fused))
        .args(&["--range", "0:2"])
        .assert()
        .success();
    massbrot()
        .args(&base_args(&scratch, &fused))
        .args(&["--range", "2:3"])
        .assert()
        .success();
    massbrot()
        .args(&base_args(&scratch, &fused))
        .arg("--fuse")
        .assert()
        .success();

    // one single-invocation render of the same viewport
    let scratch_whole = dir.path().join("chunks_whole");
    let whole = dir.path().join("whole.png");
    massbrot()
        .args(&base_args(&scratch_whole, &whole))
        .assert()
        .success();

    assert_eq!(fs::read(&fused).unwrap(), fs::read(&whole).unwrap());
}

#[test]
fn worker_count_does_not_change_the_final_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let single = dir.path().join("single.png");
    let many = dir.path().join("many.png");
    massbrot()
        .args(&base_args(&dir.path().join("chunks_single"), &single))
        .args(&["--workers", "1"])
        .assert()
        .success();
    massbrot()
        .args(&base_args(&dir.path().join("chunks_many"), &many))
        .args(&["--workers", "4"])
        .assert()
        .success();

    assert_eq!(fs::read(&single).unwrap(), fs::read(&many).unwrap());
}
