use assert_cmd::Command;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use predicates::prelude::*;
use std::path::Path;

fn trackmix() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("trackmix"))
}

fn write_constant_wav(path: &Path, value: f32, frames: usize) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 48_000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).expect("writer");
    for _ in 0..frames {
        writer.write_sample(value).expect("sample");
    }
    writer.finalize().expect("finalize");
}

#[test]
fn create_settings_json_outputs_defaults() {
    trackmix()
        .args(["create", "settings-json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main_track"))
        .stdout(predicate::str::contains("output_format"))
        .stdout(predicate::str::contains("is_muted"));
}

#[test]
fn mix_sums_tracks_once_both_are_active() {
    let dir = tempfile::tempdir().expect("tempdir");
    let main = dir.path().join("main.wav");
    let other = dir.path().join("other.wav");
    let out = dir.path().join("out.wav");
    write_constant_wav(&main, 0.25, 4096);
    write_constant_wav(&other, 0.5, 4096);

    trackmix()
        .arg("mix")
        .arg(&main)
        .arg(&other)
        .arg("--out")
        .arg(&out)
        .args(["--chunk", "1024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4096 frames"));

    let mut reader = WavReader::open(&out).expect("output wav");
    assert_eq!(reader.spec().sample_format, SampleFormat::Float);
    assert_eq!(reader.spec().sample_rate, 48_000);
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.expect("sample")).collect();
    assert_eq!(samples.len(), 4096);
    assert!(samples[..1024].iter().all(|&s| s == 0.25));
    assert!(samples[1024..].iter().all(|&s| s == 0.75));
}

#[test]
fn mix_applies_settings_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let main = dir.path().join("main.wav");
    let other = dir.path().join("other.wav");
    let settings = dir.path().join("settings.json");
    let out = dir.path().join("out.wav");
    write_constant_wav(&main, 0.5, 2048);
    write_constant_wav(&other, 0.5, 2048);
    std::fs::write(
        &settings,
        r#"{"main_track": 1, "output_format": {"channels": 2}, "tracks": {"0": {"is_muted": true}}}"#,
    )
    .expect("settings");

    trackmix()
        .arg("mix")
        .arg(&main)
        .arg(&other)
        .arg("--out")
        .arg(&out)
        .arg("--settings")
        .arg(&settings)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let mut reader = WavReader::open(&out).expect("output wav");
    assert_eq!(reader.spec().channels, 2);
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.expect("sample")).collect();
    assert_eq!(samples.len(), 2048 * 2);
    assert!(samples.iter().all(|&s| s == 0.5));
}

#[test]
fn mix_rejects_missing_main_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let only = dir.path().join("only.wav");
    write_constant_wav(&only, 0.1, 64);

    trackmix()
        .arg("mix")
        .arg(&only)
        .arg("--out")
        .arg(dir.path().join("out.wav"))
        .args(["--main", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("main track 3"));
}
