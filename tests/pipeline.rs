use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use rusty_marks::assembler::{Assembler, build_dataset};
use rusty_marks::config::{ChannelPolicy, PipelineConfig};
use rusty_marks::data::{loader, writer};
use rusty_marks::error::PipelineError;
use tempfile::{TempDir, tempdir};

fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).expect("create wav");
    for i in 0..frames {
        let value = ((i as f32 * 0.03).sin() * 8000.0) as i16;
        for _ in 0..channels {
            writer.write_sample(value).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
}

fn write_pair(dir: &Path, id: &str, sample_rate: u32, frames: usize, marks: &str) {
    write_wav(&dir.join(format!("{id}.wav")), sample_rate, 1, frames);
    std::fs::write(dir.join(format!("{id}.txt")), marks).expect("write marks");
}

fn active_span(mask: &[u8]) -> (usize, usize) {
    let first = mask.iter().position(|&v| v == 1).expect("no active sample");
    let last = mask.iter().rposition(|&v| v == 1).expect("no active sample");
    (first, last)
}

fn config_for(dir: &TempDir, target_sr: u32) -> PipelineConfig {
    PipelineConfig {
        data_dir: dir.path().to_path_buf(),
        output: dir.path().join("data.parquet"),
        target_sr,
        ..PipelineConfig::default()
    }
}

#[test]
fn builds_aligned_records_at_target_rate() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "b", 16000, 16000, "0.0\t0.5\n");
    write_pair(dir.path(), "a", 16000, 8000, "0.1\t0.2\n0.15\t0.3\n");

    let dataset = build_dataset(config_for(&dir, 8000)).expect("build dataset");
    let ids: Vec<&str> = dataset.identifiers().collect();
    assert_eq!(ids, vec!["a", "b"]);

    let b = dataset.get("b").expect("record b");
    assert_eq!(b.sample_rate, 8000);
    assert_eq!(b.audio.len(), 8000);
    assert_eq!(b.mask.len(), 8000);
    assert_eq!(b.durations_s, vec![0.5]);
    assert!((b.active_samples() as i64 - 4000).abs() <= 2);
    let (first, last) = active_span(&b.mask);
    assert_eq!(first, 0);
    assert!(last.abs_diff(3999) <= 1, "last active sample at {last}");
    assert_eq!(b.mask[100], 1);
    assert_eq!(b.mask[6000], 0);

    let a = dataset.get("a").expect("record a");
    assert_eq!(a.audio.len(), 4000);
    assert_eq!(a.durations_s.len(), 2);
    // union of [0.1, 0.3) s at 8 kHz
    assert!((a.active_samples() as i64 - 1600).abs() <= 2);
    let (first, last) = active_span(&a.mask);
    assert!(first.abs_diff(800) <= 1, "first active sample at {first}");
    assert!(last.abs_diff(2399) <= 1, "last active sample at {last}");
}

#[test]
fn annotation_beyond_audio_produces_empty_mask() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "late", 8000, 8000, "1.0\t2.0\n");

    let dataset = build_dataset(config_for(&dir, 8000)).expect("build dataset");
    let rec = dataset.get("late").expect("record");
    assert_eq!(rec.mask.len(), 8000);
    assert_eq!(rec.active_samples(), 0);
    assert_eq!(rec.durations_s, vec![1.0]);
}

#[test]
fn mismatched_rates_abort_when_enforced() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "a", 16000, 1600, "");
    write_pair(dir.path(), "b", 22050, 2205, "");

    let err = build_dataset(config_for(&dir, 8000)).unwrap_err();
    assert!(matches!(err, PipelineError::Consistency(_)));
}

#[test]
fn mismatched_rates_use_first_as_nominal_when_allowed() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "a", 16000, 16000, "0.0\t0.25\n");
    write_pair(dir.path(), "b", 32000, 32000, "0.0\t0.25\n");

    let mut config = config_for(&dir, 8000);
    config.require_consistent_rate = false;
    let assembler = Assembler::new(
        config.clone(),
        rusty_marks::data::source::discover_pairs(dir.path()).expect("discover"),
    )
    .expect("assembler");
    assert_eq!(assembler.source_sr(), 16000);

    let dataset = assembler.run().expect("run");
    let b = dataset.get("b").expect("record b");
    assert_eq!(b.audio.len(), 8000);
    assert!((b.active_samples() as i64 - 2000).abs() <= 2);
}

#[test]
fn unreadable_audio_fails_the_whole_run() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "a", 8000, 800, "");
    std::fs::write(dir.path().join("b.wav"), b"garbage").expect("write");
    std::fs::write(dir.path().join("b.txt"), "").expect("write");

    let err = build_dataset(config_for(&dir, 8000)).unwrap_err();
    match err {
        PipelineError::DataAccess { path, .. } => assert!(path.ends_with("b.wav")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_annotation_fails_with_file_name() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "a", 8000, 800, "0.0\tlater\n");

    let err = build_dataset(config_for(&dir, 8000)).unwrap_err();
    assert!(err.to_string().contains("a.txt"));
}

#[test]
fn downmix_policy_is_applied() {
    let dir = tempdir().expect("tempdir");
    write_wav(&dir.path().join("st.wav"), 8000, 2, 800);
    std::fs::write(dir.path().join("st.txt"), "0.0\t0.05\n").expect("write");

    let mut config = config_for(&dir, 8000);
    config.channel_policy = ChannelPolicy::Downmix;
    let dataset = build_dataset(config).expect("build dataset");
    let rec = dataset.get("st").expect("record");
    assert_eq!(rec.audio.len(), 800);
    assert_eq!(rec.active_samples(), 400);
}

#[test]
fn step_wise_run_can_resume_from_saved_table() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "a", 16000, 1600, "0.0\t0.05\n");
    write_pair(dir.path(), "b", 16000, 1600, "0.05\t0.1\n");
    let config = config_for(&dir, 8000);

    let mut first = Assembler::from_config(config.clone()).expect("assembler");
    assert_eq!(first.pending(), 2);
    let done = first.step().expect("step").expect("record").identifier.clone();
    assert_eq!(done, "a");
    assert_eq!(first.pending(), 1);

    let partial = config.output.with_extension("json");
    writer::save_file(first.dataset(), &partial).expect("save partial");

    let prior = loader::load_file(&partial).expect("load partial");
    let resumed = Assembler::from_config(config.clone())
        .expect("assembler")
        .resume_from(prior)
        .expect("resume");
    assert_eq!(resumed.pending(), 1);

    let dataset = resumed.run().expect("run");
    assert_eq!(dataset.identifiers().collect::<Vec<_>>(), vec!["a", "b"]);

    writer::save_file(&dataset, &config.output).expect("save parquet");
    let reloaded = loader::load_file(&config.output).expect("reload");
    assert_eq!(reloaded, dataset);
}

#[test]
fn resume_rejects_records_at_another_rate() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "a", 16000, 1600, "");

    let prior = build_dataset(config_for(&dir, 4000)).expect("build dataset");
    let err = Assembler::from_config(config_for(&dir, 8000))
        .expect("assembler")
        .resume_from(prior)
        .err()
        .expect("should fail");
    assert!(matches!(err, PipelineError::Consistency(_)));
}

#[test]
fn failed_run_keeps_finished_records_for_a_checkpoint() {
    let dir = tempdir().expect("tempdir");
    write_pair(dir.path(), "a", 16000, 1600, "0.0\t0.05\n");
    write_pair(dir.path(), "b", 16000, 1600, "0.05\tsoon\n");
    write_pair(dir.path(), "c", 16000, 1600, "");
    let config = config_for(&dir, 8000);

    let mut first = Assembler::from_config(config.clone()).expect("assembler");
    let err = first.drain().unwrap_err();
    assert!(err.to_string().contains("b.txt"), "{err}");
    assert_eq!(first.dataset().identifiers().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(first.pending(), 2);

    let checkpoint = config.checkpoint_path();
    assert_ne!(checkpoint, config.output);
    writer::save_file(first.dataset(), &checkpoint).expect("save checkpoint");
    assert!(!config.output.exists());

    std::fs::write(dir.path().join("b.txt"), "0.05\t0.1\n").expect("fix marks");
    let prior = loader::load_file(&checkpoint).expect("load checkpoint");
    let resumed = Assembler::from_config(config.clone())
        .expect("assembler")
        .resume_from(prior)
        .expect("resume");
    assert_eq!(resumed.pending(), 2);

    let dataset = resumed.run().expect("run");
    assert_eq!(dataset.identifiers().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}
