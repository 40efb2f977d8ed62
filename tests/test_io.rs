mod common;
use common::task_unit;
use spikeqc::io::{load_unit, read_f64, save_unit, write_report, StWriter};
use spikeqc::{QcConfig, QcRequest, QualityController};

#[test]
fn unit_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("u42.safetensors");
    let unit = task_unit(true);
    save_unit(&unit, &path).unwrap();

    let back = load_unit(&path).unwrap();
    assert_eq!(back.name, "u42");
    assert_eq!(back.spikes().times, unit.spikes().times);
    assert_eq!(back.spikes().waveforms, unit.spikes().waveforms);
    assert_eq!(back.trials().starts, unit.trials().starts);
    let names: Vec<&str> = back.periods().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["S1", "baseline"]);
    assert_eq!(back.period("S1").unwrap().stops, unit.period("S1").unwrap().stops);
}

#[test]
fn report_holds_metrics_and_masks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.safetensors");
    let mut unit = task_unit(true);
    let out = QualityController::new(QcConfig::default())
        .run(&mut unit, QcRequest::default())
        .unwrap();
    write_report(&out, &path).unwrap();

    let snr = read_f64(&path, "snr").unwrap();
    assert_eq!(snr, vec![out.metrics.snr]);
    let n = read_f64(&path, "n_trials_included").unwrap();
    assert_eq!(n, vec![60.0]);
    let rate_t = read_f64(&path, "rate_t").unwrap();
    assert_eq!(rate_t, out.trace.rate_t);
    // Masks are BOOL tensors, not readable as floats.
    assert!(read_f64(&path, "tr_inc").is_err());
}

#[test]
fn missing_tensor_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.safetensors");
    let mut w = StWriter::new();
    w.add_f64("spike_times", &[0.1, 0.2], &[2]);
    w.write(&path).unwrap();

    let err = load_unit(&path).unwrap_err();
    assert!(format!("{err:#}").contains("waveforms"), "{err:#}");
}

#[test]
fn mismatched_lengths_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mismatch.safetensors");
    let mut w = StWriter::new();
    w.add_f64("spike_times", &[0.1, 0.2, 0.3], &[3]);
    w.add_f64("waveforms", &[0.0; 8], &[2, 4]);
    w.add_f64("wave_time", &[0.0, 1.0, 2.0, 3.0], &[4]);
    w.add_f64("trial_starts", &[0.0], &[1]);
    w.add_f64("trial_stops", &[1.0], &[1]);
    w.write(&path).unwrap();

    let err = load_unit(&path).unwrap_err();
    assert!(err.downcast_ref::<spikeqc::QcError>().is_some(), "{err:#}");
}
