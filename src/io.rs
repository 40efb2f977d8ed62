//! Safetensors I/O for units and QC reports.
//!
//! Unit file layout (`F32` or `F64` tensors):
//!
//! | key | shape |
//! |---|---|
//! | `spike_times` | `[N]` |
//! | `waveforms` | `[N, S]` |
//! | `wave_time` | `[S]` |
//! | `trial_starts`, `trial_stops` | `[T]` |
//! | `period_<name>` (optional, any number) | `[T, 2]` start/stop |
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};
use std::collections::HashMap;
use std::path::Path;

use crate::controller::QcOutcome;
use crate::unit::{TrialPeriod, Unit};

// ── Low-level safetensors parser ──────────────────────────────────────────────

type Header = HashMap<String, serde_json::Value>;

fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    if bytes.len() < 8 + n {
        bail!("safetensors header truncated ({n} bytes announced)");
    }
    let mut header: Header = serde_json::from_slice(&bytes[8..8 + n])
        .context("failed to parse safetensors header")?;
    header.remove("__metadata__");
    Ok((header, 8 + n))
}

/// One tensor queued for writing.
struct Tensor {
    name: String,
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Length-prefixed JSON header for `tensors` laid out back to back, the
/// inverse of [`parse_header`].  The JSON is space-padded so the data
/// section starts 8-byte aligned.
fn encode_header(tensors: &[Tensor]) -> Result<Vec<u8>> {
    let mut header = serde_json::Map::new();
    let mut offset = 0usize;
    for t in tensors {
        let end = offset + t.bytes.len();
        header.insert(
            t.name.clone(),
            serde_json::json!({ "dtype": t.dtype, "shape": t.shape, "data_offsets": [offset, end] }),
        );
        offset = end;
    }
    let mut json = serde_json::to_vec(&header).context("failed to encode safetensors header")?;
    json.resize(json.len().next_multiple_of(8), b' ');

    let mut out = Vec::with_capacity(8 + json.len());
    out.extend_from_slice(&(json.len() as u64).to_le_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

fn shape_of(name: &str, entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .with_context(|| format!("'{name}': missing shape"))?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).with_context(|| format!("'{name}': bad shape")))
        .collect()
}

/// Decode tensor `name` as `f64`, whatever its float width.
fn read_tensor(bytes: &[u8], data_start: usize, header: &Header, name: &str) -> Result<(Vec<f64>, Vec<usize>)> {
    let entry = header.get(name).with_context(|| format!("missing '{name}' key"))?;
    let shape = shape_of(name, entry)?;
    let offsets = entry["data_offsets"]
        .as_array()
        .with_context(|| format!("'{name}': missing data_offsets"))?;
    let (s, e) = match offsets.as_slice() {
        [s, e] => (
            s.as_u64().context("bad offset")? as usize,
            e.as_u64().context("bad offset")? as usize,
        ),
        _ => bail!("'{name}': data_offsets must hold two values"),
    };
    let raw = bytes
        .get(data_start + s..data_start + e)
        .with_context(|| format!("'{name}': data out of bounds"))?;

    let data: Vec<f64> = match entry["dtype"].as_str() {
        Some("F32") => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        Some("F64") => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        other => bail!("'{name}': unsupported dtype {other:?}"),
    };
    let n: usize = shape.iter().product();
    if data.len() != n {
        bail!("'{name}': {} values for shape {shape:?}", data.len());
    }
    Ok((data, shape))
}

// ── Unit loader ───────────────────────────────────────────────────────────────

/// Load a unit from a safetensors file.  The unit is named after the file stem.
pub fn load_unit(path: &Path) -> Result<Unit> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;
    let get = |name: &str| read_tensor(&bytes, data_start, &header, name);

    let (spike_times, _) = get("spike_times")?;
    let (wf, wf_shape) = get("waveforms")?;
    let (wave_time, _) = get("wave_time")?;
    let (trial_starts, _) = get("trial_starts")?;
    let (trial_stops, _) = get("trial_stops")?;

    let waveforms = match wf_shape.as_slice() {
        [n, s] => Array2::from_shape_vec((*n, *s), wf)?,
        [0] => Array2::zeros((0, wave_time.len())),
        _ => bail!("'waveforms' must be 2-D, got shape {wf_shape:?}"),
    };

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut unit = Unit::new(name, spike_times, waveforms, Array1::from(wave_time), trial_starts, trial_stops)?;

    let mut period_keys: Vec<&String> = header.keys().filter(|k| k.starts_with("period_")).collect();
    period_keys.sort();
    for key in period_keys {
        let (data, shape) = get(key.as_str())?;
        if shape.len() != 2 || shape[1] != 2 {
            bail!("'{key}' must have shape [T, 2], got {shape:?}");
        }
        let period = TrialPeriod {
            name: key["period_".len()..].to_string(),
            starts: data.iter().step_by(2).copied().collect(),
            stops: data.iter().skip(1).step_by(2).copied().collect(),
        };
        unit = unit.with_period(period)?;
    }
    Ok(unit)
}

/// Write `unit` in the layout read by [`load_unit`].
pub fn save_unit(unit: &Unit, path: &Path) -> Result<()> {
    let spikes = unit.spikes();
    let trials = unit.trials();
    let mut w = StWriter::new();
    w.add_f64("spike_times", &spikes.times, &[spikes.len()]);
    let wf: Vec<f64> = spikes.waveforms.iter().copied().collect();
    w.add_f64("waveforms", &wf, &[spikes.waveforms.nrows(), spikes.waveforms.ncols()]);
    w.add_f64("wave_time", &spikes.wave_time.to_vec(), &[spikes.wave_time.len()]);
    w.add_f64("trial_starts", &trials.starts, &[trials.len()]);
    w.add_f64("trial_stops", &trials.stops, &[trials.len()]);
    for p in unit.periods() {
        let data: Vec<f64> = p.starts.iter().zip(&p.stops).flat_map(|(&a, &b)| [a, b]).collect();
        w.add_f64(&format!("period_{}", p.name), &data, &[p.starts.len(), 2]);
    }
    w.write(path)
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Minimal safetensors writer for `F64` and `BOOL` tensors.
///
/// ```rust,no_run
/// use spikeqc::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("snr", &[2.5], &[1]);
/// w.add_bool("tr_inc", &[true, false], &[2]);
/// w.write(Path::new("/tmp/report.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    tensors: Vec<Tensor>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: &str, dtype: &'static str, shape: &[usize], bytes: Vec<u8>) {
        self.tensors.push(Tensor { name: name.to_string(), dtype, shape: shape.to_vec(), bytes });
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        self.push(name, "F64", shape, data.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    pub fn add_scalar(&mut self, name: &str, v: f64) {
        self.add_f64(name, &[v], &[1]);
    }

    pub fn add_bool(&mut self, name: &str, data: &[bool], shape: &[usize]) {
        self.push(name, "BOOL", shape, data.iter().map(|&b| b as u8).collect());
    }

    /// Header and data as one buffer.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = encode_header(&self.tensors)?;
        for t in &self.tensors {
            out.extend_from_slice(&t.bytes);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }
}

// ── QC report ─────────────────────────────────────────────────────────────────

/// Write metrics, masks and binned rates of one QC pass.
///
/// Booleans and counts are stored as `F64` scalars; `unit_type` is `1` for a
/// single unit, `0` for a multi unit and `NaN` when unset.
pub fn write_report(outcome: &QcOutcome, path: &Path) -> Result<()> {
    let m = &outcome.metrics;
    let t = &outcome.trace;
    let mut w = StWriter::new();

    w.add_scalar("snr", m.snr);
    w.add_scalar("mean_wf_duration", m.mean_wf_duration);
    w.add_scalar("mean_wf_amplitude", m.mean_wf_amplitude);
    w.add_scalar("mean_rate", m.mean_rate);
    w.add_scalar("isi_violation", m.isi_violation);
    w.add_scalar("true_spikes", m.true_spikes);
    w.add_scalar("baseline_rate", m.baseline_rate);
    w.add_scalar(
        "unit_type",
        match m.unit_type {
            Some(crate::unit::UnitType::SingleUnit) => 1.0,
            Some(crate::unit::UnitType::MultiUnit) => 0.0,
            None => f64::NAN,
        },
    );
    w.add_scalar("task_related", m.task_related as u8 as f64);
    w.add_scalar("n_trials_total", m.n_trials_total as f64);
    w.add_scalar("n_trials_included", m.n_trials_included as f64);
    w.add_scalar("n_trials_excluded", m.n_trials_excluded as f64);
    w.add_scalar("excluded", m.excluded as u8 as f64);

    w.add_scalar("t1_inc", t.t1_inc);
    w.add_scalar("t2_inc", t.t2_inc);
    w.add_f64("tbin_vmid", &t.tbin_vmid, &[t.tbin_vmid.len()]);
    w.add_f64("rate_t", &t.rate_t, &[t.rate_t.len()]);
    w.add_bool("prd_inc", &t.prd_inc, &[t.prd_inc.len()]);
    w.add_bool("tr_inc", &t.tr_inc, &[t.tr_inc.len()]);
    w.add_bool("spk_inc", &t.spk_inc, &[t.spk_inc.len()]);

    w.write(path)
}

/// Read back a scalar or vector written with [`StWriter::add_f64`].
pub fn read_f64(path: &Path, name: &str) -> Result<Vec<f64>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;
    Ok(read_tensor(&bytes, data_start, &header, name)?.0)
}
