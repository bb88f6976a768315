use std::collections::BTreeMap;
use std::path::Path;

use color_eyre::Result;
use serde::{Deserialize, Serialize};

use super::delta::DeltaSample;
use super::sampler::Frame;
use super::snapshot::{SYSTEM_ID, SYSTEM_NAME};

/// Samples of one entity as parallel arrays; index `i` is the entity's
/// `i`-th recorded iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub time: Vec<f64>,
    pub cpu: Vec<f64>,
    pub ram_p: Vec<f64>,
    pub ram_t: Vec<f64>,
    pub rom_p: Vec<f64>,
    pub rom_t: Vec<f64>,
    pub battery: Vec<f64>,
}

impl TimeSeries {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn push(&mut self, time: f64, sample: &DeltaSample) {
        self.time.push(time);
        self.cpu.push(round2(sample.cpu));
        self.ram_p.push(round2(sample.ram_p));
        self.ram_t.push(round2(sample.ram_mb));
        self.rom_p.push(round2(sample.rom_p));
        self.rom_t.push(round2(sample.rom_mb));
        self.battery.push(sample.battery);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Append-only store of every entity's series for the duration of a run.
/// Keys are entity ids; the system aggregate lives under `"0"`.
#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    entries: BTreeMap<String, TimeSeries>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample; the first sample for an id fixes its display name.
    pub fn record(&mut self, id: &str, name: &str, time: f64, sample: &DeltaSample) {
        self.entries
            .entry(id.to_string())
            .or_insert_with(|| TimeSeries::new(name))
            .push(time, sample);
    }

    pub fn record_frame(&mut self, time: f64, frame: &Frame) {
        self.record(SYSTEM_ID, SYSTEM_NAME, time, &frame.system);
        for entity in &frame.entities {
            self.record(&entity.pid, &entity.name, time, &entity.sample);
        }
    }

    pub fn get(&self, id: &str) -> Option<&TimeSeries> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact JSON object with keys in sorted order.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.entries)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<BTreeMap<String, TimeSeries>> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize and write the whole store with a single write call.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
