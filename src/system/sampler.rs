use super::battery::{BatteryProbe, Unsupported};
use super::collector::{Collector, Strategy, storage_used_kb};
use super::delta::{DeltaSample, SamplingState};
use super::filter::PackagePathTable;
use super::snapshot::SYSTEM_ID;
use crate::device::Transport;

#[derive(Clone, Debug, PartialEq)]
pub struct EntityReport {
    pub pid: String,
    pub name: String,
    pub sample: DeltaSample,
}

/// Everything derived in one iteration: the system row plus one row per
/// application that has two samples behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub system: DeltaSample,
    pub entities: Vec<EntityReport>,
}

/// Outcome of one scheduler iteration, handed to the output sink.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport {
    pub iteration: i64,
    pub elapsed_secs: f64,
    pub frame: Option<Frame>,
}

/// One sampling pass: capture, derive, then resolve per-app storage.
pub struct Sampler<T, B = Unsupported> {
    collector: Collector<T>,
    packages: PackagePathTable,
    battery: B,
}

impl<T: Transport> Sampler<T> {
    pub fn new(collector: Collector<T>, packages: PackagePathTable) -> Self {
        Sampler {
            collector,
            packages,
            battery: Unsupported,
        }
    }
}

impl<T: Transport, B: BatteryProbe> Sampler<T, B> {
    pub fn with_battery<C: BatteryProbe>(self, battery: C) -> Sampler<T, C> {
        Sampler {
            collector: self.collector,
            packages: self.packages,
            battery,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.collector.strategy()
    }

    /// Storage lookups run one after another; iteration latency grows with
    /// the number of apps.
    pub async fn sample(&self, state: &mut SamplingState) -> Option<Frame> {
        let snapshot = self.collector.capture().await;
        let derived = state.advance(&snapshot)?;
        let storage = derived.system.storage;

        let mut entities = Vec::with_capacity(derived.entities.len());
        for entity in derived.entities {
            let rom_kb = match self.packages.data_dir(&entity.name) {
                Some(dir) => storage_used_kb(self.collector.transport(), dir).await,
                None => 0,
            };
            let sample = entity.sample(rom_kb, &storage, self.battery.drain(&entity.pid));
            entities.push(EntityReport {
                pid: entity.pid,
                name: entity.name,
                sample,
            });
        }

        Some(Frame {
            system: derived.system.sample(self.battery.drain(SYSTEM_ID)),
            entities,
        })
    }
}
