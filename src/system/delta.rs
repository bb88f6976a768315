//! Turns pairs of cumulative-counter snapshots into utilization figures.
//!
//! Every entity is bootstrapped: the first time a pid is seen its counters
//! are only remembered, and a sample comes out the next time it is seen.
//! A pid that comes back under a different name counts as a new entity.
//! Percentages are fractions in `[0, 1]` of the system totals of the current
//! snapshot.

use std::collections::HashMap;

use super::snapshot::{CpuCounter, CpuTimes, MemoryTotals, Snapshot, StorageTotals, SystemCpu};

/// Metrics for one entity at one iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeltaSample {
    pub cpu: f64,
    pub ram_p: f64,
    pub ram_mb: f64,
    pub rom_p: f64,
    pub rom_mb: f64,
    pub battery: f64,
}

/// Share of CPU time spent in user and nice between two snapshots.
pub fn system_cpu_fraction(prev: &CpuTimes, curr: &CpuTimes) -> Option<f64> {
    let total = total_delta_time(prev, curr);
    if total == 0 {
        return None;
    }
    let user = curr.user.saturating_sub(prev.user) + curr.nice.saturating_sub(prev.nice);
    Some(user as f64 / total as f64)
}

/// System-wide tick delta across user, nice, system and idle.
pub fn total_delta_time(prev: &CpuTimes, curr: &CpuTimes) -> u64 {
    curr.user.saturating_sub(prev.user)
        + curr.nice.saturating_sub(prev.nice)
        + curr.system.saturating_sub(prev.system)
        + curr.idle.saturating_sub(prev.idle)
}

/// Share of the system tick delta consumed by one process (utime + stime).
pub fn process_cpu_fraction(prev_ticks: u64, curr_ticks: u64, total_delta: u64) -> Option<f64> {
    if total_delta == 0 {
        return None;
    }
    Some(curr_ticks.saturating_sub(prev_ticks) as f64 / total_delta as f64)
}

pub fn memory_fraction(resident_kb: u64, total_kb: u64) -> Option<f64> {
    ratio(resident_kb, total_kb)
}

pub fn storage_fraction(used_kb: u64, total_kb: u64) -> Option<f64> {
    ratio(used_kb, total_kb)
}

pub fn kb_to_mb(kb: u64) -> f64 {
    kb as f64 / 1024.0
}

/// Integer percent shown in the live table.
pub fn display_percent(fraction: f64) -> u32 {
    (fraction * 100.0).round().max(0.0) as u32
}

fn ratio(part: u64, whole: u64) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SystemDelta {
    pub cpu: f64,
    pub memory: MemoryTotals,
    pub storage: StorageTotals,
}

impl SystemDelta {
    /// System row: used/total shares and total sizes.
    pub fn sample(&self, battery: f64) -> DeltaSample {
        DeltaSample {
            cpu: self.cpu,
            ram_p: memory_fraction(self.memory.used_kb(), self.memory.total_kb).unwrap_or_default(),
            ram_mb: kb_to_mb(self.memory.total_kb),
            rom_p: storage_fraction(self.storage.used_kb(), self.storage.total_kb)
                .unwrap_or_default(),
            rom_mb: kb_to_mb(self.storage.total_kb),
            battery,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityDelta {
    pub pid: String,
    pub name: String,
    pub cpu: f64,
    pub resident_kb: u64,
    pub ram_fraction: f64,
}

impl EntityDelta {
    pub fn sample(&self, rom_kb: u64, storage: &StorageTotals, battery: f64) -> DeltaSample {
        DeltaSample {
            cpu: self.cpu,
            ram_p: self.ram_fraction,
            ram_mb: kb_to_mb(self.resident_kb),
            rom_p: storage_fraction(rom_kb, storage.total_kb).unwrap_or_default(),
            rom_mb: kb_to_mb(rom_kb),
            battery,
        }
    }
}

/// Output of one iteration that had usable data.
#[derive(Clone, Debug, PartialEq)]
pub struct Derived {
    pub system: SystemDelta,
    pub entities: Vec<EntityDelta>,
}

/// Previous-sample cache carried from one iteration to the next.
#[derive(Debug, Default)]
pub struct SamplingState {
    prev_cpu: Option<CpuTimes>,
    /// Last (name, utime + stime) seen per pid.
    prev_ticks: HashMap<String, (String, u64)>,
}

impl SamplingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pid has counters waiting for a second observation.
    pub fn is_seeded(&self, pid: &str) -> bool {
        self.prev_ticks.contains_key(pid)
    }

    /// Fold `snapshot` into the cache and derive what the pair allows.
    ///
    /// Returns `None` for an iteration without usable data: a failed system
    /// read, the bootstrap pass, a zero tick delta, or zero memory or storage
    /// totals. The cache is advanced in every case except a failed system read.
    pub fn advance(&mut self, snapshot: &Snapshot) -> Option<Derived> {
        let mut total_delta = None;
        let system_cpu = match snapshot.system.cpu? {
            SystemCpu::Counters(curr) => self.prev_cpu.replace(curr).and_then(|prev| {
                total_delta = Some(total_delta_time(&prev, &curr));
                system_cpu_fraction(&prev, &curr)
            }),
            SystemCpu::Sampled(fraction) => Some(fraction),
        };

        let memory_total = snapshot.system.memory.total_kb;
        let mut seen = HashMap::with_capacity(snapshot.entities.len());
        let mut entities = Vec::new();

        for (pid, counters) in &snapshot.entities {
            let cpu = match counters.cpu {
                CpuCounter::Ticks { utime, stime } => {
                    let ticks = utime + stime;
                    seen.insert(pid.clone(), (counters.name.clone(), ticks));
                    match (self.prev_ticks.get(pid), total_delta) {
                        (Some((name, prev)), Some(total)) if *name == counters.name => {
                            process_cpu_fraction(*prev, ticks, total)
                        }
                        _ => None,
                    }
                }
                CpuCounter::Sampled(fraction) => Some(fraction),
            };

            let Some(cpu) = cpu else { continue };
            if counters.resident_kb == 0 {
                continue;
            }
            let Some(ram_fraction) = memory_fraction(counters.resident_kb, memory_total) else {
                continue;
            };
            entities.push(EntityDelta {
                pid: pid.clone(),
                name: counters.name.clone(),
                cpu,
                resident_kb: counters.resident_kb,
                ram_fraction,
            });
        }
        self.prev_ticks = seen;

        let cpu = system_cpu?;
        if memory_total == 0 || snapshot.system.storage.total_kb == 0 {
            return None;
        }
        Some(Derived {
            system: SystemDelta {
                cpu,
                memory: snapshot.system.memory,
                storage: snapshot.system.storage,
            },
            entities,
        })
    }
}
