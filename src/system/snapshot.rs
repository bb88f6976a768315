use std::collections::BTreeMap;

/// Memory page size on the device, in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// Entity id of the synthetic system-wide aggregate.
pub const SYSTEM_ID: &str = "0";
pub const SYSTEM_NAME: &str = "System";

pub fn pages_to_kb(pages: u64) -> u64 {
    pages * PAGE_SIZE / 1024
}

/// Cumulative system CPU time, in clock ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
}

impl CpuTimes {
    pub fn new(user: u64, nice: u64, system: u64, idle: u64) -> Self {
        Self {
            user,
            nice,
            system,
            idle,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryTotals {
    pub total_kb: u64,
    pub free_kb: u64,
}

impl MemoryTotals {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.free_kb)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageTotals {
    pub total_kb: u64,
    pub free_kb: u64,
}

impl StorageTotals {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.free_kb)
    }
}

/// System CPU as captured by one of the two strategies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SystemCpu {
    /// Raw counters from `/proc/stat`; needs a previous sample to mean anything.
    Counters(CpuTimes),
    /// User share already computed by the live monitor, as a fraction.
    Sampled(f64),
}

/// Per-process CPU as captured by one of the two strategies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CpuCounter {
    Ticks { utime: u64, stime: u64 },
    Sampled(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityCounters {
    pub name: String,
    pub cpu: CpuCounter,
    pub resident_kb: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SystemCounters {
    pub cpu: Option<SystemCpu>,
    pub memory: MemoryTotals,
    pub storage: StorageTotals,
}

/// One point-in-time capture. Entities are keyed by pid and already
/// filtered down to applications.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub system: SystemCounters,
    pub entities: BTreeMap<String, EntityCounters>,
}
