use serde::Deserialize;

use super::filter::AppFilter;
use super::procfs;
use super::snapshot::{
    CpuCounter, EntityCounters, MemoryTotals, Snapshot, StorageTotals, SystemCounters, SystemCpu,
    pages_to_kb,
};
use super::top::TopParser;
use crate::device::Transport;

const MEMINFO: &str = "cat /proc/meminfo";
const DISKSTATS: &str = "dumpsys diskstats";
const PROC_LIST: &str = "ls /proc";
const PROC_STAT: &str = "cat /proc/stat";

/// How raw counters are read from the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One `/proc` round trip per process. Slow but precise.
    #[default]
    Proc,
    /// Parse the device's `top` table. One call, but column-position fragile.
    Top,
}

impl Strategy {
    /// Enumeration needs a throwaway pass to seed the previous sample.
    pub fn needs_bootstrap(self) -> bool {
        matches!(self, Strategy::Proc)
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Proc => "proc",
            Strategy::Top => "top",
        }
    }
}

pub struct Collector<T> {
    transport: T,
    strategy: Strategy,
    filter: AppFilter,
    top_frames: u32,
    top_delay_secs: u32,
}

impl<T: Transport> Collector<T> {
    pub fn new(transport: T, strategy: Strategy, filter: AppFilter) -> Self {
        Collector {
            transport,
            strategy,
            filter,
            top_frames: 2,
            top_delay_secs: 1,
        }
    }

    pub fn with_top_timing(mut self, frames: u32, delay_secs: u32) -> Self {
        self.top_frames = frames.max(1);
        self.top_delay_secs = delay_secs;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Capture one snapshot. Reads that come back empty or fail leave the
    /// matching part of the snapshot empty; nothing here is fatal.
    #[tracing::instrument(name = "collector.capture", skip_all, fields(strategy = self.strategy.label()))]
    pub async fn capture(&self) -> Snapshot {
        let memory = self
            .read(MEMINFO)
            .await
            .and_then(|out| procfs::parse_meminfo(&out))
            .unwrap_or_default();
        let storage = self
            .read(DISKSTATS)
            .await
            .and_then(|out| procfs::parse_diskstats(&out))
            .unwrap_or_default();

        match self.strategy {
            Strategy::Proc => self.capture_proc(memory, storage).await,
            Strategy::Top => self.capture_top(memory, storage).await,
        }
    }

    async fn capture_proc(&self, memory: MemoryTotals, storage: StorageTotals) -> Snapshot {
        let pids = self
            .read(PROC_LIST)
            .await
            .map(|out| procfs::parse_pid_list(&out))
            .unwrap_or_default();
        let cpu = self
            .read(PROC_STAT)
            .await
            .and_then(|out| procfs::parse_cpu_times(&out))
            .map(SystemCpu::Counters);

        let mut snapshot = Snapshot {
            system: SystemCounters {
                cpu,
                memory,
                storage,
            },
            ..Snapshot::default()
        };

        for pid in pids {
            let Some(name) = self
                .read(&format!("cat /proc/{pid}/cmdline"))
                .await
                .map(|out| procfs::parse_cmdline(&out))
            else {
                continue;
            };
            if !self.filter.is_app(&name) {
                continue;
            }
            let Some(stat) = self
                .read(&format!("cat /proc/{pid}/stat"))
                .await
                .and_then(|out| procfs::parse_pid_stat(&out))
            else {
                continue;
            };
            snapshot.entities.insert(
                pid,
                EntityCounters {
                    name,
                    cpu: CpuCounter::Ticks {
                        utime: stat.utime,
                        stime: stat.stime,
                    },
                    resident_kb: pages_to_kb(stat.rss_pages),
                },
            );
        }

        tracing::debug!(apps = snapshot.entities.len(), "proc snapshot");
        snapshot
    }

    async fn capture_top(&self, memory: MemoryTotals, storage: StorageTotals) -> Snapshot {
        let command = format!("top -n {} -d {}", self.top_frames, self.top_delay_secs);
        let mut parser = TopParser::new(self.top_frames as usize, self.filter.clone());
        if let Err(err) = self
            .transport
            .stream_shell(&command, |line| parser.feed(line))
            .await
        {
            tracing::debug!(%err, "top read failed");
        }
        let table = parser.finish();

        let entities = table
            .rows
            .into_iter()
            .map(|row| {
                (
                    row.pid,
                    EntityCounters {
                        name: row.name,
                        cpu: CpuCounter::Sampled(f64::from(row.cpu_percent) / 100.0),
                        resident_kb: row.resident_kb,
                    },
                )
            })
            .collect();

        Snapshot {
            system: SystemCounters {
                cpu: table.user_fraction.map(SystemCpu::Sampled),
                memory,
                storage,
            },
            entities,
        }
    }

    async fn read(&self, command: &str) -> Option<String> {
        match self.transport.shell(command).await {
            Ok(out) if !out.trim().is_empty() => Some(out),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(%err, command, "device read failed");
                None
            }
        }
    }
}

/// `du -s` of `path` on the device, in kB. Failures read as zero usage.
pub async fn storage_used_kb<T: Transport>(transport: &T, path: &str) -> u64 {
    match transport.shell(&format!("du -s {path}")).await {
        Ok(out) => procfs::parse_du(&out).unwrap_or_default(),
        Err(err) => {
            tracing::debug!(%err, path, "du failed");
            0
        }
    }
}
