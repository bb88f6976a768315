//! Parsers for the text the enumeration strategy reads off the device.

use super::snapshot::{CpuTimes, MemoryTotals, StorageTotals};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PidStat {
    pub utime: u64,
    pub stime: u64,
    pub rss_pages: u64,
}

/// Numeric entries of an `ls /proc` listing.
pub fn parse_pid_list(output: &str) -> Vec<String> {
    output
        .split_whitespace()
        .filter(|entry| !entry.is_empty() && entry.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// The program name from `/proc/<pid>/cmdline`: first NUL-separated argument.
pub fn parse_cmdline(output: &str) -> String {
    output
        .split('\0')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Aggregate `cpu ` line of `/proc/stat`.
pub fn parse_cpu_times(output: &str) -> Option<CpuTimes> {
    let line = output.lines().find(|line| line.starts_with("cpu "))?;
    let mut fields = line.split_whitespace().skip(1).map(|v| v.parse::<u64>());
    Some(CpuTimes {
        user: fields.next()?.ok()?,
        nice: fields.next()?.ok()?,
        system: fields.next()?.ok()?,
        idle: fields.next()?.ok()?,
    })
}

/// `/proc/<pid>/stat`. The comm field may contain spaces and parens, so
/// fields are counted from the last `)`.
pub fn parse_pid_stat(output: &str) -> Option<PidStat> {
    let after_comm = output.rfind(')')? + 1;
    let fields: Vec<&str> = output[after_comm..].split_whitespace().collect();
    // state(0) ppid(1) pgrp(2) session(3) tty_nr(4) tpgid(5) flags(6)
    // minflt(7) cminflt(8) majflt(9) cmajflt(10) utime(11) stime(12)
    // cutime(13) cstime(14) priority(15) nice(16) num_threads(17)
    // itrealvalue(18) starttime(19) vsize(20) rss(21)
    Some(PidStat {
        utime: fields.get(11)?.parse().ok()?,
        stime: fields.get(12)?.parse().ok()?,
        rss_pages: fields.get(21)?.parse().ok()?,
    })
}

pub fn parse_meminfo(output: &str) -> Option<MemoryTotals> {
    let mut total_kb = None;
    let mut free_kb = None;
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("MemTotal:") => total_kb = parts.next().and_then(|v| v.parse().ok()),
            Some("MemFree:") => free_kb = parts.next().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }
    Some(MemoryTotals {
        total_kb: total_kb?,
        free_kb: free_kb?,
    })
}

/// `Data-Free: 5120K / 20480K total = 25% free` from `dumpsys diskstats`.
pub fn parse_diskstats(output: &str) -> Option<StorageTotals> {
    let line = output.lines().find(|line| line.starts_with("Data-Free:"))?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    Some(StorageTotals {
        free_kb: parse_kilobytes(fields.get(1)?)?,
        total_kb: parse_kilobytes(fields.get(3)?)?,
    })
}

/// First column of `du -s <path>`, in kB.
pub fn parse_du(output: &str) -> Option<u64> {
    output.split_whitespace().next()?.parse().ok()
}

fn parse_kilobytes(field: &str) -> Option<u64> {
    field.trim_end_matches('K').parse().ok()
}
