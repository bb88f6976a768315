#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use droidmon::device::Transport;
use droidmon::error::DeviceError;
use tokio::time::Instant;

/// Per-round tick increments of the aggregate `cpu ` line: 10% user share of
/// 100 ticks.
pub const CPU_STEP: (u64, u64, u64, u64) = (10, 0, 5, 85);

pub const MEMINFO: &str = "MemTotal:        4096000 kB\nMemFree:         1024000 kB\nMemAvailable:    2048000 kB\n";
pub const DISKSTATS: &str = "Latency: 2ms [512B Data Write]\nData-Free: 5120K / 20480K total = 25% free\nSystem-Free: 100K / 1000K total = 10% free\n";

#[derive(Clone, Debug)]
pub struct FakeProcess {
    pub pid: String,
    pub name: String,
    pub utime_step: u64,
    pub stime_step: u64,
    pub rss_pages: u64,
    /// First round the pid shows up in `ls /proc`.
    pub from_round: usize,
    /// First round the pid is gone again.
    pub until_round: Option<usize>,
}

impl FakeProcess {
    pub fn new(pid: &str, name: &str, utime_step: u64, stime_step: u64, rss_pages: u64) -> Self {
        FakeProcess {
            pid: pid.to_string(),
            name: name.to_string(),
            utime_step,
            stime_step,
            rss_pages,
            from_round: 0,
            until_round: None,
        }
    }

    pub fn appearing_at(mut self, round: usize) -> Self {
        self.from_round = round;
        self
    }

    pub fn gone_at(mut self, round: usize) -> Self {
        self.until_round = Some(round);
        self
    }

    fn alive(&self, round: usize) -> bool {
        round >= self.from_round && self.until_round.is_none_or(|until| round < until)
    }
}

#[derive(Default)]
struct Model {
    processes: BTreeMap<String, FakeProcess>,
    data_dirs: Vec<(String, String)>,
    du: HashMap<String, u64>,
    top_output: String,
    latency: Duration,
    offline: bool,
    /// Bumped on every `ls /proc`; counters are a pure function of it.
    rounds: usize,
    commands: Vec<String>,
    meminfo_reads: Vec<Instant>,
}

impl Model {
    fn round(&self) -> usize {
        self.rounds.saturating_sub(1)
    }

    fn stat_line(&self) -> String {
        let r = self.round() as u64;
        let (user, nice, system, idle) = CPU_STEP;
        format!(
            "cpu  {} {} {} {} 0 0 0 0 0 0\ncpu0 0 0 0 0 0 0 0 0 0 0\nintr 0\n",
            1000 + user * r,
            nice * r,
            500 + system * r,
            8500 + idle * r
        )
    }

    fn pid_stat(&self, process: &FakeProcess) -> String {
        let r = self.round() as u64;
        format!(
            "{pid} ({name}) S 1 1 0 0 -1 4194560 0 0 0 0 {utime} {stime} 0 0 20 0 12 0 100 1500000000 {rss} 18446744073709551615",
            pid = process.pid,
            name = process.name,
            utime = 5 + process.utime_step * r,
            stime = 2 + process.stime_step * r,
            rss = process.rss_pages,
        )
    }

    fn package_dump(&self) -> String {
        let mut out = String::from("Packages:\n");
        for (name, dir) in &self.data_dirs {
            out.push_str(&format!(
                "  Package [{name}] (1a2b3c):\n    userId=10001\n    codePath=/data/app/{name}-1\n    dataDir={dir}\n    flags=[ HAS_CODE ALLOW_CLEAR_USER_DATA ]\n"
            ));
        }
        out
    }

    fn respond(&mut self, command: &str) -> Result<String, DeviceError> {
        self.commands.push(command.to_string());
        if self.offline {
            return Err(DeviceError::CommandFailed {
                command: command.to_string(),
                stderr: "error: device offline".to_string(),
            });
        }
        match command {
            "cat /proc/meminfo" => {
                self.meminfo_reads.push(Instant::now());
                return Ok(MEMINFO.to_string());
            }
            "dumpsys diskstats" => return Ok(DISKSTATS.to_string()),
            "ls /proc" => {
                self.rounds += 1;
                let round = self.round();
                let mut out = String::from("1\n2\nacpi\nbuddyinfo\n");
                for process in self.processes.values().filter(|p| p.alive(round)) {
                    out.push_str(&process.pid);
                    out.push('\n');
                }
                out.push_str("self\nversion\n");
                return Ok(out);
            }
            "cat /proc/stat" => return Ok(self.stat_line()),
            _ => {}
        }

        if let Some(rest) = command.strip_prefix("cat /proc/") {
            let round = self.round();
            let (pid, file) = rest.split_once('/').unwrap_or((rest, ""));
            if let Some(process) = self.processes.get(pid).filter(|p| p.alive(round)) {
                return match file {
                    "cmdline" => Ok(format!("{}\0", process.name)),
                    "stat" => Ok(self.pid_stat(process)),
                    _ => Err(failed(command)),
                };
            }
            return Err(failed(command));
        }
        if let Some(path) = command.strip_prefix("du -s ") {
            return match self.du.get(path) {
                Some(kb) => Ok(format!("{kb}\t{path}\n")),
                None => Err(failed(command)),
            };
        }
        if command == "which top" {
            return Ok(if self.top_output.is_empty() {
                String::new()
            } else {
                "/system/bin/top\n".to_string()
            });
        }
        Err(failed(command))
    }
}

fn failed(command: &str) -> DeviceError {
    DeviceError::CommandFailed {
        command: command.to_string(),
        stderr: "No such file or directory".to_string(),
    }
}

/// Scripted in-memory device. Every `ls /proc` starts a new round; CPU
/// counters grow by a fixed step per round.
#[derive(Clone, Default)]
pub struct FakeDevice {
    model: Rc<RefCell<Model>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, process: FakeProcess) -> Self {
        self.model
            .borrow_mut()
            .processes
            .insert(process.pid.clone(), process);
        self
    }

    /// Installed package with a data directory of `kb` kilobytes.
    pub fn with_package(self, name: &str, kb: u64) -> Self {
        let dir = format!("/data/user/0/{name}");
        {
            let mut model = self.model.borrow_mut();
            model.du.insert(dir.clone(), kb);
            model.data_dirs.push((name.to_string(), dir));
        }
        self
    }

    pub fn with_top_output(self, output: &str) -> Self {
        self.model.borrow_mut().top_output = output.to_string();
        self
    }

    /// Every command takes this long to answer.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.model.borrow_mut().latency = latency;
        self
    }

    /// Every command fails as if the device dropped off the bus.
    pub fn offline(self) -> Self {
        self.model.borrow_mut().offline = true;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.model.borrow().commands.clone()
    }

    /// When each iteration started, taken from its first device read.
    pub fn iteration_starts(&self) -> Vec<Instant> {
        self.model.borrow().meminfo_reads.clone()
    }

    async fn delay(&self) {
        let latency = self.model.borrow().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Transport for FakeDevice {
    async fn shell(&self, command: &str) -> Result<String, DeviceError> {
        self.delay().await;
        self.model.borrow_mut().respond(command)
    }

    async fn stream_shell<F>(&self, command: &str, mut on_line: F) -> Result<(), DeviceError>
    where
        F: FnMut(&str),
    {
        self.delay().await;
        let output = {
            let mut model = self.model.borrow_mut();
            model.commands.push(command.to_string());
            if command == "dumpsys package -f p" {
                model.package_dump()
            } else if command.starts_with("top ") {
                model.top_output.clone()
            } else {
                return Err(failed(command));
            }
        };
        output.lines().for_each(&mut on_line);
        Ok(())
    }
}
