use std::time::Duration;

use color_eyre::Result;
use tokio::time::{Instant, sleep};

use crate::device::Transport;
use crate::event::Shutdown;
use crate::sink::Sink;
use crate::system::battery::{BatteryProbe, Unsupported};
use crate::system::delta::SamplingState;
use crate::system::sampler::{IterationReport, Sampler};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    RunTimeElapsed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Iterations handed to the sink, bootstrap included.
    pub iterations: u64,
    /// Iterations that produced a frame.
    pub frames: u64,
    pub reason: StopReason,
}

/// Drives sampling at a fixed cadence until interrupted or until the
/// configured run time has passed.
pub struct Scheduler<T, B = Unsupported> {
    sampler: Sampler<T, B>,
    interval: Duration,
    run_for: Option<Duration>,
    state: SamplingState,
    iteration: i64,
    loop_state: LoopState,
}

impl<T: Transport, B: BatteryProbe> Scheduler<T, B> {
    pub fn new(sampler: Sampler<T, B>, interval: Duration, run_for: Option<Duration>) -> Self {
        let iteration = if sampler.strategy().needs_bootstrap() {
            -1
        } else {
            0
        };
        Scheduler {
            sampler,
            interval,
            run_for,
            state: SamplingState::new(),
            iteration,
            loop_state: LoopState::Running,
        }
    }

    pub fn iteration(&self) -> i64 {
        self.iteration
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// Time stamp of the current iteration; negative during bootstrap.
    pub fn elapsed_secs(&self) -> f64 {
        self.iteration as f64 * self.interval.as_secs_f64()
    }

    /// Run until stopped. The shutdown flag is honoured at the top of each
    /// iteration and during the slack wait; an iteration in progress always
    /// completes, device calls included.
    pub async fn run<S: Sink>(
        &mut self,
        sink: &mut S,
        shutdown: &mut Shutdown,
    ) -> Result<RunSummary> {
        let mut iterations = 0;
        let mut frames = 0;

        let reason = loop {
            if shutdown.is_triggered() {
                break StopReason::Interrupted;
            }

            let started = Instant::now();
            let frame = self.sampler.sample(&mut self.state).await;
            if frame.is_some() {
                frames += 1;
            }
            let report = IterationReport {
                iteration: self.iteration,
                elapsed_secs: self.elapsed_secs(),
                frame,
            };
            sink.on_iteration(&report)?;
            iterations += 1;
            self.iteration += 1;

            if let Some(run_for) = self.run_for
                && exceeds_run_time(self.iteration, self.interval, run_for)
            {
                break StopReason::RunTimeElapsed;
            }

            let cost = started.elapsed();
            tracing::debug!(
                iteration = report.iteration,
                cost_ms = cost.as_millis() as u64,
                "iteration complete"
            );
            match self.interval.checked_sub(cost) {
                Some(slack) if !slack.is_zero() => {
                    tokio::select! {
                        _ = sleep(slack) => {}
                        _ = shutdown.triggered() => {}
                    }
                }
                _ => tracing::debug!(
                    iteration = report.iteration,
                    "iteration overran the interval"
                ),
            }
        };

        self.loop_state = LoopState::Stopped;
        tracing::info!(?reason, iterations, frames, "sampling stopped");
        Ok(RunSummary {
            iterations,
            frames,
            reason,
        })
    }
}

/// Whether `iteration` intervals have gone past `run_for`. Compared in
/// whole milliseconds.
pub fn exceeds_run_time(iteration: i64, interval: Duration, run_for: Duration) -> bool {
    let elapsed_ms = i128::from(iteration) * interval.as_millis() as i128;
    elapsed_ms > run_for.as_millis() as i128
}
