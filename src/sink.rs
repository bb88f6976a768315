use std::io::{Stdout, Write, stdout};
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::eyre;
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};

use crate::system::history::TimeSeriesStore;
use crate::system::sampler::IterationReport;
use crate::ui::{self, LiveView, table};

/// Receives every iteration the scheduler completes, then one `finish` after
/// the loop has stopped.
pub trait Sink {
    fn on_iteration(&mut self, report: &IterationReport) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Redraws the table on every iteration. The last frame stays on screen
/// while a bootstrap or empty iteration passes.
pub struct LiveSink<B: Backend> {
    terminal: Terminal<B>,
    lines: Vec<String>,
    spinner: usize,
    restore: bool,
}

impl LiveSink<CrosstermBackend<Stdout>> {
    /// Take over the terminal: alternate screen plus raw mode.
    pub fn init() -> Self {
        LiveSink {
            terminal: ratatui::init(),
            lines: Vec::new(),
            spinner: 0,
            restore: true,
        }
    }
}

impl<B: Backend> LiveSink<B> {
    pub fn with_terminal(terminal: Terminal<B>) -> Self {
        LiveSink {
            terminal,
            lines: Vec::new(),
            spinner: 0,
            restore: false,
        }
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }
}

impl<B: Backend> Sink for LiveSink<B> {
    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        if let Some(frame) = &report.frame {
            self.lines = table::table_lines(frame);
        }
        let view = LiveView {
            iteration: report.iteration,
            lines: &self.lines,
            spinner: table::SPINNER[self.spinner % table::SPINNER.len()],
        };
        self.spinner = self.spinner.wrapping_add(1);
        self.terminal
            .draw(|frame| ui::draw(frame, &view))
            .map_err(|e| eyre!("failed to draw live table: {e}"))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.restore {
            ratatui::restore();
            self.restore = false;
        }
        Ok(())
    }
}

/// Accumulates every frame and writes the whole store to `path` once,
/// after sampling has stopped.
pub struct FileSink<W: Write = Stdout> {
    path: PathBuf,
    store: TimeSeriesStore,
    spinner: usize,
    progress: W,
    finished: bool,
}

impl FileSink<Stdout> {
    pub fn new(path: &Path) -> Self {
        FileSink::with_progress(path, stdout())
    }
}

impl<W: Write> FileSink<W> {
    /// Progress indicator goes to `progress` instead of stdout.
    pub fn with_progress(path: &Path, progress: W) -> Self {
        FileSink {
            path: path.to_path_buf(),
            store: TimeSeriesStore::new(),
            spinner: 0,
            progress,
            finished: false,
        }
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<W: Write> Sink for FileSink<W> {
    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        if let Some(frame) = &report.frame {
            self.store.record_frame(report.elapsed_secs, frame);
        }
        let spinner = table::SPINNER[self.spinner % table::SPINNER.len()];
        self.spinner = self.spinner.wrapping_add(1);
        write!(
            self.progress,
            "Press ctrl + c to stop sampling and save result to {} {spinner}\r",
            self.path.display()
        )?;
        self.progress.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.store.write_to(&self.path)?;
        self.finished = true;
        tracing::info!(
            path = %self.path.display(),
            entities = self.store.len(),
            "saved sampling results"
        );
        if let Err(err) = writeln!(self.progress).and_then(|()| self.progress.flush()) {
            tracing::debug!(%err, "could not end progress line");
        }
        Ok(())
    }
}

/// The sink chosen on the command line.
pub enum OutputSink {
    Live(LiveSink<CrosstermBackend<Stdout>>),
    File(FileSink),
}

impl Sink for OutputSink {
    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        match self {
            OutputSink::Live(sink) => sink.on_iteration(report),
            OutputSink::File(sink) => sink.on_iteration(report),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            OutputSink::Live(sink) => sink.finish(),
            OutputSink::File(sink) => sink.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::system::delta::DeltaSample;
    use crate::system::sampler::{EntityReport, Frame};

    fn frame(cpu: f64) -> Frame {
        Frame {
            system: DeltaSample {
                cpu,
                ram_p: 0.5,
                ram_mb: 1000.0,
                rom_p: 0.25,
                rom_mb: 100.0,
                battery: 0.0,
            },
            entities: vec![EntityReport {
                pid: "42".to_string(),
                name: "com.example.app".to_string(),
                sample: DeltaSample {
                    cpu: cpu / 2.0,
                    ram_p: 0.01,
                    ram_mb: 10.0,
                    rom_p: 0.02,
                    rom_mb: 2.0,
                    battery: 0.0,
                },
            }],
        }
    }

    fn report(iteration: i64, frame: Option<Frame>) -> IterationReport {
        IterationReport {
            iteration,
            elapsed_secs: iteration as f64 * 0.5,
            frame,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("droidmon_sink_{name}_{}.json", std::process::id()))
    }

    #[test]
    fn file_sink_writes_nothing_until_finish() {
        let path = temp_path("deferred");
        let _ = std::fs::remove_file(&path);
        let mut sink = FileSink::with_progress(&path, Vec::new());

        sink.on_iteration(&report(-1, None)).unwrap();
        sink.on_iteration(&report(0, Some(frame(0.2)))).unwrap();
        sink.on_iteration(&report(1, Some(frame(0.4)))).unwrap();
        assert!(!path.exists());
        assert_eq!(sink.store().get("0").map(|s| s.len()), Some(2));

        sink.finish().unwrap();
        let parsed = TimeSeriesStore::from_json(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed["0"].time, vec![0.0, 0.5]);
        assert_eq!(parsed["42"].cpu, vec![0.1, 0.2]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_sink_finish_is_idempotent() {
        let path = temp_path("once");
        let mut sink = FileSink::with_progress(&path, Vec::new());
        sink.on_iteration(&report(0, Some(frame(0.2)))).unwrap();
        sink.finish().unwrap();
        std::fs::remove_file(&path).unwrap();

        sink.finish().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn file_sink_progress_line_cycles_spinner() {
        let path = temp_path("progress");
        let mut sink = FileSink::with_progress(&path, Vec::new());
        sink.on_iteration(&report(0, None)).unwrap();
        sink.on_iteration(&report(1, None)).unwrap();

        let printed = String::from_utf8(sink.progress.clone()).unwrap();
        let expected = format!(
            "Press ctrl + c to stop sampling and save result to {} |\r\
             Press ctrl + c to stop sampling and save result to {} /\r",
            path.display(),
            path.display()
        );
        assert_eq!(printed, expected);
    }

    /// Progress stream whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn file_sink_saves_even_when_progress_stream_is_closed() {
        let path = temp_path("closed_pipe");
        let _ = std::fs::remove_file(&path);
        let mut sink = FileSink::with_progress(&path, ClosedPipe);

        assert!(sink.on_iteration(&report(0, Some(frame(0.2)))).is_err());
        sink.finish().unwrap();

        let parsed = TimeSeriesStore::from_json(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed["0"].time, vec![0.0]);
        assert_eq!(parsed["42"].cpu, vec![0.1]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn live_sink_keeps_last_frame_through_empty_iteration() {
        let terminal = Terminal::new(TestBackend::new(100, 8)).unwrap();
        let mut sink = LiveSink::with_terminal(terminal);

        sink.on_iteration(&report(0, Some(frame(0.2)))).unwrap();
        sink.on_iteration(&report(1, None)).unwrap();

        let rendered: String = sink
            .terminal()
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Iteration: 1"));
        assert!(rendered.contains("com.example.app"));
        assert!(!rendered.contains("Collecting baseline sample..."));
        sink.finish().unwrap();
    }
}
