//! Parser for the table printed by the device's `top` tool.
//!
//! `top -n N` prints N frames. Each frame opens with two summary lines that
//! start with `User`, followed by a blank line, the column header and the
//! process rows. Only the last frame is read; earlier ones are preamble.

use super::filter::AppFilter;

#[derive(Clone, Debug, PartialEq)]
pub struct TopRow {
    pub pid: String,
    pub name: String,
    pub cpu_percent: u32,
    pub resident_kb: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopTable {
    /// `User` share of the last frame as a fraction, when the summary parsed.
    pub user_fraction: Option<f64>,
    pub rows: Vec<TopRow>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParserState {
    AwaitingHeader { summaries_seen: usize },
    SkippingPreamble,
    ReadingRows,
    Finished,
}

#[derive(Debug)]
pub struct TopParser {
    state: ParserState,
    summaries_needed: usize,
    filter: AppFilter,
    table: TopTable,
}

impl TopParser {
    pub fn new(frames: usize, filter: AppFilter) -> Self {
        Self {
            state: ParserState::AwaitingHeader { summaries_seen: 0 },
            summaries_needed: 2 * frames.saturating_sub(1) + 1,
            filter,
            table: TopTable::default(),
        }
    }

    pub fn feed(&mut self, line: &str) {
        match self.state {
            ParserState::AwaitingHeader { summaries_seen } => {
                if !line.starts_with("User") {
                    return;
                }
                let summaries_seen = summaries_seen + 1;
                if summaries_seen == self.summaries_needed {
                    self.table.user_fraction = parse_user_share(line);
                    self.state = ParserState::SkippingPreamble;
                } else {
                    self.state = ParserState::AwaitingHeader { summaries_seen };
                }
            }
            ParserState::SkippingPreamble => {
                if line.split_whitespace().next() == Some("PID") {
                    self.state = ParserState::ReadingRows;
                }
            }
            ParserState::ReadingRows => {
                if line.starts_with("User") {
                    self.state = ParserState::Finished;
                } else if let Some(row) = parse_row(line)
                    && self.filter.is_app(&row.name)
                {
                    self.table.rows.push(row);
                }
            }
            ParserState::Finished => {}
        }
    }

    pub fn finish(self) -> TopTable {
        self.table
    }
}

/// `User 12%, System 3%, IOW 0%, IRQ 0%` -> 0.12
fn parse_user_share(line: &str) -> Option<f64> {
    let first = line.split(',').next()?;
    let percent = first.trim_start_matches("User").trim().trim_end_matches('%');
    percent.parse::<f64>().ok().map(|p| p / 100.0)
}

/// `PID USER PR NI CPU% S #THR VSS RSS [PCY] Name`; PCY is blank for some
/// processes, so the name is taken from the last column.
fn parse_row(line: &str) -> Option<TopRow> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 10 {
        return None;
    }
    let pid = fields[0];
    if !pid.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(TopRow {
        pid: pid.to_string(),
        name: fields[fields.len() - 1].to_string(),
        cpu_percent: fields[4].trim_end_matches('%').parse().ok()?,
        resident_kb: fields[8].trim_end_matches('K').parse().ok()?,
    })
}
