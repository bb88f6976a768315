use crate::format::{format_fraction, format_megabytes, truncate_unicode};
use crate::system::delta::{DeltaSample, display_percent};
use crate::system::sampler::Frame;
use crate::system::snapshot::{SYSTEM_ID, SYSTEM_NAME};

pub const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

const NAME_WIDTH: usize = 48;

pub fn header_line() -> String {
    format!(
        "{:>5}{:>7}{:>10}{:>8}{:>8}{:>8}{:>10}  {}",
        "PID", "CPU%", "RSS", "RSS%", "ROM", "ROM%", "BATTERY%", "NAME"
    )
}

pub fn format_row(pid: &str, name: &str, sample: &DeltaSample) -> String {
    format!(
        "{:>5}{:>7}{:>10}{:>8}{:>8}{:>8}{:>10}  {}",
        pid,
        format!("{}%", display_percent(sample.cpu)),
        format_megabytes(sample.ram_mb),
        format_fraction(sample.ram_p),
        format_megabytes(sample.rom_mb),
        format_fraction(sample.rom_p),
        format!("{:.0}", sample.battery),
        truncate_unicode(name, NAME_WIDTH),
    )
}

/// System row first, then one row per application in pid order.
pub fn table_lines(frame: &Frame) -> Vec<String> {
    let mut lines = Vec::with_capacity(frame.entities.len() + 1);
    lines.push(format_row(SYSTEM_ID, SYSTEM_NAME, &frame.system));
    lines.extend(
        frame
            .entities
            .iter()
            .map(|entity| format_row(&entity.pid, &entity.name, &entity.sample)),
    );
    lines
}
