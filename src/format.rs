use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

/// `12.5` -> `12.50M`
pub fn format_megabytes(mb: f64) -> String {
    format!("{mb:.2}M")
}

/// `0.0625` -> `6.25%`
pub fn format_fraction(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
