// Human-readable output: change strings, timestamps and aligned tables.

use chrono::{DateTime, Local, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use ratebook_recon::delta::{is_change, NEW_VALUE};

/// Widest a table column may grow before its cells are truncated.
pub(crate) const MAX_COL_WIDTH: usize = 40;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let s = truncate_display(s, width);
    let sw = display_width(&s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(sw)))
}

pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let s = truncate_display(s, width);
    let sw = display_width(&s);
    format!("{}{}", " ".repeat(width.saturating_sub(sw)), s)
}

/// `"20.00"` → `"+20.00%"`, `"-5.00"` → `"-5.00%"`. No-change and absent
/// annotations render as nothing.
pub(crate) fn format_change(change: Option<&str>) -> Option<String> {
    if !is_change(change) {
        return None;
    }
    let c = change?.trim();
    Some(if c == NEW_VALUE {
        c.to_string()
    } else if c.starts_with('-') || c.starts_with('+') {
        format!("{c}%")
    } else {
        format!("+{c}%")
    })
}

/// Last-write time in the local zone, minute precision.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub(crate) fn format_number(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

/// A value with its change appended, e.g. `"55 (+10.00%)"`.
pub(crate) fn value_with_change(v: Option<f64>, change: Option<&str>) -> String {
    let value = format_number(v);
    match format_change(change) {
        Some(c) if value.is_empty() => format!("({c})"),
        Some(c) => format!("{value} ({c})"),
        None => value,
    }
}

/// Column-aligned plain-text table.
pub(crate) struct Table {
    headers: Vec<String>,
    right: Vec<bool>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub(crate) fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            right: vec![false; headers.len()],
            rows: Vec::new(),
        }
    }

    /// Right-align the given columns (numbers).
    pub(crate) fn right_align(mut self, cols: &[usize]) -> Self {
        for &c in cols {
            if let Some(slot) = self.right.get_mut(c) {
                *slot = true;
            }
        }
        self
    }

    pub(crate) fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub(crate) fn render(&self) -> String {
        let ncols = self.headers.len();
        let mut widths: Vec<usize> = self.headers.iter().map(|h| display_width(h)).collect();
        for row in &self.rows {
            for (c, cell) in row.iter().enumerate().take(ncols) {
                widths[c] = widths[c].max(display_width(cell));
            }
        }
        for w in &mut widths {
            *w = (*w).min(MAX_COL_WIDTH);
        }

        let mut out = String::new();
        self.render_line(&mut out, &self.headers, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(rule.join("  ").trim_end());
        out.push('\n');
        for row in &self.rows {
            self.render_line(&mut out, row, &widths);
        }
        out
    }

    fn render_line(&self, out: &mut String, cells: &[String], widths: &[usize]) {
        let line: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(c, w)| {
                let cell = cells.get(c).map(String::as_str).unwrap_or("");
                if self.right[c] {
                    pad_left(cell, *w)
                } else {
                    pad_right(cell, *w)
                }
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_strings() {
        assert_eq!(format_change(Some("20.00")).as_deref(), Some("+20.00%"));
        assert_eq!(format_change(Some("-5.00")).as_deref(), Some("-5.00%"));
        assert_eq!(format_change(Some("0.00")), None);
        assert_eq!(format_change(Some("")), None);
        assert_eq!(format_change(None), None);
        assert_eq!(format_change(Some("new")).as_deref(), Some("new"));
    }

    #[test]
    fn value_and_change() {
        assert_eq!(value_with_change(Some(55.0), Some("10.00")), "55 (+10.00%)");
        assert_eq!(value_with_change(Some(1.5), Some("0.00")), "1.5");
        assert_eq!(value_with_change(None, None), "");
    }

    #[test]
    fn timestamp_is_minute_precision() {
        let ts = DateTime::parse_from_rfc3339("2026-03-01T10:15:42Z")
            .unwrap()
            .with_timezone(&Utc);
        let s = format_timestamp(&ts);
        assert_eq!(s.len(), "YYYY-MM-DD HH:MM".len());
        assert!(s.starts_with("2026-0"));
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_display("hello", 10), "hello");
        assert_eq!(truncate_display("hello world", 7), "hello..");
        // Each CJK char is two columns wide
        assert_eq!(truncate_display("日本語テキスト", 6), "日本..");
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_left("ab", 4), "  ab");
    }

    #[test]
    fn table_aligns_columns() {
        let mut t = Table::new(&["Name", "Records"]).right_align(&[1]);
        t.push(vec!["Acme".into(), "3".into()]);
        t.push(vec!["Initech Ltd".into(), "12".into()]);
        let out = t.render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Name         Records");
        assert_eq!(lines[1], "-----------  -------");
        assert_eq!(lines[2], "Acme               3");
        assert_eq!(lines[3], "Initech Ltd       12");
    }
}
