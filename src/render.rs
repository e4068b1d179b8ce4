// src/render.rs
use crate::view::{Notice, Phase, Row, ViewSnapshot};

/// Plain-text table with columns padded to their widest cell.
pub fn table(headers: &[&str], rows: &[Row]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.cells.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.to_vec()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in rows {
        let mut cells: Vec<&str> = row.cells.iter().map(String::as_str).collect();
        cells.resize(widths.len(), "");
        out.push_str(&line(cells));
        out.push('\n');
    }
    out
}

pub fn page(title: &str, headers: &[&str], snapshot: &ViewSnapshot) -> String {
    let mut out = format!("== {} ==\n", title);
    match &snapshot.phase {
        Phase::Idle => out.push_str("(not loaded)\n"),
        Phase::Loading => out.push_str("Loading...\n"),
        Phase::Error(message) => {
            out.push_str(message);
            out.push('\n');
        }
        Phase::Ready => {
            out.push_str(&table(headers, &snapshot.rows));
            if let Some(summary) = &snapshot.summary {
                out.push_str(summary);
                out.push('\n');
            }
        }
    }
    match &snapshot.notice {
        Some(Notice::Info(text)) => out.push_str(&format!("{}\n", text)),
        Some(Notice::Error(text)) => out.push_str(&format!("! {}\n", text)),
        None => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        Row {
            key: cells[0].to_string(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn columns_are_padded() {
        let out = table(
            &["Symbol", "Amount"],
            &[row(&["BTC", "1.5"]), row(&["DOGE", "12000"])],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Symbol | Amount");
        assert_eq!(lines[1], "-------+-------");
        assert_eq!(lines[2], "BTC    | 1.5");
        assert_eq!(lines[3], "DOGE   | 12000");
    }

    #[test]
    fn error_phase_hides_the_table() {
        let snapshot = ViewSnapshot {
            phase: Phase::Error("Malformed data from server.".into()),
            rows: vec![],
            summary: None,
            notice: None,
            generation: 1,
        };
        let out = page("Alerts", &["Symbol"], &snapshot);
        assert_eq!(out, "== Alerts ==\nMalformed data from server.\n");
    }

    #[test]
    fn summary_follows_rows() {
        let snapshot = ViewSnapshot {
            phase: Phase::Ready,
            rows: vec![row(&["BTC", "1.5"])],
            summary: Some("90000.00 USD".into()),
            notice: Some(Notice::Info("Holding added.".into())),
            generation: 1,
        };
        let out = page("Portfolio", &["Symbol", "Amount"], &snapshot);
        assert!(out.ends_with("BTC    | 1.5\n90000.00 USD\nHolding added.\n"));
    }
}
