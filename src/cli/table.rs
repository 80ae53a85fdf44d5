//! Plain-text table rendering for the terminal dashboard.
use std::fmt::Write as _;

use serde_json::Value;

use crate::database_ops::QueryResult;
use crate::normalization::{ColorRow, MediaRow, MetadataRow};

// Cells wider than this are clipped with an ellipsis.
const MAX_CELL_WIDTH: usize = 40;

/// A record that can be shown as one table row.
pub trait TableRow {
    fn header() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

fn opt<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl TableRow for MetadataRow {
    fn header() -> &'static [&'static str] {
        &[
            "id",
            "title",
            "culture",
            "period",
            "century",
            "medium",
            "dimensions",
            "description",
            "department",
            "classification",
            "accessionyear",
            "accessionmethod",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.culture.clone(),
            self.period.clone(),
            self.century.clone(),
            self.medium.clone(),
            self.dimensions.clone(),
            self.description.clone(),
            self.department.clone(),
            self.classification.clone(),
            opt(&self.accessionyear),
            self.accessionmethod.clone(),
        ]
    }
}

impl TableRow for MediaRow {
    fn header() -> &'static [&'static str] {
        &[
            "objectid",
            "imagecount",
            "mediacount",
            "colorcount",
            "rankk",
            "datebegin",
            "dateend",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.objectid.to_string(),
            self.imagecount.to_string(),
            self.mediacount.to_string(),
            self.colorcount.to_string(),
            self.rank.to_string(),
            opt(&self.datebegin),
            opt(&self.dateend),
        ]
    }
}

impl TableRow for ColorRow {
    fn header() -> &'static [&'static str] {
        &["objectid", "color", "spectrum", "hue", "percent", "css3"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.objectid.to_string(),
            opt(&self.color),
            opt(&self.spectrum),
            opt(&self.hue),
            opt(&self.percent),
            opt(&self.css3),
        ]
    }
}

/// Render up to `limit` rows of typed records.
pub fn render_rows<R: TableRow>(rows: &[R], limit: usize) -> String {
    let header: Vec<String> = R::header().iter().map(|h| h.to_string()).collect();
    let body: Vec<Vec<String>> = rows.iter().take(limit).map(R::cells).collect();
    render(&header, &body)
}

/// Render a query result; JSON nulls print as empty cells.
pub fn render_result(result: &QueryResult) -> String {
    let body: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(display_value).collect())
        .collect();
    render(&result.columns, &body)
}

fn display_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn clip(cell: &str) -> String {
    let flat = cell.replace(['\n', '\r', '\t'], " ");
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut out: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
    out.push('…');
    out
}

fn render(header: &[String], body: &[Vec<String>]) -> String {
    let header: Vec<String> = header.iter().map(|h| clip(h)).collect();
    let body: Vec<Vec<String>> = body
        .iter()
        .map(|row| row.iter().map(|c| clip(c)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    write_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_line(&mut out, &rule, &widths);
    for row in &body {
        write_line(&mut out, row, &widths);
    }
    out
}

fn write_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let pad = w.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    writeln!(out, "{}", line.join(" | ").trim_end()).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_query_result_with_nulls() {
        let result = QueryResult {
            columns: vec!["hue".into(), "avg_percent".into()],
            rows: vec![vec![json!("Grey"), json!(0.5)], vec![Value::Null, json!(1)]],
        };
        let text = render_result(&result);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "hue  | avg_percent");
        assert_eq!(lines[1], "---- | -----------");
        assert_eq!(lines[2], "Grey | 0.5");
        assert_eq!(lines[3], "     | 1");
    }

    #[test]
    fn preview_honors_limit_and_clips() {
        let rows = vec![
            ColorRow {
                objectid: 1,
                color: Some("x".repeat(80)),
                spectrum: None,
                hue: Some("Red".into()),
                percent: Some(0.1),
                css3: None,
            };
            3
        ];
        let text = render_rows(&rows, 2);
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains('…'));
    }
}
