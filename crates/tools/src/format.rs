//! Fixed-width rendering of query results for the LLM.
//!
//! Text is cut to 40 characters, integers get thousands separators, floats
//! get thousands separators and two decimals. Numeric columns are
//! right-aligned, everything else left-aligned. There is no index column.

use datacopilot_core::engine::{Cell, ColumnKind, TabularResult};

/// Longest text cell shown, in characters.
pub const MAX_TEXT_CHARS: usize = 40;

const COLUMN_GAP: &str = "  ";

/// Render at most `top_n_rows` rows of `result` as a text table.
pub fn render_table(result: &TabularResult, top_n_rows: usize) -> String {
    if result.columns.is_empty() {
        return "(0 rows)".to_string();
    }

    let header: Vec<String> = result.columns.iter().map(|c| c.name.clone()).collect();
    let body: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(top_n_rows)
        .map(|row| {
            result
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| row.get(i).map_or_else(|| "NULL".to_string(), |c| render_cell(c, col.kind)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            body.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let right_aligned: Vec<bool> = result.columns.iter().map(|c| c.kind.is_numeric()).collect();
    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if right_aligned[i] {
                    format!("{:>width$}", cell, width = widths[i])
                } else {
                    format!("{:<width$}", cell, width = widths[i])
                }
            })
            .collect();
        padded.join(COLUMN_GAP).trim_end().to_string()
    };

    let mut out = line(&header);
    if body.is_empty() {
        out.push_str("\n(0 rows)");
    }
    for row in &body {
        out.push('\n');
        out.push_str(&line(row));
    }
    out
}

/// Render one cell according to its column kind.
pub fn render_cell(cell: &Cell, kind: ColumnKind) -> String {
    match cell {
        Cell::Null => "NULL".to_string(),
        Cell::Bool(b) => b.to_string(),
        Cell::Integer(n) => match kind {
            ColumnKind::Float => format_float(*n as f64),
            _ => format_integer(*n),
        },
        Cell::Float(f) => format_float(*f),
        Cell::Text(s) => truncate_chars(s, MAX_TEXT_CHARS),
    }
}

/// `1234567` → `"1,234,567"`.
pub fn format_integer(n: i64) -> String {
    let digits = group_thousands(&n.unsigned_abs().to_string());
    if n < 0 { format!("-{digits}") } else { digits }
}

/// `1234.5` → `"1,234.50"`.
pub fn format_float(f: f64) -> String {
    if !f.is_finite() {
        return f.to_string();
    }
    let fixed = format!("{:.2}", f.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let grouped = group_thousands(int_part);
    if f < 0.0 {
        format!("-{grouped}.{frac_part}")
    } else {
        format!("{grouped}.{frac_part}")
    }
}

/// Insert a comma every three digits from the right.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datacopilot_core::engine::Column;

    #[test]
    fn integers_get_thousands_separators() {
        assert_eq!(format_integer(0), "0");
        assert_eq!(format_integer(999), "999");
        assert_eq!(format_integer(1000), "1,000");
        assert_eq!(format_integer(1234567), "1,234,567");
        assert_eq!(format_integer(-1234567), "-1,234,567");
        assert_eq!(format_integer(i64::MIN), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn floats_get_two_decimals() {
        assert_eq!(format_float(3.14159), "3.14");
        assert_eq!(format_float(1234567.891), "1,234,567.89");
        assert_eq!(format_float(-0.5), "-0.50");
        assert_eq!(format_float(0.0), "0.00");
        assert_eq!(format_float(f64::NAN), "NaN");
    }

    #[test]
    fn text_is_cut_to_forty_chars() {
        let long = "x".repeat(60);
        assert_eq!(render_cell(&Cell::Text(long), ColumnKind::Text).len(), 40);
        let accented = "é".repeat(45);
        assert_eq!(
            render_cell(&Cell::Text(accented), ColumnKind::Text).chars().count(),
            40
        );
    }

    #[test]
    fn renders_mixed_row() {
        let long_name = "An extremely long product name that keeps going and going";
        let mut result = TabularResult::new(vec![
            Column::new("name", ColumnKind::Text),
            Column::new("count", ColumnKind::Integer),
            Column::new("rate", ColumnKind::Float),
        ]);
        result.push_row(vec![
            Cell::Text(long_name.into()),
            Cell::Integer(1234567),
            Cell::Float(3.14159),
        ]);

        let table = render_table(&result, 50);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("name"));
        assert!(lines[1].starts_with(&long_name[..40]));
        assert!(!lines[1].contains(long_name));
        assert!(lines[1].contains("1,234,567"));
        assert!(lines[1].ends_with("3.14"));
    }

    #[test]
    fn numeric_columns_right_aligned() {
        let mut result = TabularResult::new(vec![
            Column::new("label", ColumnKind::Text),
            Column::new("total", ColumnKind::Integer),
        ]);
        result.push_row(vec![Cell::Text("a".into()), Cell::Integer(5)]);
        result.push_row(vec![Cell::Text("bb".into()), Cell::Integer(12345)]);

        let table = render_table(&result, 50);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "label   total");
        assert_eq!(lines[1], "a           5");
        assert_eq!(lines[2], "bb     12,345");
    }

    #[test]
    fn nulls_render_as_null() {
        let mut result = TabularResult::new(vec![Column::new("city", ColumnKind::Text)]);
        result.push_row(vec![Cell::Null]);
        assert_eq!(render_table(&result, 50), "city\nNULL");
    }

    #[test]
    fn rows_cut_to_top_n() {
        let mut result = TabularResult::new(vec![Column::new("n", ColumnKind::Integer)]);
        for i in 0..10 {
            result.push_row(vec![Cell::Integer(i)]);
        }
        assert_eq!(render_table(&result, 3).lines().count(), 4);
    }

    #[test]
    fn empty_result_shows_header_and_zero_rows() {
        let result = TabularResult::new(vec![
            Column::new("id", ColumnKind::Integer),
            Column::new("name", ColumnKind::Text),
        ]);
        assert_eq!(render_table(&result, 50), "id  name\n(0 rows)");
    }
}
