use crate::model::ProgramRun;
use crate::report::format::{Cell, format_num, format_table, format_time};
use std::fmt::Write;

/// Render a derived table as aligned plain text.
///
/// Text columns are left-aligned, numeric columns right-aligned. At most
/// `limit` rows are printed when given.
pub fn render_table(
    headers: &[&str],
    rows: &[Vec<Cell>],
    precision: i32,
    limit: Option<usize>,
) -> String {
    let shown = limit.map_or(rows.len(), |n| n.min(rows.len()));
    let rows = &rows[..shown];

    let formatted = format_table(rows, precision);

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &formatted {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    // A column is numeric unless one of its cells is text.
    let numeric: Vec<bool> = (0..headers.len())
        .map(|i| !rows.iter().any(|r| matches!(r.get(i), Some(Cell::Text(_)))))
        .collect();

    let mut out = String::new();
    push_line(&mut out, headers.iter().map(|h| h.to_string()), &widths, &numeric);
    for row in formatted {
        push_line(&mut out, row.into_iter(), &widths, &numeric);
    }
    out
}

fn push_line(
    out: &mut String,
    cells: impl Iterator<Item = String>,
    widths: &[usize],
    numeric: &[bool],
) {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        let width = widths.get(i).copied().unwrap_or(0);
        if i > 0 {
            line.push_str("  ");
        }
        if numeric.get(i).copied().unwrap_or(false) {
            let _ = write!(line, "{:>width$}", cell, width = width);
        } else {
            let _ = write!(line, "{:<width$}", cell, width = width);
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// One-paragraph overview of a run.
pub fn render_summary(run: &ProgramRun, precision: i32) -> String {
    format!(
        "runtime: {}  total time: {}  relations: {}  tuples: {}  copy time: {}\n",
        run.runtime_display(),
        format_time(run.total_time()),
        run.relations().len(),
        format_num(precision, run.total_tuples()),
        format_time(run.total_copy_time()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aligns_numeric_and_text_columns() {
        let rows = vec![
            vec![Cell::Float(12.0), Cell::Count(1_500), Cell::Text("edge".into())],
            vec![Cell::Float(0.5), Cell::Count(7), Cell::Text("path_long".into())],
        ];
        let text = render_table(&["TOT_T", "TUPLES", "NAME"], &rows, 0, None);
        assert_eq!(
            text,
            "TOT_T  TUPLES  NAME\n   \
                12   1,500  edge\n \
              .500       7  path_long\n"
        );
    }

    #[test]
    fn limit_truncates_rows() {
        let rows = vec![
            vec![Cell::Text("a".into())],
            vec![Cell::Text("b".into())],
        ];
        assert_eq!(render_table(&["N"], &rows, 0, Some(1)), "N\na\n");
    }

    #[test]
    fn summary_clamps_huge_tuple_totals() {
        let parser = crate::log::LineParser::new().unwrap();
        let mut run = ProgramRun::new();
        for line in [
            "@n-nonrecursive-relation;a;a.dl [1:1-1:5];9223372036854775807",
            "@n-nonrecursive-relation;b;b.dl [2:1-2:5];9223372036854775807",
        ] {
            run.process(&parser.parse_line(line).unwrap()).unwrap();
        }
        assert_eq!(run.total_tuples(), i64::MAX);
        assert!(render_summary(&run, 0).contains("tuples: 9.22337203685B"));
    }

    #[test]
    fn summary_marks_missing_runtime() {
        let run = ProgramRun::new();
        assert_eq!(
            render_summary(&run, 0),
            "runtime: --  total time: .000  relations: 0  tuples: 0  copy time: .000\n"
        );
    }
}
