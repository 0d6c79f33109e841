use login_reports::reports::{Cell, Table};

const COLUMN_GAP: &str = "  ";

/// Plain-text grid with text cells left-aligned and numbers right-aligned.
/// Rules separate the header and the footer from the body.
pub(crate) fn render_text(table: &Table) -> String {
    let rows: Vec<Vec<(String, bool)>> = table
        .body
        .iter()
        .chain(table.footer.iter())
        .map(|row| row.iter().map(|cell| (cell.display(), is_numeric(cell))).collect())
        .collect();

    let mut widths: Vec<usize> = table.header.iter().map(|title| title.chars().count()).collect();
    for row in &rows {
        for (index, (value, _)) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(value.chars().count());
            }
        }
    }

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);

    let mut out = String::new();
    let header: Vec<(String, bool)> = table
        .header
        .iter()
        .map(|title| (title.clone(), false))
        .collect();
    push_line(&mut out, &header, &widths);
    out.push_str(&rule);
    out.push('\n');

    if table.body.is_empty() {
        out.push_str("(no rows)\n");
    }
    for (index, row) in rows.iter().enumerate() {
        if index == table.body.len() {
            out.push_str(&rule);
            out.push('\n');
        }
        push_line(&mut out, row, &widths);
    }
    out
}

fn is_numeric(cell: &Cell) -> bool {
    !matches!(cell, Cell::Text(_))
}

fn push_line(out: &mut String, row: &[(String, bool)], widths: &[usize]) {
    let line = row
        .iter()
        .zip(widths)
        .map(|((value, numeric), width)| {
            if *numeric {
                format!("{value:>width$}")
            } else {
                format!("{value:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    out.push_str(line.trim_end());
    out.push('\n');
}
