//! ASCII Table Rendering
//!
//! Lays out flat key/value rows as an aligned monospace table.
//! Columns are the union of all row keys in first-seen order; a row
//! missing a key gets a blank cell.

/// One table row as ordered `(column, value)` pairs.
pub type Row = Vec<(String, String)>;

/// Renders `rows` under `title`.
///
/// With `bordered` set, the header and body are framed with `+---+`
/// rules and cells are separated by `|`. Without it, columns are
/// separated by two spaces.
///
/// # Example
///
/// ```
/// use pointprof::report::table::render;
///
/// let rows = vec![vec![("name".to_string(), "start".to_string())]];
/// let table = render(&rows, "DEFAULT", true);
/// assert!(table.contains("| name  |"));
/// ```
pub fn render(rows: &[Row], title: &str, bordered: bool) -> String {
    let columns = collect_columns(rows);
    if columns.is_empty() {
        return title.to_string();
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            rows.iter()
                .map(|row| cell(row, column).chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<&str> = columns.iter().map(String::as_str).collect();
    let body: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| columns.iter().map(|column| cell(row, column)).collect())
        .collect();

    let mut lines = vec![title.to_string()];
    if bordered {
        let rule = rule_line(&widths);
        lines.push(rule.clone());
        lines.push(bordered_line(&header, &widths));
        lines.push(rule.clone());
        for cells in &body {
            lines.push(bordered_line(cells, &widths));
        }
        lines.push(rule);
    } else {
        lines.push(plain_line(&header, &widths));
        for cells in &body {
            lines.push(plain_line(cells, &widths));
        }
    }

    lines.join("\n")
}

/// Column names in first-seen order.
fn collect_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for (key, _) in row {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a str {
    row.iter()
        .find(|(key, _)| key == column)
        .map(|(_, value)| value.as_str())
        .unwrap_or("")
}

fn rule_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn bordered_line(cells: &[&str], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (value, width) in cells.iter().zip(widths) {
        line.push_str(&format!(" {:<width$} |", value, width = width));
    }
    line
}

fn plain_line(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{:<width$}", value, width = width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
