//! Tabular console output

use pomo::{SessionType, Task};

const TASK_HEADER: [&str; 4] = ["id", "title", "status", "sessions"];
const SESSION_HEADER: [&str; 3] = ["current", "next", "count"];

/// Print tasks as an aligned table. Prints nothing for an empty list.
pub fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        return;
    }

    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.title.clone(),
                t.status.to_string(),
                t.sessions.to_string(),
            ]
        })
        .collect();

    print!("{}", render_table(&TASK_HEADER, &rows));
}

/// Print the session state as a one-row table
pub fn print_session(current: SessionType, next: SessionType, count: u32) {
    let rows = vec![vec![
        current.to_string(),
        next.to_string(),
        count.to_string(),
    ]];
    print!("{}", render_table(&SESSION_HEADER, &rows));
}

/// Left-align every column to its widest cell, two spaces apart
pub fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}\n", line.trim_end())
    };

    let mut out = format_row(header.to_vec());
    for row in rows {
        out.push_str(&format_row(row.iter().map(String::as_str).collect()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_aligns_columns() {
        let rows = vec![
            vec!["1".to_string(), "a long title".to_string()],
            vec!["22".to_string(), "b".to_string()],
        ];
        let table = render_table(&["id", "title"], &rows);

        assert_eq!(table, "id  title\n1   a long title\n22  b\n");
    }

    #[test]
    fn test_render_table_header_only() {
        assert_eq!(render_table(&["current", "next"], &[]), "current  next\n");
    }
}
