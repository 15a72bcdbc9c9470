//! Text and HTML rendering of reports

use arch::{LinkReport, MetricRow, MetricsReport, Report, ReportRow};

/// One table row; `None` is a separator line
type Row = Option<Vec<String>>;

fn metric_cells(row: &MetricRow) -> Vec<String> {
    vec![
        row.name.clone(),
        row.instability.to_string(),
        row.abstraction.to_string(),
        row.error.to_string(),
    ]
}

fn metrics_rows(report: &MetricsReport) -> Vec<Row> {
    report
        .rows
        .iter()
        .map(|row| match row {
            ReportRow::Component(r) | ReportRow::Mean(r) => Some(metric_cells(r)),
            ReportRow::Separator => None,
        })
        .collect()
}

fn link_rows(report: &LinkReport) -> Vec<Row> {
    report
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.label.to_string()];
            cells.extend(row.cells.iter().map(|c| c.to_string()));
            Some(cells)
        })
        .collect()
}

fn table_parts(report: &Report) -> (&[String], Vec<Row>) {
    match report {
        Report::Metrics(r) => (r.columns.as_slice(), metrics_rows(r)),
        Report::Links(r) => (r.columns.as_slice(), link_rows(r)),
    }
}

/// Plain-text table, numbers right-aligned
pub fn render_table(report: &Report) -> String {
    let (columns, rows) = table_parts(report);

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for cells in rows.iter().flatten() {
        for (i, cell) in cells.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                if i == 0 {
                    format!("{:<width$}", cell, width = *width)
                } else {
                    format!("{:>width$}", cell, width = *width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("  ");

    let mut lines = vec![format_line(columns), rule.clone()];
    for row in &rows {
        match row {
            Some(cells) => lines.push(format_line(cells.as_slice())),
            None => lines.push(rule.clone()),
        }
    }

    let mut output = lines.join("\n");
    if let Report::Links(r) = report {
        output.push('\n');
        output.push_str(&r.footer());
    }
    output
}

pub fn render_html(report: &Report) -> String {
    let (columns, rows) = table_parts(report);
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{}</title></head>\n<body>\n", escape(report.name())));
    html.push_str(&format!("<h1>{}</h1>\n", escape(report.name())));
    if let Report::Metrics(r) = report {
        html.push_str(&format!("<p>{}</p>\n", escape(&r.description)));
    }

    html.push_str("<table>\n<thead><tr>");
    for column in columns {
        html.push_str(&format!("<th>{}</th>", escape(column)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for row in &rows {
        match row {
            Some(cells) => {
                html.push_str("<tr>");
                for cell in cells {
                    html.push_str(&format!("<td>{}</td>", escape(cell)));
                }
                html.push_str("</tr>\n");
            }
            None => html.push_str(&format!("<tr><td colspan=\"{}\"></td></tr>\n", columns.len())),
        }
    }
    html.push_str("</tbody>\n</table>\n");

    if let Report::Links(r) = report {
        html.push_str("<dl>\n");
        for entry in &r.legend {
            html.push_str(&format!("<dt>{}</dt><dd>{}</dd>\n", entry.label, escape(&entry.name)));
        }
        html.push_str("</dl>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::{LegendEntry, LinkRow};

    fn metrics() -> Report {
        let row = |name: &str, i: f64, a: f64, e: f64| MetricRow {
            name: name.to_string(),
            instability: i,
            abstraction: a,
            error: e,
        };
        Report::Metrics(MetricsReport {
            name: "AS plane".to_string(),
            description: "Abstract Stability Report".to_string(),
            columns: ["Component", "I", "A", "E"].map(String::from).to_vec(),
            rows: vec![
                ReportRow::Component(row("pkg/a.py", 1.0, 0.0, 0.0)),
                ReportRow::Component(row("pkg/b.py", 0.25, 0.5, 0.25)),
                ReportRow::Separator,
                ReportRow::Mean(row("Mean", 0.62, 0.25, 0.12)),
            ],
        })
    }

    fn links() -> Report {
        Report::Links(LinkReport {
            name: "Link Report".to_string(),
            columns: ["Components", "1", "2"].map(String::from).to_vec(),
            rows: vec![
                LinkRow { label: 1, cells: vec![0, 1] },
                LinkRow { label: 2, cells: vec![0, 0] },
            ],
            legend: vec![
                LegendEntry { label: 1, name: "a.py".to_string() },
                LegendEntry { label: 2, name: "<b>.py".to_string() },
            ],
        })
    }

    #[test]
    fn test_render_metrics_table() {
        let table = render_table(&metrics());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Component     I     A     E");
        assert_eq!(lines[1], "---------  ----  ----  ----");
        assert_eq!(lines[2], "pkg/a.py      1     0     0");
        assert_eq!(lines[3], "pkg/b.py   0.25   0.5  0.25");
        assert_eq!(lines[4], lines[1]);
        assert_eq!(lines[5], "Mean       0.62  0.25  0.12");
    }

    #[test]
    fn test_render_links_table_with_footer() {
        let table = render_table(&links());
        assert!(table.starts_with("Components  1  2\n"));
        assert!(table.contains(&format!("{:<10}  0  1\n", "1")));
        assert!(table.ends_with("\nLabels:\n1: a.py\n2: <b>.py\n"));
    }

    #[test]
    fn test_render_html_escapes() {
        let html = render_html(&links());
        assert!(html.contains("<h1>Link Report</h1>"));
        assert!(html.contains("<dd>&lt;b&gt;.py</dd>"));
        assert!(html.contains("<th>Components</th><th>1</th><th>2</th>"));
    }

    #[test]
    fn test_render_html_separator_row() {
        let html = render_html(&metrics());
        assert!(html.contains("<p>Abstract Stability Report</p>"));
        assert!(html.contains("<tr><td colspan=\"4\"></td></tr>"));
        assert!(html.contains("<td>Mean</td><td>0.62</td>"));
    }
}
