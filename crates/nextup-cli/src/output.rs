use nextup_core::engine::ActionSet;
use nextup_core::executor::ApplyReport;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{cell:w$}")
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    println!("{}", render(&header));
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));
    for row in &rows {
        println!("{}", render(row));
    }
}

fn ids<T: std::fmt::Display>(values: &[T]) -> String {
    if values.is_empty() {
        return "-".to_string();
    }
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_actions(actions: &ActionSet) {
    println!("  unmonitor:    {}", ids(&actions.unmonitor));
    println!("  monitor:      {}", ids(&actions.monitor));
    println!("  search:       {}", ids(&actions.search));
    println!("  delete files: {}", ids(&actions.delete_files));
}

pub fn print_report(report: &ApplyReport) {
    println!(
        "Applied: {} monitored, {} unmonitored, {} searched, {} deleted, {} cancelled",
        report.monitored, report.unmonitored, report.searched, report.deleted, report.cancelled
    );
    let failures = [
        ("monitor", &report.failed_monitor),
        ("unmonitor", &report.failed_unmonitor),
        ("search", &report.failed_search),
        ("search (not monitored)", &report.rejected_search),
        ("delete", &report.failed_delete),
        ("cancel", &report.failed_cancel),
    ];
    for (what, failed) in failures.iter().filter(|(_, f)| !f.is_empty()) {
        eprintln!("  failed {what}: {}", ids(failed));
    }
    if !report.failed_queue_fetch.is_empty() {
        eprintln!(
            "  download queue unavailable for seasons: {}",
            ids(&report.failed_queue_fetch)
        );
    }
}
