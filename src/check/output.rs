//! 输出层：接收 Report，渲染 text 或 json

use std::fmt::Write;

use crate::check::report::{Overall, Report, Status};
use crate::utils::Result;

pub fn display(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}

// ── JSON ────────────────────────────────────────────────────────────────────

pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

// ── Text ────────────────────────────────────────────────────────────────────

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let width = report
        .results()
        .iter()
        .map(|r| r.name().len())
        .max()
        .unwrap_or(0);

    section(&mut out, &format!("CACHE VERIFY  {}", report.target));
    let _ = writeln!(out, "  Collected at : {}", report.collected_at);
    let _ = writeln!(out);

    for r in report.results() {
        let _ = writeln!(
            out,
            "  [{}] {:<width$}  {}{}",
            r.status(),
            r.name(),
            r.detail(),
            marker(r.status()),
            width = width
        );
    }

    let overall = report.overall();
    section(
        &mut out,
        &format!(
            "OVERALL: {}{}  ({} pass, {} warn, {} fail)",
            overall,
            if overall == Overall::Ok { "" } else { " ⚠" },
            report.count(Status::Pass),
            report.count(Status::Warn),
            report.count(Status::Fail),
        ),
    );
    out
}

fn marker(status: Status) -> &'static str {
    match status {
        Status::Fail => " ✗",
        _ => "",
    }
}

// ── 格式化工具 ───────────────────────────────────────────────────────────────

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", "─".repeat(60));
    let _ = writeln!(out, "  {}", title);
    let _ = writeln!(out, "{}", "─".repeat(60));
}
