use super::{AnalysisReport, GUIDANCE};
use std::fmt;
use volley_core::RunRecord;

const TABLE_HEADER: &str = "| Test | Connections | Pipelining | Workers | Requests/sec | Latency (avg) | Latency (p99) | Success Rate |";
const TABLE_RULE: &str = "|------|-------------|------------|---------|--------------|---------------|---------------|--------------|";

/// One table row, shared by every rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub connections: usize,
    pub pipelining: usize,
    pub workers: usize,
    pub requests_per_second: f64,
    /// `None` when no response completed.
    pub latency_avg_ms: Option<f64>,
    pub latency_p99_ms: Option<f64>,
    pub success_rate: f64,
}

impl From<&RunRecord> for ReportRow {
    fn from(record: &RunRecord) -> Self {
        let result = record.result();
        let config = result.config();
        let stats = result.stats();

        Self {
            label: record.label().to_string(),
            connections: config.connections(),
            pipelining: config.pipelining(),
            workers: result.workers(),
            requests_per_second: stats.requests.average,
            latency_avg_ms: (!stats.latency.is_empty()).then_some(stats.latency.average),
            latency_p99_ms: stats.latency.p99(),
            success_rate: stats.counts.success_rate(),
        }
    }
}

impl ReportRow {
    fn table_line(&self) -> String {
        format!(
            "| {} | {} | {} | {} | {:.2} | {} | {} | {:.2}% |",
            self.label,
            self.connections,
            self.pipelining,
            self.workers,
            self.requests_per_second,
            millis(self.latency_avg_ms),
            millis(self.latency_p99_ms),
            self.success_rate,
        )
    }
}

fn millis(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{ms:.2} ms"),
        None => "n/a".to_string(),
    }
}

/// `1234567.6` -> `1,234,568`
pub(crate) fn group_thousands(value: f64) -> String {
    let digits = (value.round() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn summary_lines(report: &AnalysisReport) -> Vec<String> {
    let best = &report.rows()[0];
    vec![
        format!("Best Performance: {:.2} requests/sec", best.requests_per_second),
        format!(
            "Configuration: {} connections, {} pipelining, {} workers",
            best.connections, best.pipelining, best.workers
        ),
        format!("Average Latency: {}", millis(best.latency_avg_ms)),
        format!("p99 Latency: {}", millis(best.latency_p99_ms)),
        format!("Success Rate: {:.2}%", best.success_rate),
    ]
}

fn capacity_lines(report: &AnalysisReport) -> Vec<String> {
    let capacity = report.capacity();
    vec![
        format!(
            "Estimated Maximum Throughput: ~{} requests/sec",
            capacity.per_second.round() as u64
        ),
        format!(
            "Estimated Daily Capacity: ~{} requests/day",
            group_thousands(capacity.per_day)
        ),
    ]
}

fn recommendation_lines(report: &AnalysisReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .recommendations()
        .iter()
        .map(|r| format!("- {r}"))
        .collect();
    if report.best().result().stats().latency.is_empty() {
        lines.push(
            "- No response completed during the run, so latency was not measured; the latency check was skipped.".to_string(),
        );
    } else if report.latency_check_skipped() {
        lines.push(
            "- p99 latency is unavailable for results combined from several workers; the latency check was skipped.".to_string(),
        );
    }
    lines
}

/// Plain-text rendering for the terminal.
pub(super) struct Console<'a>(pub &'a AnalysisReport);

/// Durable Markdown rendering.
pub(super) struct Markdown<'a>(pub &'a AnalysisReport);

impl fmt::Display for Console<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "=== Load Test Results ===\n")?;
        writeln!(f, "Results sorted by requests per second (highest first):\n")?;
        write_table(f, report)?;

        writeln!(f, "\n=== Detailed Analysis ===\n")?;
        for line in summary_lines(report) {
            writeln!(f, "{line}")?;
        }
        writeln!(f)?;
        for line in capacity_lines(report) {
            writeln!(f, "{line}")?;
        }

        writeln!(f, "\n=== Recommendations ===\n")?;
        write_recommendations(f, report)
    }
}

impl fmt::Display for Markdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "# Load Test Analysis Report\n")?;

        writeln!(f, "## Summary")?;
        for line in summary_lines(report) {
            writeln!(f, "- {line}")?;
        }

        writeln!(f, "\n## Theoretical Limits")?;
        for line in capacity_lines(report) {
            writeln!(f, "- {line}")?;
        }

        writeln!(f, "\n## Detailed Results\n")?;
        write_table(f, report)?;

        writeln!(f, "\n## Recommendations\n")?;
        write_recommendations(f, report)
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, report: &AnalysisReport) -> fmt::Result {
    writeln!(f, "{TABLE_HEADER}")?;
    writeln!(f, "{TABLE_RULE}")?;
    for row in report.rows() {
        writeln!(f, "{}", row.table_line())?;
    }
    Ok(())
}

fn write_recommendations(f: &mut fmt::Formatter<'_>, report: &AnalysisReport) -> fmt::Result {
    writeln!(f, "Based on the test results:")?;
    for line in recommendation_lines(report) {
        writeln!(f, "{line}")?;
    }

    writeln!(f, "\nFor production use:")?;
    for line in GUIDANCE {
        writeln!(f, "- {line}")?;
    }
    Ok(())
}
