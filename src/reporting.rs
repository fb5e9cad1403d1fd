use crate::document::Document;
use crate::finding::{Finding, Severity};
use anyhow::Result;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output format of a rendered [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Findings and structure counts for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    path: PathBuf,
    digest: String,
    sections: usize,
    fences: usize,
    comparisons: usize,
    findings: Vec<Finding>,
}

impl DocumentReport {
    /// Builds the entry for `document`, sorting findings by section order,
    /// then severity (most severe first), then line.
    pub fn new(document: &Document, comparisons: usize, mut findings: Vec<Finding>) -> Self {
        findings.sort_by(|a, b| {
            let key = |f: &Finding| {
                (
                    f.location().section_index,
                    Reverse(f.severity()),
                    f.location().line,
                    f.kind(),
                )
            };
            key(a)
                .cmp(&key(b))
                .then_with(|| a.message().cmp(b.message()))
        });

        Self {
            path: document.path().to_path_buf(),
            digest: document.digest().to_string(),
            sections: document.sections().len(),
            fences: document.fences().count(),
            comparisons,
            findings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn fences(&self) -> usize {
        self.fences
    }

    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
}

/// Finding counts per severity across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub documents: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl Summary {
    fn count(findings: &[Finding]) -> Self {
        let mut summary = Summary::default();
        for finding in findings {
            match finding.severity() {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }
}

/// The result of linting a set of documents.
///
/// Documents keep the order they were given in, so identical input always
/// renders identical output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    documents: Vec<DocumentReport>,
    summary: Summary,
}

impl Report {
    pub fn build(documents: Vec<DocumentReport>) -> Self {
        let mut summary = Summary {
            documents: documents.len(),
            ..Summary::default()
        };
        for document in &documents {
            let counts = Summary::count(&document.findings);
            summary.errors += counts.errors;
            summary.warnings += counts.warnings;
            summary.infos += counts.infos;
        }

        Self { documents, summary }
    }

    pub fn documents(&self) -> &[DocumentReport] {
        &self.documents
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.documents.iter().flat_map(|d| d.findings.iter())
    }

    /// True if any finding is at least as severe as `threshold`.
    pub fn fails(&self, threshold: Severity) -> bool {
        self.findings().any(|f| f.severity() >= threshold)
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => {
                let mut json = serde_json::to_string_pretty(self)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();

        for document in &self.documents {
            let counts = Summary::count(&document.findings);
            let _ = writeln!(out, "{}", document.path.display());
            for finding in &document.findings {
                let _ = writeln!(out, "  {}", finding);
            }
            let _ = writeln!(
                out,
                "  {} finding(s): {} error(s), {} warning(s), {} info",
                document.findings.len(),
                counts.errors,
                counts.warnings,
                counts.infos
            );
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "Summary: {} document(s), {} error(s), {} warning(s), {} info",
            self.summary.documents, self.summary.errors, self.summary.warnings, self.summary.infos
        );

        out
    }
}

/// Formats a message with mdBook-style timestamp and prefix.
fn format_log(level: &str, message: &str) -> String {
    use chrono::Local;
    format!(
        "{} [{}] (doc_lint): {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

/// Reports a fatal error to stderr with mdBook-style formatting.
pub fn report_fatal_error(error: &anyhow::Error) {
    eprintln!("{}", format_log("ERROR", "Documentation lint aborted"));
    for line in format!("{:#}", error).lines() {
        eprintln!("{}", format_log("ERROR", line));
    }
}

/// Reports every finding at or above `threshold` to stderr with mdBook-style
/// formatting.
pub fn report_findings(report: &Report, threshold: Severity) {
    for finding in report.findings().filter(|f| f.severity() >= threshold) {
        let level = match finding.severity() {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        eprintln!("{}", format_log(level, &finding.to_string()));
    }
}

/// Prints run statistics to stderr.
///
/// Shows:
/// - Documents, fences and comparison units checked
/// - Finding counts per severity and total time
/// - Per-document counts (RUST_LOG=debug)
pub fn print_run_summary(report: &Report, duration: Duration) {
    let summary = report.summary();
    let fences: usize = report.documents().iter().map(|d| d.fences).sum();
    let comparisons: usize = report.documents().iter().map(|d| d.comparisons).sum();

    eprintln!(
        "{}",
        format_log(
            "INFO",
            &format!(
                "Checked {} document(s), {} code fence(s), {} comparison(s)",
                summary.documents, fences, comparisons
            )
        )
    );
    eprintln!(
        "{}",
        format_log(
            "INFO",
            &format!(
                "Found {} error(s), {} warning(s), {} info in {}ms",
                summary.errors,
                summary.warnings,
                summary.infos,
                duration.as_millis()
            )
        )
    );

    for document in report.documents() {
        log::debug!(
            "[DOC_LINT] {}: {} fence(s), {} comparison(s), {} finding(s)",
            document.path.display(),
            document.fences,
            document.comparisons,
            document.findings.len()
        );
    }
}
