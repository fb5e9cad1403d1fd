//! doc-lint library
//!
//! This library lints MDX and Markdown documentation: it extracts fenced code
//! blocks, pairs "Before:"/"After:" examples, and checks that API names
//! mentioned in inline code and link text appear in an allow-list. The
//! primary interface is the doc-lint binary, which runs either as a CLI or
//! as an mdBook preprocessor.
//!
//! ## Pipeline
//!
//! For each document, strictly in sequence:
//!
//! 1. [`extract`] - sections and fences, plus malformed-fence findings
//! 2. [`match_pairs`] - before/after comparison units
//! 3. [`check_references`] - unknown and non-canonical API references
//! 4. [`DocumentReport`] / [`Report`] - sorted findings and summary counts
//!
//! [`Linter`] runs the pipeline over many documents in parallel.

mod allow_list;
mod config;
mod document;
mod extractor;
mod finding;
mod language;
mod linter;
mod pairing;
mod preprocessor;
mod references;
mod reporting;

pub use allow_list::{AllowList, AllowListFormat, AllowListLoadError};
pub use config::LintConfig;
pub use document::{Document, Fence, LineIndex, Marker, Markers, Section};
pub use extractor::{extract, Extraction};
pub use finding::{Finding, FindingKind, Location, Severity};
pub use language::{get_language_aliases, LanguageSet};
pub use linter::{
    default_jobs, read_documents, Linter, SourceDocument, MAX_DOCUMENT_SIZE,
    MAX_FENCES_PER_DOCUMENT, MAX_HIGHLIGHT_LINES,
};
pub use pairing::{match_pairs, ComparisonUnit, Pairing};
pub use preprocessor::DocLintPreprocessor;
pub use references::{check_references, DEFAULT_API_PATTERN};
pub use reporting::{
    print_run_summary, report_fatal_error, report_findings, DocumentReport, Report,
    ReportFormat, Summary,
};
