use crate::allow_list::AllowList;
use crate::config::LintConfig;
use crate::document::Markers;
use crate::extractor::extract;
use crate::language::LanguageSet;
use crate::pairing::match_pairs;
use crate::references::check_references;
use crate::reporting::{DocumentReport, Report};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

/// Maximum size of a single document in bytes (4MB)
pub const MAX_DOCUMENT_SIZE: usize = 4 * 1024 * 1024;

/// Maximum number of code fences per document
pub const MAX_FENCES_PER_DOCUMENT: usize = 1000;

/// Maximum number of lines a single fence may highlight
pub const MAX_HIGHLIGHT_LINES: u32 = 10_000;

/// A document's path and raw text, read once before linting starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Reads all documents concurrently.
///
/// # Errors
///
/// Returns an error naming the first document that cannot be read.
pub async fn read_documents(paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
    futures::future::try_join_all(paths.iter().map(|path| async move {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document {}", path.display()))?;
        Ok::<_, anyhow::Error>(SourceDocument::new(path.clone(), text))
    }))
    .await
}

/// Runs the extract → pair → reference-check → report pipeline.
///
/// A `Linter` holds everything that is loaded once per run: the language
/// set, comparison markers, API naming pattern and the allow-list. It is
/// shared read-only between documents, so documents can be linted in any
/// order and on any thread.
pub struct Linter {
    languages: LanguageSet,
    markers: Markers,
    api_pattern: Regex,
    allow_list: AllowList,
}

impl Linter {
    pub fn new(config: &LintConfig, allow_list: AllowList) -> Result<Self> {
        Ok(Self {
            languages: config.languages(),
            markers: config.markers(),
            api_pattern: config.api_pattern()?,
            allow_list,
        })
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Lints a single document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The document exceeds MAX_DOCUMENT_SIZE
    /// - The document has more than MAX_FENCES_PER_DOCUMENT fences
    pub fn lint_document(&self, source: &SourceDocument) -> Result<DocumentReport> {
        if source.text.len() > MAX_DOCUMENT_SIZE {
            anyhow::bail!(
                "Document {} exceeds size limit of {} bytes ({} bytes)",
                source.path.display(),
                MAX_DOCUMENT_SIZE,
                source.text.len()
            );
        }

        log::debug!("Linting document: {}", source.path.display());

        let extraction = extract(
            source.path.clone(),
            source.text.clone(),
            &self.languages,
            &self.markers,
        );
        let document = extraction.document;

        let fence_count = document.fences().count();
        if fence_count > MAX_FENCES_PER_DOCUMENT {
            anyhow::bail!(
                "Document {} has {} code fences, exceeding limit of {}",
                source.path.display(),
                fence_count,
                MAX_FENCES_PER_DOCUMENT
            );
        }

        let mut findings = extraction.findings;

        let pairing = match_pairs(&document);
        let comparisons = pairing.units.len();
        findings.extend(pairing.findings);

        findings.extend(check_references(
            &document,
            &self.allow_list,
            &self.api_pattern,
        ));

        Ok(DocumentReport::new(&document, comparisons, findings))
    }

    /// Lints documents in parallel, at most `jobs` at a time, and builds the
    /// report. Documents appear in the report in input order.
    pub async fn lint_all(
        self: Arc<Self>,
        sources: Vec<SourceDocument>,
        jobs: usize,
    ) -> Result<Report> {
        log::info!(
            "Linting {} document(s) with up to {} worker(s)",
            sources.len(),
            jobs.max(1)
        );

        let documents: Vec<DocumentReport> = stream::iter(sources.into_iter().map(|source| {
            let linter = Arc::clone(&self);
            tokio::task::spawn_blocking(move || linter.lint_document(&source))
        }))
        .buffered(jobs.max(1))
        .map(|joined| -> Result<DocumentReport> { joined.context("Lint task failed")? })
        .try_collect()
        .await?;

        Ok(Report::build(documents))
    }
}

/// Default worker count: one per CPU.
pub fn default_jobs() -> usize {
    num_cpus::get()
}
