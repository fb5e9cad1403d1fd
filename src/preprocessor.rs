use crate::allow_list::AllowList;
use crate::config::LintConfig;
use crate::linter::{default_jobs, Linter, SourceDocument};
use crate::reporting::{print_run_summary, report_findings};
use anyhow::{Context, Result};
use mdbook::book::{Book, BookItem};
use mdbook::preprocess::{Preprocessor, PreprocessorContext};
use std::sync::Arc;
use std::time::Instant;

/// An mdBook preprocessor that lints every chapter of a book.
///
/// # Overview
///
/// Each chapter is run through the same pipeline as `doc-lint check`:
/// fence extraction, before/after pairing and reference checking. The book
/// is returned unchanged; the build fails when any finding reaches the
/// configured `fail-on` severity.
///
/// # Configuration
///
/// ```toml
/// [preprocessor.doc-lint]
/// command = "doc-lint"
/// allow-list = "apis.txt"
/// ```
///
/// `allow-list` is required and resolved relative to the book root.
pub struct DocLintPreprocessor;

impl DocLintPreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Async version of [`Preprocessor::run`].
    pub async fn run_async(&self, ctx: &PreprocessorContext, book: Book) -> Result<Book> {
        let config = LintConfig::from_preprocessor_context(ctx)?;

        let allow_list_path = config.allow_list_path(&ctx.root).context(
            "No allow-list configured: set `allow-list` under [preprocessor.doc-lint] in book.toml",
        )?;
        let allow_list = AllowList::load(&allow_list_path).await?;

        let linter = Arc::new(Linter::new(&config, allow_list)?);

        let src_dir = ctx.root.join(&ctx.config.book.src);
        let mut sources = Vec::new();
        for item in book.iter() {
            if let BookItem::Chapter(chapter) = item {
                if let Some(chapter_path) = &chapter.path {
                    log::debug!("Collecting chapter: {}", chapter.name);
                    sources.push(SourceDocument::new(
                        src_dir.join(chapter_path),
                        chapter.content.clone(),
                    ));
                }
            }
        }

        if sources.is_empty() {
            log::info!("No chapters found to lint");
            return Ok(book);
        }

        let start = Instant::now();
        let report = linter.lint_all(sources, default_jobs()).await?;
        print_run_summary(&report, start.elapsed());

        if report.fails(config.fail_on) {
            report_findings(&report, config.fail_on);
            anyhow::bail!("Documentation lint failed");
        }

        Ok(book)
    }
}

impl Default for DocLintPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor for DocLintPreprocessor {
    fn name(&self) -> &str {
        "doc-lint"
    }

    fn run(&self, ctx: &PreprocessorContext, book: Book) -> Result<Book> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        runtime.block_on(self.run_async(ctx, book))
    }

    fn supports_renderer(&self, renderer: &str) -> bool {
        renderer != "not-supported"
    }
}
