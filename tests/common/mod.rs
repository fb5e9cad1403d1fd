//! Common test utilities for integration tests
//!
//! This module contains shared test fixtures and helper functions used across
//! integration tests. These utilities are not compiled into the library.

#![allow(dead_code)]

use anyhow::Result;
use doc_lint::{AllowList, DocLintPreprocessor, LintConfig, Linter};
use mdbook::book::Book;
use mdbook::preprocess::CmdPreprocessor;
use mdbook::MDBook;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Isolated test fixture with automatic cleanup
///
/// Creates a temporary copy of a fixture directory, allowing tests to run
/// in parallel without interfering with each other.
pub struct TestFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture from a specific source directory
    pub fn new_from(source: impl AsRef<Path>) -> Result<Self> {
        let dir = TempDir::new()?;

        copy_dir_all(source.as_ref(), dir.path())?;

        Ok(Self {
            path: dir.path().to_path_buf(),
            _dir: dir,
        })
    }

    /// Get the path to the fixture copy
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the fixture copy
    pub fn file(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }
}

/// Builds a linter with the default configuration and the shared fixture
/// allow-list.
pub async fn fixture_linter() -> Result<Arc<Linter>> {
    let allow_list = AllowList::load(Path::new("tests/fixtures/apis.txt")).await?;
    Ok(Arc::new(Linter::new(&LintConfig::default(), allow_list)?))
}

/// Helper to run the preprocessor on a test book
///
/// Wraps an MDBook instance and simulates how mdBook would invoke the
/// preprocessor.
pub struct PreprocessorTest {
    book: MDBook,
}

impl PreprocessorTest {
    /// Create a preprocessor test from a fixture
    pub fn from_fixture(fixture: &TestFixture) -> Result<Self> {
        let book = MDBook::load(fixture.path())?;
        Ok(Self { book })
    }

    /// Run the preprocessor on the test book
    pub async fn run(&self) -> Result<Book> {
        // Create JSON input like mdbook would send
        let input_json = serde_json::json!([
            {
                "root": self.book.root,
                "config": self.book.config,
                "renderer": "html",
                "mdbook_version": mdbook::MDBOOK_VERSION,
            },
            self.book.book
        ]);

        let input_str = serde_json::to_string(&input_json)?;
        let (ctx, book) = CmdPreprocessor::parse_input(input_str.as_bytes())?;

        let preprocessor = DocLintPreprocessor::new();
        preprocessor.run_async(&ctx, book).await
    }

    pub fn book(&self) -> &Book {
        &self.book.book
    }
}

/// Recursively copy all files and directories from src to dst
fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(&dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}
