//! Integration tests for doc-lint
//!
//! These tests verify the full end-to-end workflow: loading the allow-list,
//! reading documents, running the pipeline, rendering reports, running as an
//! mdBook preprocessor and the CLI exit codes.
//!
//! ## Test Architecture
//!
//! Tests that need to write files use `TestFixture` to create an isolated
//! copy of a fixture directory that is cleaned up on drop, so every test can
//! run in parallel.
//!
//! ## Adding New Tests
//!
//! 1. Create a new fixture in tests/fixtures/ if needed
//! 2. Use `TestFixture::new_from("tests/fixtures/...")`
//! 3. Use `#[tokio::test]` for async tests

mod common;

use anyhow::Result;
use common::{fixture_linter, PreprocessorTest, TestFixture};
use doc_lint::{
    read_documents, AllowList, AllowListLoadError, FindingKind, ReportFormat, Severity,
};
use std::path::{Path, PathBuf};
use std::process::Command;

const CLEAN_DOC: &str = "tests/fixtures/docs/dynamic-rendering.mdx";
const BROKEN_DOC: &str = "tests/fixtures/docs/route-groups.mdx";
const ALLOW_LIST: &str = "tests/fixtures/apis.txt";

// ===== Pipeline =====

#[tokio::test]
async fn integration_clean_document_has_no_findings() -> Result<()> {
    let linter = fixture_linter().await?;
    let sources = read_documents(&[PathBuf::from(CLEAN_DOC)]).await?;

    let report = linter.lint_all(sources, 2).await?;
    let document = &report.documents()[0];

    assert!(
        document.findings().is_empty(),
        "Unexpected findings: {:?}",
        document.findings()
    );
    assert_eq!(document.fences(), 3);
    assert_eq!(document.comparisons(), 1);
    assert!(!report.fails(Severity::Info));
    Ok(())
}

#[tokio::test]
async fn integration_broken_document_findings_in_report_order() -> Result<()> {
    let linter = fixture_linter().await?;
    let sources = read_documents(&[PathBuf::from(BROKEN_DOC)]).await?;

    let report = linter.lint_all(sources, 1).await?;
    let findings = report.documents()[0].findings();

    let summary: Vec<_> = findings
        .iter()
        .map(|f| (f.location().section.as_str(), f.kind(), f.location().line))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Convention", FindingKind::UnknownReference, 19),
            ("Convention", FindingKind::DanglingComparison, 13),
            ("Examples", FindingKind::MalformedFence, 31),
            ("Examples", FindingKind::OrphanAfter, 25),
        ]
    );

    let counts = report.summary();
    assert_eq!(counts.errors, 2);
    assert_eq!(counts.warnings, 1);
    assert_eq!(counts.infos, 1);
    assert!(report.fails(Severity::Error));
    Ok(())
}

#[tokio::test]
async fn integration_reports_are_byte_identical_across_runs() -> Result<()> {
    let paths = vec![PathBuf::from(CLEAN_DOC), PathBuf::from(BROKEN_DOC)];

    let first = fixture_linter()
        .await?
        .lint_all(read_documents(&paths).await?, 4)
        .await?;
    let second = fixture_linter()
        .await?
        .lint_all(read_documents(&paths).await?, 1)
        .await?;

    assert_eq!(
        first.render(ReportFormat::Text)?,
        second.render(ReportFormat::Text)?
    );
    assert_eq!(
        first.render(ReportFormat::Json)?,
        second.render(ReportFormat::Json)?
    );
    Ok(())
}

#[tokio::test]
async fn integration_missing_allow_list_is_fatal() -> Result<()> {
    let result = AllowList::load(Path::new("tests/fixtures/does-not-exist.txt")).await;
    assert!(matches!(result, Err(AllowListLoadError::Read { .. })));
    Ok(())
}

#[tokio::test]
async fn integration_unparseable_allow_list_is_fatal() -> Result<()> {
    let fixture = TestFixture::new_from("tests/fixtures/docs")?;
    let path = fixture.file("apis.json");
    std::fs::write(&path, "{ not json")?;

    let result = AllowList::load(&path).await;
    assert!(matches!(result, Err(AllowListLoadError::Parse { .. })));
    Ok(())
}

// ===== mdBook preprocessor =====

#[tokio::test]
async fn integration_clean_book_passes_unchanged() -> Result<()> {
    let fixture = TestFixture::new_from("tests/fixtures/book")?;
    let test = PreprocessorTest::from_fixture(&fixture)?;
    let original_sections = test.book().sections.len();

    let result = test.run().await;

    assert!(result.is_ok(), "Clean book should pass: {:?}", result.err());
    assert_eq!(
        result?.sections.len(),
        original_sections,
        "Preprocessor should not modify book structure"
    );
    Ok(())
}

#[tokio::test]
async fn integration_nested_chapters_linted() -> Result<()> {
    let fixture = TestFixture::new_from("tests/fixtures/book")?;

    // Break only the nested chapter
    let nested = fixture.file("src/routing/redirecting.md");
    let content = std::fs::read_to_string(&nested)?;
    std::fs::write(&nested, content + "\nSee `useFormStatus`.\n")?;

    let test = PreprocessorTest::from_fixture(&fixture)?;
    let result = test.run().await;

    assert!(result.is_err(), "Nested chapter error should fail the book");
    Ok(())
}

#[tokio::test]
async fn integration_broken_book_rejected() -> Result<()> {
    let fixture = TestFixture::new_from("tests/fixtures/broken_book")?;
    let test = PreprocessorTest::from_fixture(&fixture)?;

    let result = test.run().await;

    assert!(result.is_err(), "Unknown reference should fail the book");
    if let Err(e) = result {
        let error_msg = format!("{:#}", e);
        assert!(
            error_msg.contains("Documentation lint failed"),
            "Wrong error: {}",
            error_msg
        );
    }
    Ok(())
}

#[tokio::test]
async fn integration_book_without_allow_list_rejected() -> Result<()> {
    let fixture = TestFixture::new_from("tests/fixtures/book")?;
    std::fs::remove_file(fixture.file("apis.txt"))?;

    let test = PreprocessorTest::from_fixture(&fixture)?;
    let result = test.run().await;

    assert!(result.is_err(), "Missing allow-list should abort");
    if let Err(e) = result {
        assert!(
            format!("{:#}", e).contains("Failed to read allow-list"),
            "Wrong error: {:#}",
            e
        );
    }
    Ok(())
}

// ===== CLI =====

fn doc_lint() -> Command {
    Command::new(env!("CARGO_BIN_EXE_doc-lint"))
}

#[test]
fn integration_cli_exit_code_clean() -> Result<()> {
    let output = doc_lint()
        .args(["check", "--allow-list", ALLOW_LIST, CLEAN_DOC])
        .output()?;

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Summary: 1 document(s), 0 error(s)"));
    Ok(())
}

#[test]
fn integration_cli_exit_code_findings() -> Result<()> {
    let output = doc_lint()
        .args(["check", "-a", ALLOW_LIST, "--format", "json", CLEAN_DOC, BROKEN_DOC])
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["summary"]["documents"], 2);
    assert_eq!(report["summary"]["errors"], 2);
    Ok(())
}

#[test]
fn integration_cli_exit_code_fatal() -> Result<()> {
    let output = doc_lint()
        .args(["check", "--allow-list", "tests/fixtures/missing.txt", CLEAN_DOC])
        .output()?;

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Failed to read allow-list"));
    Ok(())
}

#[test]
fn integration_cli_fail_on_warning_and_output_file() -> Result<()> {
    let fixture = TestFixture::new_from("tests/fixtures/docs")?;
    let config = fixture.file("doc-lint.toml");
    std::fs::write(&config, "fail-on = \"warning\"\n")?;

    // One extra warning-only document: a dangling comparison
    let doc = fixture.file("dangling.mdx");
    std::fs::write(&doc, "## Migrate\n\nBefore:\n\n```js\nold()\n```\n")?;
    let report_path = fixture.file("report.txt");

    let output = doc_lint()
        .arg("check")
        .args(["--allow-list", ALLOW_LIST])
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&report_path)
        .arg(&doc)
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let report = std::fs::read_to_string(&report_path)?;
    assert!(report.contains("warning[DanglingComparison] Migrate"));
    Ok(())
}

#[test]
fn integration_cli_supports_renderer() -> Result<()> {
    let status = doc_lint().args(["supports", "html"]).status()?;
    assert!(status.success());

    let status = doc_lint().args(["supports", "not-supported"]).status()?;
    assert!(!status.success());
    Ok(())
}
