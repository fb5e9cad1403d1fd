use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How serious a [`Finding`] is.
///
/// Ordered so that `Info < Warning < Error`, which lets the report sort by
/// severity and compare against the configured failure threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// The condition a [`Finding`] reports.
///
/// Every recoverable problem the linter detects is one of these; none of them
/// stop the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FindingKind {
    /// A fence was opened and never closed before the end of the document.
    MalformedFence,
    /// A "Before:" fence has no matching "After:" fence in its section.
    DanglingComparison,
    /// An API-looking identifier is missing from the allow-list.
    UnknownReference,
    /// An "After:" fence with no pending "Before:" fence.
    OrphanAfter,
    /// The two sides of a comparison name different files.
    FilenameMismatch,
    /// A fence whose body is empty or whitespace-only.
    EmptyFence,
    /// A fence language tag outside the known-language set.
    UnknownLanguage,
    /// A link to an allow-listed API that does not point at its canonical URL.
    NonCanonicalLink,
}

impl FindingKind {
    pub fn severity(self) -> Severity {
        match self {
            FindingKind::MalformedFence | FindingKind::UnknownReference => Severity::Error,
            FindingKind::DanglingComparison
            | FindingKind::FilenameMismatch
            | FindingKind::EmptyFence
            | FindingKind::UnknownLanguage
            | FindingKind::NonCanonicalLink => Severity::Warning,
            FindingKind::OrphanAfter => Severity::Info,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where a finding was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub document: PathBuf,
    /// Heading text of the enclosing section, empty for the preamble.
    pub section: String,
    /// Position of the section within its document, starting at 0.
    pub section_index: usize,
    /// 1-based line number in the raw document text.
    pub line: usize,
}

impl Location {
    pub fn new(
        document: &Path,
        section: impl Into<String>,
        section_index: usize,
        line: usize,
    ) -> Self {
        Self {
            document: document.to_path_buf(),
            section: section.into(),
            section_index,
            line,
        }
    }

    /// The section label used in human-readable output.
    pub fn section_label(&self) -> &str {
        if self.section.is_empty() {
            "(preamble)"
        } else {
            &self.section
        }
    }
}

/// A single problem found in a document.
///
/// Findings are created by the extractor, pair matcher and reference checker
/// and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    severity: Severity,
    kind: FindingKind,
    location: Location,
    message: String,
}

impl Finding {
    pub fn new(kind: FindingKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            location,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn kind(&self) -> FindingKind {
        self.kind
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}] {}: {}",
            self.location.document.display(),
            self.location.line,
            self.severity,
            self.kind,
            self.location.section_label(),
            self.message
        )
    }
}
