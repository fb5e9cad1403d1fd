use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Which side of a before/after comparison a fence belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Marker {
    Before,
    After,
}

/// The prose labels that mark a fence as one side of a comparison.
///
/// A line counts as a marker when, after stripping emphasis characters, it
/// starts with the label (case-insensitive). `**Before:**`, `_After:_` and
/// `Before: the old API` all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    before: String,
    after: String,
}

impl Markers {
    /// Labels are normalized the same way as prose lines, so a label
    /// written as `**Before:**` or `before_change:` still matches.
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: normalize_marker(&before.into()),
            after: normalize_marker(&after.into()),
        }
    }

    /// The normalized before and after labels.
    pub fn labels(&self) -> (&str, &str) {
        (&self.before, &self.after)
    }

    pub fn detect(&self, line: &str) -> Option<Marker> {
        let text = normalize_marker(line);
        if text.is_empty() {
            return None;
        }

        if text.starts_with(&self.before) {
            Some(Marker::Before)
        } else if text.starts_with(&self.after) {
            Some(Marker::After)
        } else {
            None
        }
    }
}

/// Strips emphasis characters and surrounding whitespace, lowercased.
fn normalize_marker(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '*' && *c != '_')
        .collect::<String>()
        .trim()
        .to_lowercase()
}

impl Default for Markers {
    fn default() -> Self {
        Self::new("Before:", "After:")
    }
}

/// A fenced code block.
///
/// ````markdown
/// ```tsx filename="app/page.tsx" highlight={2,4-5} switcher
/// export default function Page() {}
/// ```
/// ````
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fence {
    /// Language tag from the info string, possibly empty
    pub language: String,
    pub filename: Option<String>,
    /// Highlighted body lines, `None` when absent or unparseable
    pub highlight: Option<BTreeSet<u32>>,
    /// Remaining `key=value` attributes, quotes and braces stripped
    pub attributes: BTreeMap<String, String>,
    /// Bare flags such as `switcher` or a comma suffix like `js,ignore`
    pub flags: Vec<String>,
    pub body: String,
    /// 1-based line of the opening delimiter
    pub open_line: usize,
    /// 1-based line of the closing delimiter
    pub close_line: usize,
    /// Comparison marker found in the prose preceding this fence
    pub marker: Option<Marker>,
}

/// A heading and the fences directly beneath it.
///
/// Section 0 is always the implicit preamble (level 0, empty heading) that
/// holds anything before the first heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: String,
    pub level: u8,
    pub index: usize,
    pub line: usize,
    pub fences: Vec<Fence>,
}

impl Section {
    pub(crate) fn preamble(line: usize) -> Self {
        Self {
            heading: String::new(),
            level: 0,
            index: 0,
            line,
            fences: Vec::new(),
        }
    }
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|start| *start <= offset)
    }

    /// Byte offset at which the given 1-based line starts.
    pub fn offset_of(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|i| self.line_starts.get(i))
            .copied()
    }
}

/// A loaded document and its section structure.
///
/// Built once by the extractor and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    text: String,
    sections: Vec<Section>,
    line_index: LineIndex,
    body_line: usize,
    /// 1-based opener lines of fences that were never closed
    unclosed_fences: Vec<usize>,
    digest: String,
}

impl Document {
    pub(crate) fn new(
        path: PathBuf,
        text: String,
        sections: Vec<Section>,
        body_line: usize,
        unclosed_fences: Vec<usize>,
    ) -> Self {
        let line_index = LineIndex::new(&text);
        let digest = compute_digest(&text);
        Self {
            path,
            text,
            sections,
            line_index,
            body_line,
            unclosed_fences,
            digest,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn fences(&self) -> impl Iterator<Item = &Fence> {
        self.sections.iter().flat_map(|s| s.fences.iter())
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// The text after any front matter.
    pub fn body(&self) -> &str {
        let offset = self.body_offset();
        &self.text[offset..]
    }

    /// [`Document::body`] with the opener lines of unterminated fences
    /// replaced by spaces.
    ///
    /// A CommonMark parser would otherwise run such a fence to the end of the
    /// document, while the extractor reads the lines after it as prose. Byte
    /// offsets are the same as in [`Document::body`].
    pub fn prose_body(&self) -> Cow<'_, str> {
        let body = self.body();
        if self.unclosed_fences.is_empty() {
            return Cow::Borrowed(body);
        }

        let base = self.body_offset();
        let mut prose = body.to_string();
        for &line in &self.unclosed_fences {
            let Some(start) = self
                .line_index
                .offset_of(line)
                .and_then(|offset| offset.checked_sub(base))
            else {
                continue;
            };
            let end = prose[start..]
                .find('\n')
                .map_or(prose.len(), |n| start + n);
            prose.replace_range(start..end, &" ".repeat(end - start));
        }

        Cow::Owned(prose)
    }

    pub fn unclosed_fences(&self) -> &[usize] {
        &self.unclosed_fences
    }

    /// Byte offset where [`Document::body`] starts in [`Document::text`].
    pub fn body_offset(&self) -> usize {
        self.line_index
            .offset_of(self.body_line)
            .unwrap_or(self.text.len())
            .min(self.text.len())
    }

    /// SHA-256 of the raw text, hex-encoded.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The section a 1-based line falls in.
    pub fn section_at_line(&self, line: usize) -> &Section {
        let idx = self
            .sections
            .partition_point(|s| s.line <= line)
            .saturating_sub(1);
        &self.sections[idx]
    }
}

fn compute_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
