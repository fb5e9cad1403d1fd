use crate::document::{Document, Fence, LineIndex, Markers, Section};
use crate::finding::{Finding, FindingKind, Location};
use crate::language::LanguageSet;
use crate::linter::MAX_HIGHLIGHT_LINES;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// The result of scanning one document.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document: Document,
    /// Malformed, empty and unknown-language fences
    pub findings: Vec<Finding>,
}

/// A fence delimiter line: the fence character, its run length and the info
/// string that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Delimiter<'a> {
    ch: char,
    len: usize,
    info: &'a str,
}

/// Attribute metadata parsed from a fence info string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FenceInfo {
    language: String,
    filename: Option<String>,
    highlight: Option<BTreeSet<u32>>,
    attributes: BTreeMap<String, String>,
    flags: Vec<String>,
}

/// Extracts sections and fenced code blocks from a document.
///
/// The scan is line based so that an unterminated fence can be reported and
/// skipped instead of swallowing the rest of the document:
///
/// - Front matter (`---` ... `---` at the top) is skipped.
/// - ATX headings outside fences open a new [`Section`].
/// - A fence opener is three or more backticks or tildes indented at most
///   three spaces. It is closed by a line of the same character, at least as
///   long, with no info string.
/// - A fence never closed before document end produces a `MalformedFence`
///   finding, yields no [`Fence`], and scanning resumes on the line after
///   the opener. The opener line is recorded on the [`Document`] so later
///   passes read the following lines as prose too.
/// - Empty fences produce an `EmptyFence` finding and are dropped. Fences
///   with a language tag outside `languages` are kept and produce an
///   `UnknownLanguage` finding.
///
/// The nearest comparison marker in the prose before each fence is recorded
/// on it for the pair matcher.
///
/// # Example
///
/// ````ignore
/// let text = "# Setup\n\n```bash filename=\"install.sh\"\nnpm i next\n```\n";
/// let extraction = extract("setup.mdx", text.to_string(), &LanguageSet::builtin(), &Markers::default());
/// assert_eq!(extraction.document.sections()[1].fences[0].language, "bash");
/// ````
pub fn extract(
    path: impl Into<PathBuf>,
    text: String,
    languages: &LanguageSet,
    markers: &Markers,
) -> Extraction {
    let path = path.into();
    let lines: Vec<&str> = text.lines().collect();
    let line_index = LineIndex::new(&text);
    let closing = ClosingRuns::new(&lines);
    let body_start = skip_front_matter(&lines);

    let mut sections = vec![Section::preamble(body_start + 1)];
    let mut findings = Vec::new();
    let mut unclosed = Vec::new();
    let mut pending_marker = None;
    let mut i = body_start;

    while i < lines.len() {
        let line = lines[i];

        if let Some(open) = parse_delimiter(line) {
            let current_idx = sections.len() - 1;
            let current = &mut sections[current_idx];
            let location = Location::new(&path, current.heading.clone(), current.index, i + 1);

            let close = if closing.may_close(i + 1, &open) {
                find_closing(&lines, i + 1, &open)
            } else {
                None
            };

            let Some(close) = close else {
                log::debug!(
                    "{}:{}: unterminated fence, resuming after opener",
                    path.display(),
                    i + 1
                );
                findings.push(Finding::new(
                    FindingKind::MalformedFence,
                    location,
                    format!(
                        "code fence opened with `{}` is never closed",
                        open.ch.to_string().repeat(open.len)
                    ),
                ));
                unclosed.push(i + 1);
                pending_marker = None;
                i += 1;
                continue;
            };

            // Slice the raw text so line endings survive as written
            let start = line_index.offset_of(i + 2).unwrap_or(text.len());
            let end = line_index.offset_of(close + 1).unwrap_or(text.len());
            let body = text[start..end.max(start)].to_string();

            let info = parse_fence_info(open.info);

            if body.trim().is_empty() {
                findings.push(Finding::new(
                    FindingKind::EmptyFence,
                    location,
                    "code fence has an empty body",
                ));
            } else {
                if !info.language.is_empty() && !languages.contains(&info.language) {
                    findings.push(Finding::new(
                        FindingKind::UnknownLanguage,
                        location,
                        format!("unknown fence language `{}`", info.language),
                    ));
                }

                current.fences.push(Fence {
                    language: info.language,
                    filename: info.filename,
                    highlight: info.highlight,
                    attributes: info.attributes,
                    flags: info.flags,
                    body,
                    open_line: i + 1,
                    close_line: close + 1,
                    marker: pending_marker.take(),
                });
            }

            pending_marker = None;
            i = close + 1;
            continue;
        }

        if let Some((level, heading)) = parse_heading(line) {
            let index = sections.len();
            sections.push(Section {
                heading,
                level,
                index,
                line: i + 1,
                fences: Vec::new(),
            });
            pending_marker = None;
        } else if let Some(marker) = markers.detect(line) {
            pending_marker = Some(marker);
        }

        i += 1;
    }

    log::debug!(
        "{}: {} section(s), {} finding(s) during extraction",
        path.display(),
        sections.len(),
        findings.len()
    );

    Extraction {
        document: Document::new(path, text, sections, body_start + 1, unclosed),
        findings,
    }
}

/// Returns the index of the first line after the front matter, or 0.
fn skip_front_matter(lines: &[&str]) -> usize {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return 0;
    }

    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| l.trim_end() == "---")
        .map(|(i, _)| i + 1)
        .unwrap_or(0)
}

fn parse_delimiter(line: &str) -> Option<Delimiter<'_>> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }

    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }

    let len = trimmed.chars().take_while(|c| *c == ch).count();
    if len < 3 {
        return None;
    }

    let info = trimmed[len * ch.len_utf8()..].trim();
    // Backtick fences cannot carry backticks in their info string
    if ch == '`' && info.contains('`') {
        return None;
    }

    Some(Delimiter { ch, len, info })
}

/// For every line, the longest bare closing run of each fence character on
/// that line or after it.
///
/// An opener whose run is longer than anything below it can never be closed,
/// so it is rejected without walking the rest of the document.
struct ClosingRuns {
    backtick: Vec<usize>,
    tilde: Vec<usize>,
}

impl ClosingRuns {
    fn new(lines: &[&str]) -> Self {
        let mut backtick = vec![0; lines.len() + 1];
        let mut tilde = vec![0; lines.len() + 1];

        for (j, line) in lines.iter().enumerate().rev() {
            backtick[j] = backtick[j + 1];
            tilde[j] = tilde[j + 1];
            if let Some(d) = parse_delimiter(line).filter(|d| d.info.is_empty()) {
                let runs = if d.ch == '`' { &mut backtick } else { &mut tilde };
                runs[j] = runs[j].max(d.len);
            }
        }

        Self { backtick, tilde }
    }

    fn may_close(&self, from: usize, open: &Delimiter<'_>) -> bool {
        let runs = if open.ch == '`' {
            &self.backtick
        } else {
            &self.tilde
        };
        runs.get(from).is_some_and(|&longest| longest >= open.len)
    }
}

fn find_closing(lines: &[&str], from: usize, open: &Delimiter<'_>) -> Option<usize> {
    (from..lines.len()).find(|&j| {
        parse_delimiter(lines[j])
            .is_some_and(|d| d.ch == open.ch && d.len >= open.len && d.info.is_empty())
    })
}

/// Parses an ATX heading into its level and text.
fn parse_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }

    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }

    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }

    let mut text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty()
        || without_closing.ends_with(' ')
        || without_closing.ends_with('\t')
    {
        text = without_closing.trim_end();
    }

    Some((level as u8, text.to_string()))
}

/// Parse a fence info string into language and attribute metadata.
///
/// Examples:
/// - `jsx` -> language "jsx"
/// - `tsx filename="app/page.tsx" switcher` -> filename and a `switcher` flag
/// - `js {1,3-4}` or `js highlight={1,3-4}` -> highlight lines 1, 3, 4
/// - `c,ignore` -> language "c" with an `ignore` flag
fn parse_fence_info(info: &str) -> FenceInfo {
    let mut result = FenceInfo::default();
    let tokens = tokenize_info(info);
    let mut tokens = tokens.iter().map(String::as_str).peekable();

    if let Some(&first) = tokens.peek() {
        if !first.contains('=') && !first.starts_with('{') {
            let mut parts = first.split(',').map(|s| s.trim());
            result.language = parts.next().unwrap_or_default().to_string();
            result
                .flags
                .extend(parts.filter(|s| !s.is_empty()).map(str::to_string));
            tokens.next();
        }
    }

    for token in tokens {
        if let Some((key, value)) = token.split_once('=') {
            let key = key.trim();
            let value = unquote(value.trim());
            match key {
                "filename" | "file" | "title" if result.filename.is_none() => {
                    result.filename = Some(value.to_string());
                }
                "highlight" | "hl" => result.highlight = parse_highlight(value),
                _ => {
                    result.attributes.insert(key.to_string(), value.to_string());
                }
            }
        } else if token.starts_with('{') {
            result.highlight = parse_highlight(token);
        } else {
            result.flags.push(token.to_string());
        }
    }

    result
}

/// Splits an info string on whitespace, keeping quoted and braced values
/// together.
fn tokenize_info(info: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for ch in info.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '{') => {
                depth += 1;
                current.push(ch);
            }
            (None, '}') => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            (None, c) if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            (None, c) => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn unquote(value: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('{', '}')] {
        if value.len() >= 2 && value.starts_with(open) && value.ends_with(close) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parses `{1,3-5}` or `1,3-5` into a set of line numbers.
///
/// Sets larger than [`MAX_HIGHLIGHT_LINES`] are treated as unparseable.
fn parse_highlight(value: &str) -> Option<BTreeSet<u32>> {
    let inner = unquote(value.trim());
    let mut lines = BTreeSet::new();

    for part in inner.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().ok()?;
                let end: u32 = end.trim().parse().ok()?;
                if start > end || end - start >= MAX_HIGHLIGHT_LINES {
                    return None;
                }
                lines.extend(start..=end);
            }
            None => {
                lines.insert(part.parse().ok()?);
            }
        }

        if lines.len() > MAX_HIGHLIGHT_LINES as usize {
            return None;
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}
