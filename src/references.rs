use crate::allow_list::AllowList;
use crate::document::Document;
use crate::finding::{Finding, FindingKind, Location};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;

/// Default naming pattern for identifiers that look like framework APIs:
/// camelCase names (`useOptimistic`, `revalidatePath`) and call-form names
/// (`connection()`, `cookies()`).
pub const DEFAULT_API_PATTERN: &str =
    r"^(?:[a-z][a-z0-9]*(?:[A-Z][a-z0-9]*)+|[A-Za-z_][A-Za-z0-9_]*\(\))$";

/// A link being collected while its text events stream past.
struct OpenLink {
    dest: String,
    text: String,
    offset: usize,
}

/// Checks inline code spans and link text against the allow-list.
///
/// Inline code is tested whole against `pattern`; link text outside inline
/// code is split into identifier-like words first. A matching identifier
/// (with any trailing `()` removed) that is missing from the allow-list is
/// an `UnknownReference` error. A link whose text is an allow-listed
/// identifier but whose destination is not that identifier's canonical URL
/// is a `NonCanonicalLink` warning.
///
/// Fenced code, indented code and front matter are never inspected. Text
/// after an unterminated fence is checked as prose.
pub fn check_references(
    document: &Document,
    allow_list: &AllowList,
    pattern: &Regex,
) -> Vec<Finding> {
    let base = document.body_offset();
    let mut findings = Vec::new();
    let mut link: Option<OpenLink> = None;
    let mut in_code_block = false;

    let mut report = |offset: usize, kind: FindingKind, message: String| {
        let line = document.line_index().line_of(base + offset);
        let section = document.section_at_line(line);
        findings.push(Finding::new(
            kind,
            Location::new(document.path(), section.heading.clone(), section.index, line),
            message,
        ));
    };

    // Unclosed fence openers are blanked so the parser agrees with the
    // extractor about where prose resumes
    let body = document.prose_body();
    for (event, range) in Parser::new(&body).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Start(Tag::Link { dest_url, .. }) => {
                link = Some(OpenLink {
                    dest: dest_url.to_string(),
                    text: String::new(),
                    offset: range.start,
                });
            }
            Event::End(TagEnd::Link) => {
                if let Some(open) = link.take() {
                    check_link(&open, allow_list, &mut report);
                }
            }
            Event::Code(code) => {
                check_token(code.trim(), range.start, pattern, allow_list, &mut report);
                if let Some(open) = link.as_mut() {
                    open.text.push_str(&code);
                }
            }
            Event::Text(text) if !in_code_block => {
                if let Some(open) = link.as_mut() {
                    open.text.push_str(&text);
                    for word in identifier_words(&text) {
                        check_token(word, range.start, pattern, allow_list, &mut report);
                    }
                }
            }
            _ => {}
        }
    }

    log::debug!(
        "{}: {} reference finding(s)",
        document.path().display(),
        findings.len()
    );

    findings
}

fn check_token(
    token: &str,
    offset: usize,
    pattern: &Regex,
    allow_list: &AllowList,
    report: &mut dyn FnMut(usize, FindingKind, String),
) {
    if !pattern.is_match(token) {
        return;
    }

    let name = token.trim_end_matches("()");
    if !allow_list.contains(name) {
        report(
            offset,
            FindingKind::UnknownReference,
            format!("`{}` is not a known API reference", name),
        );
    }
}

fn check_link(
    link: &OpenLink,
    allow_list: &AllowList,
    report: &mut dyn FnMut(usize, FindingKind, String),
) {
    let name = link.text.trim().trim_end_matches("()");
    let Some(canonical) = allow_list.url(name) else {
        return;
    };

    if !urls_equivalent(&link.dest, canonical) {
        report(
            link.offset,
            FindingKind::NonCanonicalLink,
            format!(
                "link to `{}` points to {} instead of {}",
                name, link.dest, canonical
            ),
        );
    }
}

/// Splits prose into identifier-like words.
fn identifier_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Compares two URLs ignoring fragment, query and trailing slash. When one
/// side is a bare path, the other is compared by path only.
fn urls_equivalent(a: &str, b: &str) -> bool {
    let a = normalize_url(a);
    let b = normalize_url(b);

    if a == b {
        return true;
    }

    match (a.starts_with('/'), b.starts_with('/')) {
        (true, false) => url_path(&b) == a,
        (false, true) => url_path(&a) == b,
        _ => false,
    }
}

fn normalize_url(url: &str) -> String {
    let end = url.find(['#', '?']).unwrap_or(url.len());
    let trimmed = url[..end].trim_end_matches('/');
    if trimmed.is_empty() && url.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn url_path(url: &str) -> String {
    match url.split_once("://") {
        Some((_, rest)) => match rest.find('/') {
            Some(i) => rest[i..].to_string(),
            None => "/".to_string(),
        },
        None => url.to_string(),
    }
}
