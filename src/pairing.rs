use crate::document::{Document, Fence, Marker, Section};
use crate::finding::{Finding, FindingKind, Location};
use serde::Serialize;

/// A "Before:" fence and the "After:" fence that replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonUnit<'a> {
    pub section_index: usize,
    pub before: &'a Fence,
    pub after: &'a Fence,
}

impl ComparisonUnit<'_> {
    /// The filename both sides agree on, if either names one.
    pub fn filename(&self) -> Option<&str> {
        self.before
            .filename
            .as_deref()
            .or(self.after.filename.as_deref())
    }
}

/// Comparison units and pairing problems for one document.
#[derive(Debug, Clone, Default)]
pub struct Pairing<'a> {
    pub units: Vec<ComparisonUnit<'a>>,
    pub findings: Vec<Finding>,
}

/// Groups marked fences into before/after comparison units, section by
/// section.
///
/// Within a section a "Before:" fence waits for the next "After:" fence;
/// unmarked fences in between are ignored. A pending "Before:" fence is
/// reported as dangling when another "Before:" fence arrives or the section
/// ends. An "After:" fence with nothing pending is reported as an orphan.
/// When both sides name a file and the names differ, no unit is formed.
pub fn match_pairs(document: &Document) -> Pairing<'_> {
    let mut pairing = Pairing::default();

    for section in document.sections() {
        match_section(document, section, &mut pairing);
    }

    log::debug!(
        "{}: {} comparison unit(s)",
        document.path().display(),
        pairing.units.len()
    );

    pairing
}

fn match_section<'a>(document: &Document, section: &'a Section, pairing: &mut Pairing<'a>) {
    let location = |line: usize| {
        Location::new(
            document.path(),
            section.heading.clone(),
            section.index,
            line,
        )
    };

    let mut pending: Option<&'a Fence> = None;

    for fence in &section.fences {
        match fence.marker {
            Some(Marker::Before) => {
                if let Some(before) = pending.replace(fence) {
                    pairing.findings.push(Finding::new(
                        FindingKind::DanglingComparison,
                        location(before.open_line),
                        "\"Before:\" example is followed by another \"Before:\" example instead of an \"After:\" example",
                    ));
                }
            }
            Some(Marker::After) => match pending.take() {
                Some(before) => match (&before.filename, &fence.filename) {
                    (Some(old), Some(new)) if old != new => {
                        pairing.findings.push(Finding::new(
                            FindingKind::FilenameMismatch,
                            location(fence.open_line),
                            format!(
                                "\"After:\" example is for `{}` but its \"Before:\" example on line {} is for `{}`",
                                new, before.open_line, old
                            ),
                        ));
                    }
                    _ => pairing.units.push(ComparisonUnit {
                        section_index: section.index,
                        before,
                        after: fence,
                    }),
                },
                None => {
                    pairing.findings.push(Finding::new(
                        FindingKind::OrphanAfter,
                        location(fence.open_line),
                        "\"After:\" example has no preceding \"Before:\" example",
                    ));
                }
            },
            None => {}
        }
    }

    if let Some(before) = pending {
        pairing.findings.push(Finding::new(
            FindingKind::DanglingComparison,
            location(before.open_line),
            "\"Before:\" example has no matching \"After:\" example in this section",
        ));
    }
}
