//! Context-anchored patch application.
//!
//! Hunk headers are never trusted: generators routinely miscount line numbers,
//! so each hunk is located purely by its context and removed lines. An exact
//! substring match is tried first; failing that, a line window is compared with
//! leading and trailing whitespace ignored. Hunks that match nowhere are skipped
//! and the rest still apply.

use crate::types::{DiffLine, DiffLineKind, Hunk};

/// Outcome of applying patch text to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// The patched document.
    pub text: String,
    /// Number of hunks that found their context and were applied.
    pub applied: usize,
    /// Zero-based indices of hunks that were skipped.
    pub skipped: Vec<usize>,
}

/// How a hunk was located in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Exact,
    Fuzzy { line: usize },
    Empty,
}

/// Applies `diff` to `original` and returns the best-effort result.
///
/// Never fails: unlocatable hunks are skipped and logged.
pub fn apply_diff(original: &str, diff: &str) -> String {
    apply_diff_report(original, diff).text
}

/// Applies `diff` to `original`, reporting which hunks were skipped.
pub fn apply_diff_report(original: &str, diff: &str) -> PatchReport {
    let hunks = parse_hunks(diff);
    let report = apply_hunks(original, &hunks);
    for &index in &report.skipped {
        tracing::warn!(
            hunk = index,
            header = %hunks[index].header,
            "hunk context not found, skipping"
        );
    }
    report
}

/// Same as [`apply_diff_report`] but leaves skipped hunks to the caller.
pub(crate) fn apply_diff_quiet(original: &str, diff: &str) -> PatchReport {
    apply_hunks(original, &parse_hunks(diff))
}

fn apply_hunks(original: &str, hunks: &[Hunk]) -> PatchReport {
    let mut text = original.to_owned();
    let mut applied = 0;
    let mut skipped = Vec::new();

    for (index, hunk) in hunks.iter().enumerate() {
        match apply_hunk(&text, hunk) {
            Some((next, anchor)) => {
                tracing::trace!(hunk = index, ?anchor, "hunk applied");
                text = next;
                applied += 1;
            }
            None => skipped.push(index),
        }
    }

    PatchReport { text, applied, skipped }
}

/// Splits patch text into hunks.
///
/// Anything before the first `@@` line (file headers, prose) is ignored. Inside
/// a hunk, ` `/`-`/`+` select the line kind; an empty line is an empty context
/// line, `\` markers are dropped, and any other line is taken as context with
/// its full text since generators often omit the leading space.
///
/// Empty lines at the end of a hunk are dropped. Only a ` ` line can anchor on
/// a trailing empty line.
pub fn parse_hunks(diff: &str) -> Vec<Hunk> {
    let mut hunks: Vec<Hunk> = Vec::new();
    // Blank lines seen since the last non-blank line of the current hunk.
    let mut blanks = 0;

    for raw in diff.split('\n') {
        if raw.starts_with("@@") {
            hunks.push(Hunk { header: raw.to_owned(), lines: Vec::new() });
            blanks = 0;
            continue;
        }
        let Some(hunk) = hunks.last_mut() else {
            continue;
        };
        if raw.is_empty() {
            blanks += 1;
            continue;
        }
        for _ in 0..std::mem::take(&mut blanks) {
            hunk.lines.push(DiffLine { kind: DiffLineKind::Context, content: String::new() });
        }
        let (kind, content) = match raw.as_bytes().first() {
            Some(b' ') => (DiffLineKind::Context, &raw[1..]),
            Some(b'-') => (DiffLineKind::Removed, &raw[1..]),
            Some(b'+') => (DiffLineKind::Added, &raw[1..]),
            Some(b'\\') => continue,
            _ => (DiffLineKind::Context, raw),
        };
        hunk.lines.push(DiffLine { kind, content: content.to_owned() });
    }

    hunks
}

/// Locates and applies one hunk, or returns `None` if its context is not found.
fn apply_hunk(doc: &str, hunk: &Hunk) -> Option<(String, Anchor)> {
    let search = hunk.search_block();
    let replace = hunk.replace_block().join("\n");

    // No anchor: the added lines go on top.
    if search.is_empty() {
        if replace.is_empty() || doc.is_empty() {
            return Some((format!("{replace}{doc}"), Anchor::Empty));
        }
        return Some((format!("{replace}\n{doc}"), Anchor::Empty));
    }

    let needle = search.join("\n");
    if let Some(at) = doc.find(&needle) {
        let mut out = String::with_capacity(doc.len() - needle.len() + replace.len());
        out.push_str(&doc[..at]);
        out.push_str(&replace);
        out.push_str(&doc[at + needle.len()..]);
        return Some((out, Anchor::Exact));
    }

    let lines: Vec<&str> = doc.split('\n').collect();
    let offset = find_fuzzy_window(&lines, &search)?;
    let window = &lines[offset..offset + search.len()];

    // Context lines keep the document's own text so indentation survives.
    let mut doc_lines = window.iter();
    let mut spliced: Vec<&str> = Vec::with_capacity(lines.len() + hunk.lines.len());
    spliced.extend_from_slice(&lines[..offset]);
    for line in &hunk.lines {
        match line.kind {
            DiffLineKind::Context => spliced.extend(doc_lines.next()),
            DiffLineKind::Removed => {
                doc_lines.next();
            }
            DiffLineKind::Added => spliced.push(&line.content),
        }
    }
    spliced.extend_from_slice(&lines[offset + search.len()..]);

    Some((spliced.join("\n"), Anchor::Fuzzy { line: offset + 1 }))
}

/// First window offset whose lines equal `search` after trimming both sides.
fn find_fuzzy_window(lines: &[&str], search: &[&str]) -> Option<usize> {
    if search.len() > lines.len() {
        return None;
    }
    (0..=lines.len() - search.len()).find(|&offset| {
        lines[offset..offset + search.len()]
            .iter()
            .zip(search)
            .all(|(doc, want)| doc.trim() == want.trim())
    })
}
