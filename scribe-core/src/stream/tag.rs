//! Opening-tag recognition for the `<ns-…>` protocol.
//!
//! The scanner works on an arbitrary prefix of the stream, so every decision
//! it makes must be stable under more input arriving: a candidate is only
//! rejected once no continuation could make it valid, and only accepted once
//! its closing `>` has been seen.

use crate::types::{Annotation, Plan, Severity};

/// Every protocol tag starts with this.
pub(crate) const PREFIX: &str = "<ns-";

/// Opening tags longer than this without a closing `>` are abandoned.
pub(crate) const MAX_OPEN_TAG_LEN: usize = 8 * 1024;

/// The tag kinds the protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagName {
    File,
    Patch,
    Dependency,
    Annotation,
    Plan,
    Reasoning,
    Summary,
    Command,
}

impl TagName {
    pub const ALL: [TagName; 8] = [
        TagName::File,
        TagName::Patch,
        TagName::Dependency,
        TagName::Annotation,
        TagName::Plan,
        TagName::Reasoning,
        TagName::Summary,
        TagName::Command,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TagName::File => "file",
            TagName::Patch => "patch",
            TagName::Dependency => "dependency",
            TagName::Annotation => "annotation",
            TagName::Plan => "plan",
            TagName::Reasoning => "reasoning",
            TagName::Summary => "summary",
            TagName::Command => "command",
        }
    }

    fn parse(name: &str) -> Option<TagName> {
        TagName::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// A fully parsed opening tag, one variant per tag kind.
///
/// Directives whose required attributes are missing or unparseable become
/// `Malformed`, which the tokenizer treats as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Dependency { name: String, version: String },
    Annotation(Annotation),
    Plan(Plan),
    Reasoning,
    Summary,
    File { name: Option<String> },
    Patch { name: Option<String> },
    Command,
    Malformed(TagName),
}

/// Result of scanning a `Text`-mode buffer for the earliest opening tag.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Scan {
    /// A complete tag spans `start..end` of the buffer.
    Tag { start: usize, end: usize, tag: Tag, self_closing: bool },
    /// A candidate starting at `start` needs more input before it can be decided.
    Partial { start: usize },
    /// Nothing in the buffer can become a tag.
    Idle,
}

/// Outcome of parsing a candidate that starts with `<ns-`.
enum Candidate {
    Complete { len: usize, tag: Tag, self_closing: bool },
    Incomplete,
    Invalid,
}

/// Finds the earliest opening tag in `buffer`.
pub(crate) fn scan(buffer: &str) -> Scan {
    let mut from = 0;
    while let Some(rel) = buffer[from..].find('<') {
        let start = from + rel;
        let rest = &buffer[start..];

        if rest.len() < PREFIX.len() && PREFIX.starts_with(rest) {
            return Scan::Partial { start };
        }
        if rest.starts_with(PREFIX) {
            match parse_candidate(rest) {
                Candidate::Complete { len, tag, self_closing } => {
                    return Scan::Tag { start, end: start + len, tag, self_closing };
                }
                Candidate::Incomplete => return Scan::Partial { start },
                Candidate::Invalid => {}
            }
        }
        from = start + 1;
    }
    Scan::Idle
}

fn parse_candidate(rest: &str) -> Candidate {
    let body = &rest[PREFIX.len()..];
    let name_len = body.bytes().take_while(u8::is_ascii_alphabetic).count();

    if name_len == body.len() {
        let could_grow = TagName::ALL.iter().any(|t| t.as_str().starts_with(body));
        return if could_grow { Candidate::Incomplete } else { Candidate::Invalid };
    }
    let Some(name) = TagName::parse(&body[..name_len]) else {
        return Candidate::Invalid;
    };
    let attrs_start = PREFIX.len() + name_len;
    if !matches!(rest.as_bytes()[attrs_start], b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n') {
        return Candidate::Invalid;
    }

    let mut quote: Option<u8> = None;
    for (i, b) in rest.bytes().enumerate().skip(attrs_start) {
        if i >= MAX_OPEN_TAG_LEN {
            return Candidate::Invalid;
        }
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => {
                let inner = rest[attrs_start..i].trim_end();
                let (inner, self_closing) = match inner.strip_suffix('/') {
                    Some(stripped) => (stripped, true),
                    None => (inner, false),
                };
                let tag = build_tag(name, &parse_attrs(inner));
                return Candidate::Complete { len: i + 1, tag, self_closing };
            }
            None => {}
        }
    }
    Candidate::Incomplete
}

/// Parses `key="v" key='v' key=v` pairs. Tokens without `=` are skipped.
fn parse_attrs(inner: &str) -> Vec<(&str, &str)> {
    let mut attrs = Vec::new();
    let mut rest = inner.trim_start();

    while !rest.is_empty() {
        let key_len = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        let after_key = rest[key_len..].trim_start();

        let Some(after_eq) = after_key.strip_prefix('=') else {
            // Bare token without a value.
            rest = after_key;
            continue;
        };
        let after_eq = after_eq.trim_start();

        let (value, remainder) = match after_eq.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let quoted = &after_eq[1..];
                match quoted.find(q) {
                    Some(close) => (&quoted[..close], &quoted[close + 1..]),
                    None => (quoted, ""),
                }
            }
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };
        if !key.is_empty() {
            attrs.push((key, value));
        }
        rest = remainder.trim_start();
    }

    attrs
}

fn attr<'a>(attrs: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .filter(|v| !v.trim().is_empty())
}

fn build_tag(name: TagName, attrs: &[(&str, &str)]) -> Tag {
    match name {
        TagName::Dependency => match (attr(attrs, "name"), attr(attrs, "version")) {
            (Some(dep), Some(version)) => Tag::Dependency {
                name: dep.trim().to_owned(),
                version: version.trim().to_owned(),
            },
            _ => Tag::Malformed(name),
        },
        TagName::Annotation => {
            let line = attr(attrs, "line").and_then(|l| l.trim().parse::<u32>().ok());
            match (attr(attrs, "file"), line, attr(attrs, "type"), attr(attrs, "message")) {
                (Some(file), Some(line), Some(kind), Some(message)) => Tag::Annotation(Annotation {
                    file: file.to_owned(),
                    line,
                    severity: Severity::from_attr(kind),
                    message: message.to_owned(),
                    suggestion: attr(attrs, "suggestion").map(str::to_owned),
                }),
                _ => Tag::Malformed(name),
            }
        }
        TagName::Plan => match attr(attrs, "step").and_then(parse_step) {
            Some((current_step, total_steps)) => Tag::Plan(Plan {
                current_step,
                total_steps,
                task: attr(attrs, "task").unwrap_or_default().to_owned(),
            }),
            None => Tag::Malformed(name),
        },
        TagName::File => Tag::File { name: attr(attrs, "name").map(|n| n.trim().to_owned()) },
        TagName::Patch => Tag::Patch { name: attr(attrs, "name").map(|n| n.trim().to_owned()) },
        TagName::Reasoning => Tag::Reasoning,
        TagName::Summary => Tag::Summary,
        TagName::Command => Tag::Command,
    }
}

/// Parses `"current/total"`.
fn parse_step(step: &str) -> Option<(u32, u32)> {
    let (current, total) = step.split_once('/')?;
    Some((current.trim().parse().ok()?, total.trim().parse().ok()?))
}
