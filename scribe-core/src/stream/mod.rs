//! Incremental tokenizer for the `<ns-…>` tag protocol.
//!
//! A [`StreamState`] is created per generation turn and threaded through
//! successive [`process_chunk`] calls. Chunks may split tags, attributes and
//! close tags anywhere; the final state after [`finalize`] is the same however
//! the input was fragmented. The working file set only changes when a capture
//! tag closes, so partially streamed content is never visible.
//!
//! There is no shared or global state here. Independent streams hold
//! independent `StreamState` values and can be driven on separate threads.

pub mod tag;

use std::collections::BTreeMap;

use crate::patch;
use crate::types::{Annotation, File, FileSet, FileStatus, Plan};

pub use tag::{Tag, TagName};

/// What the tokenizer is currently doing with incoming text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    /// Scanning for the next opening tag; text in between is dropped.
    #[default]
    Text,
    Reasoning,
    Summary,
    /// Capturing a full file body. `name` is `None` when the tag had no usable
    /// `name` attribute; the body is then consumed and discarded.
    File { name: Option<String> },
    /// Capturing patch hunks for an existing file.
    Patch { name: Option<String> },
    Command,
}

impl Mode {
    /// The literal close tag that ends this capture, or `None` in `Text` mode.
    pub fn close_tag(&self) -> Option<&'static str> {
        match self {
            Mode::Text => None,
            Mode::Reasoning => Some("</ns-reasoning>"),
            Mode::Summary => Some("</ns-summary>"),
            Mode::File { .. } => Some("</ns-file>"),
            Mode::Patch { .. } => Some("</ns-patch>"),
            Mode::Command => Some("</ns-command>"),
        }
    }
}

/// Everything known about one streaming turn so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamState {
    buffer: String,
    mode: Mode,
    /// Offset into `buffer` before which the current close tag cannot start.
    search_from: usize,

    pub reasoning_text: String,
    pub summary_text: String,
    pub file_statuses: BTreeMap<String, FileStatus>,
    pub working_files: FileSet,
    pub commands: Vec<String>,
    pub dependencies: BTreeMap<String, String>,
    pub annotations: Vec<Annotation>,
    pub plan: Option<Plan>,
}

impl StreamState {
    /// Starts a turn whose working set is seeded with the committed files.
    pub fn new(files: FileSet) -> Self {
        Self { working_files: files, ..Self::default() }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Unconsumed input: a partial tag, or the body of an open capture.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Target of the open `file`/`patch` capture, if any.
    pub fn current_file_name(&self) -> Option<&str> {
        match &self.mode {
            Mode::File { name } | Mode::Patch { name } => name.as_deref(),
            _ => None,
        }
    }

    /// Appends `chunk` and consumes as many complete tags as the buffer holds.
    pub fn push(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        while self.step() {}
    }

    /// Ends the turn, abandoning any open capture.
    ///
    /// Safe in every mode. The partial body of an unterminated tag is
    /// discarded; a named `file` or `patch` capture is marked as an error.
    pub fn finalize(mut self) -> Self {
        let abandoned = std::mem::take(&mut self.mode);
        if abandoned != Mode::Text {
            tracing::debug!(
                mode = ?abandoned,
                pending_bytes = self.buffer.len(),
                "discarding unterminated capture"
            );
        }
        if let Mode::File { name: Some(name) } | Mode::Patch { name: Some(name) } = abandoned {
            self.file_statuses.insert(name, FileStatus::Error);
        }
        self.buffer.clear();
        self.search_from = 0;
        self
    }

    /// Makes one unit of progress. Returns `false` when more input is needed.
    fn step(&mut self) -> bool {
        match self.mode.close_tag() {
            None => self.step_text(),
            Some(close) => self.step_capture(close),
        }
    }

    fn step_text(&mut self) -> bool {
        match tag::scan(&self.buffer) {
            tag::Scan::Tag { end, tag, self_closing, .. } => {
                self.buffer.drain(..end);
                self.open(tag, self_closing);
                true
            }
            tag::Scan::Partial { start } => {
                self.buffer.drain(..start);
                false
            }
            tag::Scan::Idle => {
                self.buffer.clear();
                false
            }
        }
    }

    fn step_capture(&mut self, close: &str) -> bool {
        let Some(rel) = self.buffer[self.search_from..].find(close) else {
            // A close tag can only start in the last `close.len() - 1` bytes.
            let mut resume = self.buffer.len().saturating_sub(close.len() - 1);
            while !self.buffer.is_char_boundary(resume) {
                resume -= 1;
            }
            self.search_from = resume;
            return false;
        };
        let at = self.search_from + rel;
        let content = self.buffer[..at].to_owned();
        self.buffer.drain(..at + close.len());
        self.search_from = 0;

        let mode = std::mem::take(&mut self.mode);
        self.close(mode, content);
        true
    }

    fn open(&mut self, tag: Tag, self_closing: bool) {
        let mode = match tag {
            Tag::Dependency { name, version } => {
                self.dependencies.insert(name, version);
                return;
            }
            Tag::Annotation(annotation) => {
                self.annotations.push(annotation);
                return;
            }
            Tag::Plan(plan) => {
                self.plan = Some(plan);
                return;
            }
            Tag::Malformed(name) => {
                tracing::debug!(tag = name.as_str(), "ignoring tag with missing attributes");
                return;
            }
            Tag::Reasoning => Mode::Reasoning,
            Tag::Summary => Mode::Summary,
            Tag::Command => Mode::Command,
            Tag::File { name } => Mode::File { name },
            Tag::Patch { name } => Mode::Patch { name },
        };

        if let Mode::File { name: Some(name) } | Mode::Patch { name: Some(name) } = &mode {
            self.file_statuses.insert(name.clone(), FileStatus::Pending);
        }
        if self_closing {
            self.close(mode, String::new());
        } else {
            self.mode = mode;
        }
    }

    fn close(&mut self, mode: Mode, content: String) {
        match mode {
            Mode::Text => {}
            Mode::Reasoning => append_block(&mut self.reasoning_text, &content),
            Mode::Summary => append_block(&mut self.summary_text, &content),
            Mode::Command => {
                let command = content.trim();
                if !command.is_empty() {
                    self.commands.push(command.to_owned());
                }
            }
            Mode::File { name: Some(name) } => {
                let body = strip_leading_newline(&content);
                self.working_files.upsert(File::new(name.clone(), body));
                self.file_statuses.insert(name, FileStatus::Success);
            }
            Mode::Patch { name: Some(name) } => self.close_patch(name, &content),
            Mode::File { name: None } | Mode::Patch { name: None } => {
                tracing::warn!(
                    bytes = content.len(),
                    "discarding file capture without a name attribute"
                );
            }
        }
    }

    fn close_patch(&mut self, name: String, diff: &str) {
        let Some(existing) = self.working_files.get(&name) else {
            tracing::warn!(file = %name, "patch target is not in the working set");
            self.file_statuses.insert(name, FileStatus::Error);
            return;
        };
        let report = patch::apply_diff_report(&existing.content, diff);
        if !report.skipped.is_empty() {
            tracing::warn!(
                file = %name,
                applied = report.applied,
                skipped = report.skipped.len(),
                "patch applied partially"
            );
        }
        self.working_files.upsert(File::new(name.clone(), report.text));
        self.file_statuses.insert(name, FileStatus::Success);
    }
}

/// Feeds one chunk into `state` and returns the advanced state.
pub fn process_chunk(mut state: StreamState, chunk: &str) -> StreamState {
    state.push(chunk);
    state
}

/// Clears pending input and returns the best-known final state.
pub fn finalize(state: StreamState) -> StreamState {
    state.finalize()
}

/// Appends a trimmed block, separating it from earlier ones by a blank line.
fn append_block(acc: &mut String, block: &str) {
    let block = block.trim();
    if block.is_empty() {
        return;
    }
    if !acc.is_empty() {
        acc.push_str("\n\n");
    }
    acc.push_str(block);
}

/// Drops the single line break models put right after an opening tag.
fn strip_leading_newline(content: &str) -> &str {
    content
        .strip_prefix("\r\n")
        .or_else(|| content.strip_prefix('\n'))
        .unwrap_or(content)
}
