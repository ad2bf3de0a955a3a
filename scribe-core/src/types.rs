use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// A project whose committed files and turn history live in the store.
///
/// Projects are keyed by UUID v4 text and are unique by `name`; opening an
/// existing name resumes that project.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String, // UUID v4 text
    pub name: String,
    pub created_at: i64, // Unix timestamp seconds
    pub updated_at: i64, // Unix timestamp seconds
}

/// A single project file tracked by the working set.
///
/// `language` is derived from the extension of `name` on construction and is
/// never set independently, so two files with the same name always agree on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub content: String,
    pub language: String,
}

impl File {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let language = language_for(&name).to_owned();
        Self { name, content: content.into(), language }
    }
}

/// Maps a file name to a language identifier by its extension.
///
/// Returns `"plaintext"` for names without an extension or with one that is
/// not recognised. Matching is case-insensitive.
pub fn language_for(name: &str) -> &'static str {
    let base = name.rsplit('/').next().unwrap_or(name);
    let ext = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return "plaintext",
    };
    match ext.as_str() {
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "rs" => "rust",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "swift" => "swift",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "vue" => "vue",
        "svelte" => "svelte",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" | "svg" => "xml",
        "md" | "markdown" => "markdown",
        "sql" => "sql",
        "sh" | "bash" | "zsh" => "shell",
        _ => "plaintext",
    }
}

/// An insertion-ordered set of files keyed by name.
///
/// Names are unique by construction: inserting a file whose name is already
/// present overwrites it in place instead of appending a duplicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<File>", into = "Vec<File>")]
pub struct FileSet {
    files: IndexMap<String, File>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&File> {
        self.files.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Inserts `file`, replacing any file with the same name at its existing position.
    ///
    /// Returns the previous file when one was replaced.
    pub fn upsert(&mut self, file: File) -> Option<File> {
        self.files.insert(file.name.clone(), file)
    }

    /// Removes the named file, keeping the relative order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<File> {
        self.files.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// True when both sets hold the same names with the same content per name.
    ///
    /// Ordering is ignored.
    pub fn content_eq(&self, other: &FileSet) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|f| other.get(&f.name).is_some_and(|o| o.content == f.content))
    }
}

impl FromIterator<File> for FileSet {
    fn from_iter<I: IntoIterator<Item = File>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for file in iter {
            set.upsert(file);
        }
        set
    }
}

impl IntoIterator for FileSet {
    type Item = File;
    type IntoIter = indexmap::map::IntoValues<String, File>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_values()
    }
}

impl From<Vec<File>> for FileSet {
    fn from(files: Vec<File>) -> Self {
        files.into_iter().collect()
    }
}

impl From<FileSet> for Vec<File> {
    fn from(set: FileSet) -> Self {
        set.into_iter().collect()
    }
}

/// Per-file progress reported while a turn streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// A `file` or `patch` tag has opened but not closed yet.
    Pending,
    Success,
    /// The patch target was missing, or the capture was abandoned at finalize.
    Error,
}

/// Severity of a model-emitted annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    #[default]
    Info,
}

impl Severity {
    /// Parses the `type` attribute of an annotation tag.
    ///
    /// Unknown values fall back to `Info` rather than rejecting the annotation.
    pub fn from_attr(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Severity::Error,
            "warning" | "warn" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// A diagnostic attached to a line of a generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub file: String,
    pub line: u32,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Progress through the model's announced multi-step plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub current_step: u32,
    pub total_steps: u32,
    pub task: String,
}

/// Reverse-diff instructions for one turn.
///
/// Applying this to the file set *after* the turn yields the file set *before*
/// it. `modified` texts are hunks that turn new content back into old content;
/// `deleted` names files the turn created; `added` holds full copies of files
/// the turn removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub modified: BTreeMap<String, String>,
    pub deleted: Vec<String>,
    pub added: Vec<File>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.deleted.is_empty() && self.added.is_empty()
    }
}

/// One stored history step, as handed to the reconstructor.
///
/// `diff` is a `Result` so that a payload which failed to decode can still take
/// its place in the chronology and be skipped during a history walk.
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: String,
    pub created_at: i64, // Unix timestamp seconds
    pub diff: Result<SnapshotDiff, SnapshotError>,
}

/// A single `@@` hunk parsed from patch text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// The raw header line. Its line numbers are kept for diagnostics only.
    pub header: String,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// Context and removed lines, in order: what must be found in the target.
    pub fn search_block(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.kind != DiffLineKind::Added)
            .map(|l| l.content.as_str())
            .collect()
    }

    /// Context and added lines, in order: what the match is replaced with.
    pub fn replace_block(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.kind != DiffLineKind::Removed)
            .map(|l| l.content.as_str())
            .collect()
    }
}

/// A single line within a hunk, without its prefix character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
}

/// The type of change for a diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Added,
    Removed,
    Context,
}
