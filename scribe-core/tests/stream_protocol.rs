//! Tokenizer behaviour over whole transcripts and fragmented input.

use scribe_core::{
    finalize, process_chunk, File, FileSet, FileStatus, Mode, Plan, Severity, StreamState,
};

fn run(chunks: &[&str]) -> StreamState {
    finalize(chunks.iter().fold(StreamState::default(), |s, c| process_chunk(s, c)))
}

fn seeded(files: &[(&str, &str)]) -> StreamState {
    StreamState::new(files.iter().map(|(n, c)| File::new(*n, *c)).collect::<FileSet>())
}

fn run_seeded(files: &[(&str, &str)], transcript: &str) -> StreamState {
    finalize(process_chunk(seeded(files), transcript))
}

#[test]
fn file_tag_split_inside_attribute() {
    let state = run(&[r#"<ns-file name="a."#, r#"txt">hello</ns-file>"#]);
    let file = state.working_files.get("a.txt").unwrap();
    assert_eq!(file.content, "hello");
    assert_eq!(file.language, "plaintext");
    assert_eq!(state.file_statuses["a.txt"], FileStatus::Success);
}

#[test]
fn patch_for_missing_file_is_an_error_without_mutation() {
    let mut state = seeded(&[("keep.ts", "x")]);
    state = process_chunk(
        state,
        "<ns-patch name=\"missing.ts\">@@ @@\n-a\n+b\n</ns-patch>",
    );
    let state = finalize(state);
    assert_eq!(state.file_statuses["missing.ts"], FileStatus::Error);
    assert_eq!(state.working_files.len(), 1);
    assert!(!state.working_files.contains("missing.ts"));
}

#[test]
fn full_transcript() {
    let transcript = r#"Sure, let me build that.
<ns-plan step="1/2" task="Scaffold" />
<ns-reasoning>Need an entry point.</ns-reasoning>
<ns-file name="src/index.ts">
export const n = 1;
</ns-file>
<ns-dependency name="zod" version="^3.23.0" />
<ns-plan step="2/2" task="Patch" />
<ns-patch name="src/index.ts">
@@ -1,1 +1,1 @@
-export const n = 1;
+export const n = 2;
</ns-patch>
<ns-annotation file="src/index.ts" line="1" type="error" message="unused" suggestion="remove it" />
<ns-command>  npm install  </ns-command>
<ns-reasoning>Done.</ns-reasoning>
<ns-summary>Added an index module.</ns-summary>
Anything else?"#;

    let state = run(&[transcript]);
    assert_eq!(state.mode(), &Mode::Text);
    assert_eq!(state.buffer(), "");
    assert_eq!(state.working_files.get("src/index.ts").unwrap().content, "export const n = 2;\n");
    assert_eq!(state.file_statuses["src/index.ts"], FileStatus::Success);
    assert_eq!(state.dependencies["zod"], "^3.23.0");
    assert_eq!(state.commands, vec!["npm install"]);
    assert_eq!(state.reasoning_text, "Need an entry point.\n\nDone.");
    assert_eq!(state.summary_text, "Added an index module.");
    assert_eq!(
        state.plan,
        Some(Plan { current_step: 2, total_steps: 2, task: "Patch".to_owned() })
    );
    assert_eq!(state.annotations.len(), 1);
    let note = &state.annotations[0];
    assert_eq!((note.line, note.severity), (1, Severity::Error));
    assert_eq!(note.suggestion.as_deref(), Some("remove it"));
}

#[test]
fn file_content_is_invisible_until_close() {
    let mut state = StreamState::default();
    state.push(r#"<ns-file name="a.rs">fn main() {"#);
    assert_eq!(state.mode(), &Mode::File { name: Some("a.rs".to_owned()) });
    assert_eq!(state.current_file_name(), Some("a.rs"));
    assert_eq!(state.file_statuses["a.rs"], FileStatus::Pending);
    assert!(state.working_files.get("a.rs").is_none());

    state.push("}</ns-fi");
    assert!(state.working_files.get("a.rs").is_none());

    state.push("le>");
    assert_eq!(state.mode(), &Mode::Text);
    assert_eq!(state.working_files.get("a.rs").unwrap().content, "fn main() {}");
}

#[test]
fn tags_inside_a_capture_are_content() {
    let state = run(&[
        r#"<ns-file name="doc.md">see <ns-command>ls</ns-command> here</ns-file>"#,
    ]);
    assert_eq!(
        state.working_files.get("doc.md").unwrap().content,
        "see <ns-command>ls</ns-command> here"
    );
    assert!(state.commands.is_empty());
}

#[test]
fn finalize_abandons_open_capture() {
    let mut state = seeded(&[("a.ts", "old")]);
    state.push("<ns-file name=\"a.ts\">new conte");
    let state = state.finalize();
    assert_eq!(state.mode(), &Mode::Text);
    assert_eq!(state.buffer(), "");
    assert_eq!(state.working_files.get("a.ts").unwrap().content, "old");
    assert_eq!(state.file_statuses["a.ts"], FileStatus::Error);

    let state = run(&["<ns-reasoning>half a thought"]);
    assert_eq!(state.reasoning_text, "");
}

#[test]
fn finalize_is_safe_in_text_mode_with_partial_tag() {
    let state = run(&["prose <ns-depend"]);
    assert_eq!(state.buffer(), "");
    assert!(state.dependencies.is_empty());
}

#[test]
fn malformed_directives_are_ignored() {
    let state = run(&[
        r#"<ns-dependency name="left-pad" /><ns-dependency version="1.0.0" />"#,
        r#"<ns-plan task="no step" /><ns-annotation file="a" type="info" message="m" />"#,
        r#"<ns-dependency name="ok" version="1.0.0" />"#,
    ]);
    assert_eq!(state.dependencies.len(), 1);
    assert_eq!(state.dependencies["ok"], "1.0.0");
    assert!(state.plan.is_none());
    assert!(state.annotations.is_empty());
}

#[test]
fn file_without_name_is_consumed_and_dropped() {
    let state = run(&["<ns-file>orphan body</ns-file><ns-command>ls</ns-command>"]);
    assert!(state.working_files.is_empty());
    assert!(state.file_statuses.is_empty());
    assert_eq!(state.commands, vec!["ls"]);
}

#[test]
fn self_closing_file_creates_empty_file() {
    let state = run(&[r#"<ns-file name=".gitkeep" />"#]);
    assert_eq!(state.working_files.get(".gitkeep").unwrap().content, "");
    assert_eq!(state.file_statuses[".gitkeep"], FileStatus::Success);
}

#[test]
fn later_file_tag_overwrites_in_place() {
    let state = run(&[
        r#"<ns-file name="a.txt">one</ns-file><ns-file name="b.txt">b</ns-file>"#,
        r#"<ns-file name="a.txt">two</ns-file>"#,
    ]);
    let names: Vec<&str> = state.working_files.names().collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(state.working_files.get("a.txt").unwrap().content, "two");
}

#[test]
fn multibyte_content_split_near_close_tag() {
    let mut state = StreamState::default();
    state.push("<ns-summary>héllo wörld ✓");
    state.push("✓✓</ns-sum");
    state.push("mary>");
    assert_eq!(state.summary_text, "héllo wörld ✓✓✓");
}

#[test]
fn patch_that_does_not_match_keeps_content() {
    let state = {
        let mut s = seeded(&[("a.txt", "alpha\nbeta")]);
        s.push("<ns-patch name=\"a.txt\">\n@@ @@\n-gamma\n+delta\n</ns-patch>");
        s.finalize()
    };
    assert_eq!(state.working_files.get("a.txt").unwrap().content, "alpha\nbeta");
    assert_eq!(state.file_statuses["a.txt"], FileStatus::Success);
}

#[test]
fn patch_body_with_trailing_blank_line_applies() {
    let state = run_seeded(
        &[("a.txt", "a\nb")],
        "<ns-patch name=\"a.txt\">\n@@ @@\n a\n-b\n+c\n\n</ns-patch>",
    );
    assert_eq!(state.working_files.get("a.txt").unwrap().content, "a\nc");
    assert_eq!(state.file_statuses["a.txt"], FileStatus::Success);
}

#[test]
fn add_only_patch_prepends_lines() {
    let state = run_seeded(
        &[("a.ts", "body();")],
        "<ns-patch name=\"a.ts\">\n@@ @@\n+import x;\n</ns-patch>",
    );
    assert_eq!(state.working_files.get("a.ts").unwrap().content, "import x;\nbody();");
}

#[test]
fn independent_streams_do_not_interfere() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let name = format!("f{i}.txt");
                let text = format!("<ns-file name=\"{name}\">{i}</ns-file>");
                let mut state = StreamState::default();
                for ch in text.chars() {
                    state.push(&ch.to_string());
                }
                state.finalize()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let state = handle.join().unwrap();
        assert_eq!(state.working_files.len(), 1);
        assert_eq!(state.working_files.get(&format!("f{i}.txt")).unwrap().content, i.to_string());
    }
}
