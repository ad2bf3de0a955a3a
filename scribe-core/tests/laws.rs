use proptest::prelude::*;
use scribe_core::{
    apply_diff, apply_reverse_snapshot_diff, calculate_reverse_diff, finalize, process_chunk, File,
    FileSet, StreamState,
};

fn file_set() -> impl Strategy<Value = FileSet> {
    let content = prop::collection::vec(
        prop_oneof![Just("k".to_owned()), Just(String::new()), "[a-c ]{0,6}"],
        0..12,
    )
    .prop_map(|lines| lines.join("\n"));
    prop::collection::vec(("[a-e]\\.(rs|ts|md)", content), 0..5)
        .prop_map(|pairs| pairs.into_iter().map(|(n, c)| File::new(n, c)).collect::<FileSet>())
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z <>/=\"]{0,12}",
        "[a-c]{1,3}".prop_map(|n| format!("<ns-file name=\"{n}.txt\">\nbody {n} ✓\n</ns-file>")),
        "[a-c]{1,3}".prop_map(|n| format!("<ns-patch name=\"{n}.txt\">@@ @@\n-body {n} ✓\n+patched\n</ns-patch>")),
        "[a-z]{1,6}".prop_map(|v| format!("<ns-dependency name=\"{v}\" version='1.{}' />", v.len())),
        Just("<ns-annotation file=\"a.txt\" line=\"2\" type=\"warn\" message=\"m\" />".to_owned()),
        "[a-z ]{0,10}".prop_map(|t| format!("<ns-reasoning>{t}</ns-reasoning>")),
        "[a-z ]{0,10}".prop_map(|t| format!("<ns-summary>é{t}</ns-summary>")),
        "[a-z ]{0,10}".prop_map(|t| format!("<ns-command>{t}</ns-command>")),
        Just("<ns-bogus attr=\"x\"><ns-plan step=\"1/3\" task=\"a > b\" />".to_owned()),
        Just("<ns-file name=\"open.txt\">never closed".to_owned()),
    ]
}

/// Splits `text` at the given byte offsets, moved back to char boundaries.
fn split_at(text: &str, cuts: &[usize]) -> Vec<String> {
    let mut offsets: Vec<usize> = cuts
        .iter()
        .map(|&c| {
            let mut at = c % (text.len() + 1);
            while !text.is_char_boundary(at) {
                at -= 1;
            }
            at
        })
        .collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut chunks = Vec::new();
    let mut prev = 0;
    for at in offsets {
        chunks.push(text[prev..at].to_owned());
        prev = at;
    }
    chunks.push(text[prev..].to_owned());
    chunks
}

fn seed() -> FileSet {
    [File::new("a.txt", "body a ✓\nrest"), File::new("b.txt", "body b ✓")].into_iter().collect()
}

proptest! {
    #[test]
    fn reverse_diff_round_trips(old in file_set(), new in file_set()) {
        let diff = calculate_reverse_diff(&old, &new);
        let restored = apply_reverse_snapshot_diff(&new, &diff);
        prop_assert!(restored.content_eq(&old), "restored {:?} expected {:?}", restored, old);
    }

    #[test]
    fn fragmentation_does_not_change_the_result(
        segments in prop::collection::vec(segment(), 0..10),
        cuts in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        let text = segments.concat();
        let whole = finalize(process_chunk(StreamState::new(seed()), &text));
        let pieces = split_at(&text, &cuts);
        let split = finalize(
            pieces.iter().fold(StreamState::new(seed()), |s, c| process_chunk(s, c)),
        );
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn one_char_at_a_time_matches_whole(segments in prop::collection::vec(segment(), 0..6)) {
        let text = segments.concat();
        let whole = finalize(process_chunk(StreamState::new(seed()), &text));
        let mut state = StreamState::new(seed());
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            state.push(ch.encode_utf8(&mut buf));
        }
        prop_assert_eq!(whole, state.finalize());
    }

    #[test]
    fn context_only_hunk_is_identity(
        lines in prop::collection::vec("[ a-c\t]{0,5}", 1..16),
        start in any::<usize>(),
        len in 1usize..6,
    ) {
        let doc = lines.join("\n");
        let start = start % lines.len();
        let end = (start + len).min(lines.len());
        let mut diff = String::from("@@ -1,1 +1,1 @@\n");
        for line in &lines[start..end] {
            diff.push(' ');
            diff.push_str(line);
            diff.push('\n');
        }
        prop_assert_eq!(apply_diff(&doc, &diff), doc);
    }
}
