//! End-to-end lifecycle tests over the public API.

use histedit::{
    Analyzer, EditBuffer, EditError, EditOpKind, EditOperation, EditorConfig, FormatStyle,
    FormatterConfig, KeywordKind, MemoryHistory, MultilineEditor, Splitter,
};

fn editor_with(commands: &[&str]) -> MultilineEditor {
    let mut history = MemoryHistory::new();
    for command in commands {
        history.push(*command);
    }
    MultilineEditor::new(Box::new(history))
}

#[test]
fn edit_modify_save_round_trip() {
    let editor = editor_with(&["ls", "for x in 1 2; do\n  echo $x\ndone"]);
    let mut buffer = EditBuffer::new();

    editor.edit_entry(1, &mut buffer).unwrap();
    assert!(buffer.text().contains("done"), "Got: {:?}", buffer.text());

    buffer.set_text("for x in 1 2 3; do\n echo $x\ndone");
    editor
        .session_update(
            &buffer,
            EditOperation::new(EditOpKind::Insert, 11, 2, " 3"),
        )
        .unwrap();
    editor.session_complete(&buffer).unwrap();

    // the history now holds the edited text
    let mut buffer2 = EditBuffer::new();
    editor.edit_entry(1, &mut buffer2).unwrap();
    assert!(buffer2.text().contains("1 2 3"), "Got: {:?}", buffer2.text());
}

#[test]
fn unchanged_buffer_is_a_no_op_save() {
    // History index 3 holds a multiline conditional; completing without
    // touching the buffer saves it back verbatim, bumps total_edits, and
    // drops the cache entry for that index.
    let editor = editor_with(&["ls", "pwd", "whoami", "if true; then\n  echo hi\nfi"]);
    let mut buffer = EditBuffer::new();

    editor.edit_entry(3, &mut buffer).unwrap();
    assert_eq!(editor.cache_stats().current_entries, 1);

    editor.session_complete(&buffer).unwrap();

    let stats = editor.stats();
    assert_eq!(stats.total_edits, 1);
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(
        editor.cache_stats().current_entries,
        0,
        "completed edit must invalidate the cache entry"
    );
}

#[test]
fn cancel_preserves_the_original_entry() {
    let editor = editor_with(&["echo original"]);
    let mut buffer = EditBuffer::new();

    editor.edit_entry(0, &mut buffer).unwrap();
    buffer.set_text("echo mangled");
    editor
        .session_update(
            &buffer,
            EditOperation::new(EditOpKind::Replace, 5, 7, "mangled"),
        )
        .unwrap();
    editor.session_cancel().unwrap();

    let mut buffer2 = EditBuffer::new();
    editor.edit_entry(0, &mut buffer2).unwrap();
    assert_eq!(buffer2.text(), "echo original");
}

#[test]
fn session_slots_are_bounded() {
    let mut history = MemoryHistory::new();
    for i in 0..4 {
        history.push(format!("echo {i}"));
    }
    let editor = MultilineEditor::with_config(
        Box::new(history),
        EditorConfig {
            max_sessions: 2,
            ..EditorConfig::default()
        },
    )
    .unwrap();

    let mut buffer = EditBuffer::new();
    editor.edit_entry(0, &mut buffer).unwrap();
    editor.edit_entry(1, &mut buffer).unwrap();
    let err = editor.edit_entry(2, &mut buffer).unwrap_err();
    assert!(matches!(err, EditError::InvalidState(_)), "Got: {err:?}");
}

#[test]
fn incomplete_entry_reports_missing_keyword() {
    let splitter = Splitter::default();
    let analyzer = Analyzer::default();
    let result = splitter
        .parse("while read -r line\ndo\n  echo \"$line\"", &analyzer)
        .unwrap();
    assert!(!result.is_complete);
    assert_eq!(result.missing_keyword, Some(KeywordKind::Done));
}

#[test]
fn expanded_style_breaks_pipelines_into_the_buffer() {
    let mut history = MemoryHistory::new();
    history.push("ps aux | grep sshd | wc -l");
    let editor = MultilineEditor::with_config(
        Box::new(history),
        EditorConfig {
            format: FormatterConfig {
                style: FormatStyle::Expanded,
                ..FormatterConfig::default()
            },
            ..EditorConfig::default()
        },
    )
    .unwrap();

    let mut buffer = EditBuffer::new();
    editor.edit_entry(0, &mut buffer).unwrap();
    assert_eq!(buffer.text(), "ps aux |\n    grep sshd |\n    wc -l");
    editor.session_cancel().unwrap();
}

#[test]
fn repeated_edits_hit_the_cache_counters() {
    let editor = editor_with(&["echo cached"]);
    let mut buffer = EditBuffer::new();

    for _ in 0..3 {
        editor.edit_entry(0, &mut buffer).unwrap();
        editor.session_cancel().unwrap();
    }
    let stats = editor.cache_stats();
    assert_eq!(stats.misses, 1, "only the first edit misses");
    assert_eq!(stats.hits, 2);
    // hits still reconstruct in full
    assert_eq!(editor.stats().reconstructions_ok, 3);
}
