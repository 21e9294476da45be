//! Integration tests for editor crate

use redline_editor::{EditIntent, EditSession, EditorOptions, Mutation, StatusRun};
use redline_review::{accept_all, reject_all, ChangeIndex, ChangeKind};

fn session(source: &str) -> EditSession {
    EditSession::open("test", source, EditorOptions::default())
}

#[test]
fn test_selection_replace_becomes_substitution() {
    let mut s = session("The lazy dog");

    s.set_selection(4, 8);
    let change = s.apply_intent(&EditIntent::Replace {
        range: 4..8,
        text: "sleeping".to_string(),
    });

    assert!(change.is_some());
    assert_eq!(s.document.to_markup(), "The {~~lazy~>sleeping~~} dog");

    // Both sides of the pair point at each other.
    let runs = s.document.status_in(0..s.document.char_len());
    let kinds: Vec<_> = runs
        .iter()
        .filter_map(|run| match run {
            StatusRun::Text { kind, .. } => Some(kind.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(kinds.len(), 4);
    assert_eq!(kinds[1].paired_with(), kinds[2].change_id());
    assert_eq!(kinds[2].paired_with(), kinds[1].change_id());
}

#[test]
fn test_partial_delete_of_replacement_dissolves_pair() {
    let mut s = session("The lazy dog");

    s.set_selection(4, 8);
    s.apply_intent(&EditIntent::Replace {
        range: 4..8,
        text: "sleeping".to_string(),
    });
    assert_eq!(s.document.to_markup(), "The {~~lazy~>sleeping~~} dog");

    // One backspace inside the replacement text.
    s.set_selection(10, 10);
    s.apply_intent(&EditIntent::Delete { range: 9..10 });

    // No longer a substitution: the sides decompose into separate tokens.
    assert_eq!(s.document.to_markup(), "The {--lazy--}{++seeping++} dog");
    let runs = s.document.status_in(0..s.document.char_len());
    for run in &runs {
        if let StatusRun::Text { kind, .. } = run {
            assert_eq!(kind.paired_with(), None);
        }
    }

    let index = ChangeIndex::build(s.document.spans(), s.document.comments(), 30);
    assert_eq!(index.len(), 2);
    let kinds: Vec<_> = index.records().iter().map(|r| r.kind.clone()).collect();
    assert!(kinds.contains(&ChangeKind::Deletion {
        text: "lazy".to_string(),
    }));
    assert!(kinds.contains(&ChangeKind::Insertion {
        text: "seeping".to_string(),
    }));
}

#[test]
fn test_typing_at_collapsed_cursor() {
    let mut s = session("Hello world");

    s.set_selection(5, 5);
    s.apply_intent(&EditIntent::Insert {
        at: 5,
        text: " there".to_string(),
    });

    assert_eq!(s.document.to_markup(), "Hello{++ there++} world");
    assert_eq!(s.document.content(), "Hello there world");
}

#[test]
fn test_parsed_comment_reaches_the_index() {
    let s = session("A {--B--}{>>why<<} C");

    let index = ChangeIndex::build(s.document.spans(), s.document.comments(), 30);
    assert_eq!(index.len(), 1);

    let record = &index.records()[0];
    assert_eq!(
        record.kind,
        ChangeKind::Deletion {
            text: "B".to_string()
        }
    );
    assert_eq!(record.comments.len(), 1);
    assert_eq!(record.comments[0].text, "why");
}

#[test]
fn test_backspace_run_merges_into_one_span() {
    let mut s = session("abc");

    s.set_selection(3, 3);
    s.apply_intent(&EditIntent::Delete { range: 2..3 });
    s.apply_intent(&EditIntent::Delete { range: 1..2 });
    s.apply_intent(&EditIntent::Delete { range: 0..1 });

    assert_eq!(s.document.to_markup(), "{--abc--}");
    let runs = s.document.status_in(0..3);
    assert_eq!(runs.len(), 1);
}

#[test]
fn test_revert_substitution_restores_original() {
    let mut s = session("The lazy dog");

    s.set_selection(4, 8);
    let change = s
        .apply_intent(&EditIntent::Replace {
            range: 4..8,
            text: "sleeping".to_string(),
        })
        .unwrap();
    s.add_comment(&change, "why sleeping?").unwrap();

    s.revert(&change).unwrap();

    assert_eq!(s.document.to_markup(), "The lazy dog");
    let runs = s.document.status_in(0..s.document.char_len());
    assert_eq!(runs.len(), 1);
    assert!(s.document.comments().is_empty());
}

#[test]
fn test_review_workflow_round_trip() -> anyhow::Result<()> {
    let mut author = EditSession::open(
        "draft",
        "Title: Q3 Report\n\nThe quick brown fox jumps.",
        EditorOptions::default(),
    );

    // Substitute a word, flag another, append a sentence.
    author.set_selection(4, 9);
    let substitution = author
        .apply_intent(&EditIntent::Replace {
            range: 4..9,
            text: "swift".to_string(),
        })
        .unwrap();
    author.add_comment(&substitution, "tighter verb")?;

    let fox = author.document.content().find("fox").unwrap();
    author.annotate(fox..fox + 3, "verify species")?;

    let end = author.document.char_len();
    author.apply_intent(&EditIntent::Insert {
        at: end,
        text: " Indeed.".to_string(),
    });

    let exported = author.export();
    assert!(exported.starts_with("Title: Q3 Report\n"));
    assert!(exported.contains("Changes: 3\n"));
    assert!(exported.contains("Commented: 2\n"));

    // A reviewer picks the file up and sees the same changes.
    let reviewer = session(&exported);
    let index = ChangeIndex::build(reviewer.document.spans(), reviewer.document.comments(), 30);
    assert_eq!(index.len(), 3);

    let kinds: Vec<_> = index.records().iter().map(|r| r.kind.clone()).collect();
    assert!(kinds.contains(&ChangeKind::Substitution {
        old: "quick".to_string(),
        new: "swift".to_string(),
    }));
    assert!(kinds.contains(&ChangeKind::Highlight {
        text: "fox".to_string(),
    }));
    assert!(kinds.contains(&ChangeKind::Insertion {
        text: " Indeed.".to_string(),
    }));

    assert_eq!(
        accept_all(reviewer.document.spans()),
        "The swift brown fox jumps. Indeed."
    );
    assert_eq!(
        reject_all(reviewer.document.spans()),
        "The quick brown fox jumps."
    );
    Ok(())
}

#[test]
fn test_reject_all_conserves_untouched_original() -> anyhow::Result<()> {
    let original = "One two three.\nFour five six.";
    let mut s = session(original);

    s.set_selection(4, 7);
    let change = s
        .apply_intent(&EditIntent::Replace {
            range: 4..7,
            text: "2".to_string(),
        })
        .unwrap();
    s.add_comment(&change, "digits read faster")?;

    s.set_selection(14, 14);
    s.apply_intent(&EditIntent::Insert {
        at: 14,
        text: " Extra.".to_string(),
    });

    // Tracked edits never lose the original text.
    assert_eq!(reject_all(s.document.spans()), original);
    Ok(())
}

#[test]
fn test_intents_and_mutations_survive_serde() {
    let intent = EditIntent::Replace {
        range: 3..9,
        text: "new".to_string(),
    };
    let json = serde_json::to_string(&intent).unwrap();
    let back: EditIntent = serde_json::from_str(&json).unwrap();
    assert_eq!(intent, back);

    let mut s = session("payload");
    s.set_selection(0, 0);
    s.apply_intent(&EditIntent::Insert {
        at: 0,
        text: "x".to_string(),
    });

    // A mutation built by the engine round-trips as plain data.
    let mutation = Mutation::new(vec![], "noop");
    let json = serde_json::to_string(&mutation).unwrap();
    let back: Mutation = serde_json::from_str(&json).unwrap();
    assert_eq!(mutation, back);
}

#[test]
fn test_untracked_session_edits_destructively() {
    let mut s = session("draft text");
    s.set_tracking(false);

    s.set_selection(0, 5);
    s.apply_intent(&EditIntent::Replace {
        range: 0..5,
        text: "final".to_string(),
    });

    assert_eq!(s.document.to_markup(), "final text");
    assert!(s.document.spans().change_ids().is_empty());

    // Flip tracking back on: the next edit is tracked again.
    s.set_tracking(true);
    s.set_selection(5, 5);
    s.apply_intent(&EditIntent::Insert {
        at: 5,
        text: "ized".to_string(),
    });
    assert_eq!(s.document.to_markup(), "final{++ized++} text");
}

#[test]
fn test_highlight_survives_resolution_as_plain_text() {
    let s = session("keep {==this==}{>>note<<} part");

    assert_eq!(accept_all(s.document.spans()), "keep this part");
    assert_eq!(reject_all(s.document.spans()), "keep this part");
}

#[test]
fn test_multi_block_substitution_round_trips() {
    let mut s = session("alpha beta\ngamma delta");

    // Select across the separator and replace.
    s.set_selection(6, 16);
    s.apply_intent(&EditIntent::Replace {
        range: 6..16,
        text: "OMEGA".to_string(),
    });

    let markup = s.document.to_markup();
    let reparsed = session(&markup);
    assert_eq!(reparsed.document.to_markup(), markup);
    assert_eq!(accept_all(reparsed.document.spans()), accept_all(s.document.spans()));
}

#[test]
fn test_mixed_edit_session_against_index_counts() {
    let mut s = session("aaa bbb ccc ddd");

    s.set_selection(0, 3);
    s.apply_intent(&EditIntent::Delete { range: 0..3 });
    s.set_selection(8, 8);
    s.apply_intent(&EditIntent::Insert {
        at: 8,
        text: "X".to_string(),
    });

    let index = ChangeIndex::build(s.document.spans(), s.document.comments(), 10);
    assert_eq!(index.len(), 2);
    assert!(index
        .records()
        .iter()
        .all(|r| r.comments.is_empty()));
}
