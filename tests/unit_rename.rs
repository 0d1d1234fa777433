//! Integration tests for move/rename detection in the planner.

use mirrorkeep::hash::hash_bytes;
use mirrorkeep::index::{FileRecord, Index};
use mirrorkeep::plan::{generate_plan, SyncAction};
use mirrorkeep::project::{always_copy_paths, detect_project_roots};

fn record(path: &str, content: &[u8]) -> FileRecord {
    FileRecord { relative_path: path.to_string(), digest: hash_bytes(content), mtime: 0.0, size: content.len() as u64 }
}

fn plan_for(src: Index, dst: Index) -> mirrorkeep::plan::SyncPlan {
    let map = detect_project_roots(&src);
    let always_copy = always_copy_paths(&map);
    generate_plan(&src, &dst, &map, &always_copy, "src".into(), "dst".into())
}

#[test]
fn test_simple_rename_same_directory() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("report_final.csv", b"quarterly numbers"));
    dst.add(record("report_draft.csv", b"quarterly numbers"));

    let plan = plan_for(src, dst);
    let moves: Vec<&SyncAction> = plan.moves().collect();

    assert_eq!(moves.len(), 1);
    assert!(matches!(moves[0], SyncAction::Move { move_from, .. } if move_from == "report_draft.csv"));
}

#[test]
fn test_content_differs_is_not_treated_as_rename() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("report_final.csv", b"new numbers"));
    dst.add(record("report_draft.csv", b"old numbers"));

    let plan = plan_for(src, dst);

    assert_eq!(plan.moves().count(), 0);
    assert_eq!(plan.copies().count(), 1);
    assert_eq!(plan.deletes().count(), 1);
}

#[test]
fn test_directory_change_is_a_move() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("archive/2024/notes.txt", b"meeting notes"));
    dst.add(record("inbox/notes.txt", b"meeting notes"));

    let plan = plan_for(src, dst);
    let moves: Vec<&SyncAction> = plan.moves().collect();

    assert_eq!(moves.len(), 1);
    assert!(matches!(moves[0], SyncAction::Move { dst_relative_path, .. } if dst_relative_path == "archive/2024/notes.txt"));
}

#[test]
fn test_duplicate_content_ambiguous_rename_prefers_basename_match() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("final/data.bin", b"shared payload"));
    dst.add(record("staging/data.bin", b"shared payload"));
    dst.add(record("backup/renamed_copy.bin", b"shared payload"));

    let plan = plan_for(src, dst);
    let moves: Vec<&SyncAction> = plan.moves().collect();

    assert_eq!(moves.len(), 1);
    assert!(matches!(moves[0], SyncAction::Move { move_from, .. } if move_from == "staging/data.bin"));
}

#[test]
fn test_case_only_rename_is_detected() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("README.md", b"project docs"));
    dst.add(record("readme.md", b"project docs"));

    let plan = plan_for(src, dst);

    assert_eq!(plan.moves().count(), 1);
}

#[test]
fn test_extension_change_is_not_a_rename() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("notes.md", b"content"));
    dst.add(record("notes.txt", b"different content"));

    let plan = plan_for(src, dst);

    assert_eq!(plan.moves().count(), 0);
    assert_eq!(plan.copies().count(), 1);
    assert_eq!(plan.deletes().count(), 1);
}

#[test]
fn test_deep_directory_rename() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("a/b/c/d/e/file.bin", b"deep content"));
    dst.add(record("x/y/file.bin", b"deep content"));

    let plan = plan_for(src, dst);

    assert_eq!(plan.moves().count(), 1);
}

#[test]
fn test_unicode_filename_rename() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("documents/\u{1F4C4}\u{65e5}\u{672c}\u{8a9e}.txt", b"unicode content"));
    dst.add(record("old/\u{1F4C4}\u{65e5}\u{672c}\u{8a9e}.txt", b"unicode content"));

    let plan = plan_for(src, dst);

    assert_eq!(plan.moves().count(), 1);
}

#[test]
fn test_mixed_operations_in_one_plan() {
    let mut src = Index::new();
    let mut dst = Index::new();

    // Unchanged
    src.add(record("keep.txt", b"same"));
    dst.add(record("keep.txt", b"same"));

    // Renamed
    src.add(record("renamed.txt", b"moved content"));
    dst.add(record("old_renamed.txt", b"moved content"));

    // New
    src.add(record("brand_new.txt", b"fresh"));

    // Modified
    src.add(record("changed.txt", b"v2"));
    dst.add(record("changed.txt", b"v1"));

    // Stale (only in dst)
    dst.add(record("stale.txt", b"obsolete"));

    let plan = plan_for(src, dst);

    assert_eq!(plan.skips().count(), 1);
    assert_eq!(plan.moves().count(), 1);
    assert_eq!(plan.copies().count(), 2); // brand_new.txt + changed.txt
    assert_eq!(plan.deletes().count(), 1);
}

#[test]
fn test_no_rename_candidate_left_after_first_match_is_consumed() {
    let mut src = Index::new();
    let mut dst = Index::new();

    // Two source files want to claim the same single destination candidate.
    src.add(record("a/shared.bin", b"payload"));
    src.add(record("b/shared.bin", b"payload"));
    dst.add(record("only_candidate/shared.bin", b"payload"));

    let plan = plan_for(src, dst);

    // Exactly one of the two can be a move; the other must fall back to a copy.
    assert_eq!(plan.moves().count(), 1);
    assert_eq!(plan.copies().count(), 1);
}

#[test]
fn test_boilerplate_is_copied_even_though_content_matches() {
    let mut src = Index::new();
    src.add(record("backend/package.json", br#"{"name":"backend"}"#));
    src.add(record("backend/.gitignore", b"node_modules\n"));
    src.add(record("frontend/package.json", br#"{"name":"frontend"}"#));
    src.add(record("frontend/.gitignore", b"node_modules\n"));

    let mut dst = Index::new();
    dst.add(record("backend/package.json", br#"{"name":"backend"}"#));
    dst.add(record("backend/.gitignore", b"node_modules\n"));
    dst.add(record("frontend/package.json", br#"{"name":"frontend"}"#));
    // frontend/.gitignore absent from dst entirely; only backend's identical bytes exist.

    let map = detect_project_roots(&src);
    let always_copy = always_copy_paths(&map);
    let plan = generate_plan(&src, &dst, &map, &always_copy, "src".into(), "dst".into());

    let frontend_action = plan
        .actions
        .iter()
        .find(|a| match a {
            SyncAction::Copy { dst_relative_path, .. } | SyncAction::Move { dst_relative_path, .. } => {
                dst_relative_path == "frontend/.gitignore"
            },
            _ => false,
        })
        .expect("frontend/.gitignore must be planned");

    assert!(matches!(frontend_action, SyncAction::Copy { .. }), "shared boilerplate must never be moved cross-project");
}

#[test]
fn test_empty_source_and_destination_plans_nothing() {
    let plan = plan_for(Index::new(), Index::new());
    assert!(plan.actions.is_empty());
}

#[test]
fn test_path_distance_tiebreak_prefers_shallower_candidate() {
    let mut src = Index::new();
    let mut dst = Index::new();
    src.add(record("x/target.bin", b"payload"));
    dst.add(record("x/y/z/deep_source.bin", b"payload"));
    dst.add(record("source.bin", b"payload"));

    let plan = plan_for(src, dst);
    let moves: Vec<&SyncAction> = plan.moves().collect();

    assert_eq!(moves.len(), 1);
    assert!(matches!(moves[0], SyncAction::Move { move_from, .. } if move_from == "source.bin"));
}
