// Integration tests for the batch transfer executor.
//
// The testable properties: for N items with k failures under
// continue-on-error, the summary counts N-k and the batch completes; under
// abort-on-error, the first failure stops the batch with the prior success
// count and no later item attempted. Item names are absolute paths inside a
// scratch directory so the local-file legs stay isolated.

use anyhow::Result;
use cloudpipe::batch::{self, BatchLabel, BatchPolicy};
use cloudpipe::testing::{scratch_dir, scratch_path};
use cloudpipe::{ErrorKind, FakeStore};
use std::fs;
use std::io::Cursor;

fn text(diag: &[u8]) -> String {
    String::from_utf8_lossy(diag).into_owned()
}

// ============================================================================
// Download
// ============================================================================

#[test]
fn test_download_continues_past_missing_object() -> Result<()> {
    let dir = scratch_dir();
    let store = FakeStore::new();
    let x = scratch_path(&dir, "x");
    let y = scratch_path(&dir, "y");
    store.insert(&x, b"payload-x");

    let items = vec![x.clone(), y.clone()];
    let mut diag = Vec::new();
    let report = batch::run_batch(
        &items,
        BatchPolicy::ContinueOnError,
        BatchLabel::new("Downloaded", "object(s)"),
        &mut diag,
        |name| batch::download_object(&store, name),
    );

    assert_eq!(report.succeeded, 1);
    assert!(!report.aborted);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(fs::read(&x)?, b"payload-x");

    let diag = text(&diag);
    assert!(diag.contains(&format!("[{y}] error opening object")));
    assert!(diag.contains("Downloaded 1 object(s)"));
    assert_eq!(diag.matches("Downloaded").count(), 1);
    Ok(())
}

#[test]
fn test_download_summary_counts_all_successes() -> Result<()> {
    let dir = scratch_dir();
    let store = FakeStore::new();
    let names: Vec<String> = (0..4)
        .map(|i| scratch_path(&dir, &format!("obj-{i}")))
        .collect();
    for name in &names {
        store.insert(name, name.as_bytes());
    }

    let mut diag = Vec::new();
    let report = batch::run_batch(
        &names,
        BatchPolicy::ContinueOnError,
        BatchLabel::new("Downloaded", "object(s)"),
        &mut diag,
        |name| batch::download_object(&store, name),
    );

    assert_eq!(report.succeeded, 4);
    assert!(report.outcomes.iter().all(|outcome| outcome.succeeded()));
    assert!(text(&diag).contains("Downloaded 4 object(s)"));
    Ok(())
}

// ============================================================================
// Upload
// ============================================================================

#[test]
fn test_upload_aborts_on_first_failure() -> Result<()> {
    let dir = scratch_dir();
    let store = FakeStore::new();
    let missing = scratch_path(&dir, "missing");
    let good = scratch_path(&dir, "good");
    fs::write(&good, b"data")?;

    let items = vec![missing.clone(), good.clone()];
    let mut diag = Vec::new();
    let report = batch::run_batch(
        &items,
        BatchPolicy::AbortOnError,
        BatchLabel::new("Uploaded", "file(s)"),
        &mut diag,
        |name| batch::upload_file(&store, name),
    );

    assert_eq!(report.succeeded, 0);
    assert!(report.aborted);
    // The second item is never attempted.
    assert_eq!(report.outcomes.len(), 1);
    assert!(store.is_empty());

    let diag = text(&diag);
    assert!(diag.contains(&format!("[{missing}] error opening file")));
    assert!(diag.contains("Uploaded 0 file(s)"));
    Ok(())
}

#[test]
fn test_upload_counts_prior_successes_before_abort() -> Result<()> {
    let dir = scratch_dir();
    let store = FakeStore::new();
    let first = scratch_path(&dir, "first");
    let broken = scratch_path(&dir, "broken");
    let never = scratch_path(&dir, "never");
    fs::write(&first, b"1")?;
    fs::write(&never, b"3")?;

    let items = vec![first.clone(), broken, never.clone()];
    let mut diag = Vec::new();
    let report = batch::run_batch(
        &items,
        BatchPolicy::AbortOnError,
        BatchLabel::new("Uploaded", "file(s)"),
        &mut diag,
        |name| batch::upload_file(&store, name),
    );

    assert_eq!(report.succeeded, 1);
    assert!(report.aborted);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(store.contents(&first), Some(b"1".to_vec()));
    assert_eq!(store.contents(&never), None);
    assert!(text(&diag).contains("Uploaded 1 file(s)"));
    Ok(())
}

#[test]
fn test_upload_finalize_failure_is_its_own_stage() -> Result<()> {
    let dir = scratch_dir();
    let store = FakeStore::new();
    let name = scratch_path(&dir, "unlucky");
    fs::write(&name, b"content")?;
    store.fail_finalize(&name, ErrorKind::Transport);

    let items = vec![name.clone()];
    let mut diag = Vec::new();
    let report = batch::run_batch(
        &items,
        BatchPolicy::AbortOnError,
        BatchLabel::new("Uploaded", "file(s)"),
        &mut diag,
        |name| batch::upload_file(&store, name),
    );

    assert!(report.aborted);
    assert_eq!(store.contents(&name), None);
    let diag = text(&diag);
    assert!(diag.contains("error closing object"));
    assert!(!diag.contains("error uploading file"));
    Ok(())
}

#[test]
fn test_upload_all_success() -> Result<()> {
    let dir = scratch_dir();
    let store = FakeStore::new();
    let a = scratch_path(&dir, "a");
    let b = scratch_path(&dir, "b");
    fs::write(&a, b"aaa")?;
    fs::write(&b, b"bbb")?;

    let items = vec![a.clone(), b.clone()];
    let mut diag = Vec::new();
    let report = batch::run_batch(
        &items,
        BatchPolicy::AbortOnError,
        BatchLabel::new("Uploaded", "file(s)"),
        &mut diag,
        |name| batch::upload_file(&store, name),
    );

    assert_eq!(report.succeeded, 2);
    assert!(!report.aborted);
    assert_eq!(store.contents(&a), Some(b"aaa".to_vec()));
    assert_eq!(store.contents(&b), Some(b"bbb".to_vec()));
    assert!(text(&diag).contains("Uploaded 2 file(s)"));
    Ok(())
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_rm_continues_and_counts() {
    let store = FakeStore::new();
    store.insert("a", b"1");
    store.insert("c", b"3");

    let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let mut diag = Vec::new();
    let report = batch::run_batch(
        &items,
        BatchPolicy::ContinueOnError,
        BatchLabel::new("Deleted", "object(s)"),
        &mut diag,
        |name| batch::delete_object(&store, name),
    );

    assert_eq!(report.succeeded, 2);
    assert!(!report.aborted);
    assert!(store.is_empty());

    let diag = text(&diag);
    assert!(diag.contains("[b] error deleting object"));
    assert!(diag.contains("Deleted 2 object(s)"));
}

// ============================================================================
// Read / Write (single item)
// ============================================================================

#[test]
fn test_read_object_copies_all_bytes() -> Result<()> {
    let store = FakeStore::new();
    store.insert("blob", b"full contents");

    let mut out = Vec::new();
    batch::read_object(&store, "blob", &mut out)?;
    assert_eq!(out, b"full contents");
    Ok(())
}

#[test]
fn test_read_missing_object_is_fatal() {
    let store = FakeStore::new();
    let err = batch::read_object(&store, "gone", &mut Vec::new()).unwrap_err();
    assert!(format!("{err:#}").contains("error opening object"));
}

#[test]
fn test_write_object_round_trip() -> Result<()> {
    let store = FakeStore::new();
    let mut input = Cursor::new(b"streamed in".to_vec());
    batch::write_object(&store, "incoming", &mut input)?;
    assert_eq!(store.contents("incoming"), Some(b"streamed in".to_vec()));
    Ok(())
}

#[test]
fn test_write_object_finalize_failure_is_fatal() {
    let store = FakeStore::new();
    store.fail_finalize("incoming", ErrorKind::Transport);

    let mut input = Cursor::new(b"streamed in".to_vec());
    let err = batch::write_object(&store, "incoming", &mut input).unwrap_err();
    assert!(format!("{err:#}").contains("error closing object"));
    assert_eq!(store.contents("incoming"), None);
}

// ============================================================================
// List
// ============================================================================

#[test]
fn test_ls_prefix_filter_and_order() -> Result<()> {
    let store = FakeStore::new();
    store.insert("logs/a", b"1");
    store.insert("logs/b", b"2");
    store.insert("other/c", b"3");

    let mut out = Vec::new();
    batch::list_objects(&store, "logs/", &mut out)?;
    assert_eq!(text(&out), "logs/a\nlogs/b\n");

    // Unchanged set, same prefix, same sequence.
    let mut again = Vec::new();
    batch::list_objects(&store, "logs/", &mut again)?;
    assert_eq!(out, again);
    Ok(())
}

#[test]
fn test_ls_enumeration_error_is_fatal() {
    let store = FakeStore::new();
    store.insert("a", b"1");
    store.insert("b", b"2");
    store.fail_listing_after(1);

    let err = batch::list_objects(&store, "", &mut Vec::new()).unwrap_err();
    assert!(format!("{err:#}").contains("error listing objects"));
}
