//! The process-wide shared store and the model-level access traits.
//!
//! Kept in its own test binary: the shared handle is opened once per process
//! from the environment.

use std::sync::mpsc;

use persistkit::{
    BatchAccess, Change, ManagedBatch, ObjectAccess, PersistError, Predicate, Rect, StoreHandle,
};
use persistkit_testkit::fixtures::{Note, Sketch};
use persistkit_testkit::init_tracing;

#[test]
fn shared_store_serves_models() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("Shared.sqlite");
    std::env::set_var("PERSISTKIT_DATABASE", &db);

    let shared = StoreHandle::shared().unwrap();
    assert!(shared.ptr_eq(&StoreHandle::shared().unwrap()));
    assert_eq!(shared.path(), Some(db.as_path()));
    assert!(db.exists());

    // Explicit handles to the same file are separate handles.
    let explicit = StoreHandle::open_at(&db).unwrap();
    assert!(!explicit.ptr_eq(&shared));

    let (tx, rx) = mpsc::channel();
    let token = Note::observe(move |change| {
        if let Ok(Change::Update { insertions, .. }) = change {
            if !insertions.is_empty() {
                tx.send(insertions.len()).unwrap();
            }
        }
    })
    .unwrap();

    let note = Note::new(1, "shared").add().unwrap();
    assert!(note.handle().ptr_eq(&shared));
    assert_eq!(Note::find(1i64).unwrap().unwrap().title, "shared");

    Note::new(1, "updated").update().unwrap();
    let found = Note::fetch_all_where(Predicate::field("title").eq("updated")).unwrap();
    assert_eq!(found.len().unwrap(), 1);

    // The second handle sees what the shared one committed.
    assert_eq!(persistkit::access::fetch_all::<Note>(&explicit).len().unwrap(), 1);

    let added = vec![Note::new(2, "b"), Note::new(3, "c")].add_batch().unwrap();
    assert_eq!(Note::fetch_all().unwrap().len().unwrap(), 3);
    added.delete_managed().unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    Note::new(4, "later")
        .update_async(move |result| done_tx.send(result.is_ok()).unwrap())
        .unwrap();
    shared.wait_for_async_writes().unwrap();
    assert!(done_rx.recv().unwrap());

    Note::new(4, "").delete().unwrap();
    assert_eq!(Note::fetch_all().unwrap().len().unwrap(), 1);

    let sketches = vec![Sketch::new("s", Rect::default())];
    assert!(matches!(
        sketches.update_batch_async(|_| {}),
        Err(PersistError::NoPrimaryKey { .. })
    ));
    assert!(matches!(
        Sketch::new("s", Rect::default()).update(),
        Err(PersistError::NoPrimaryKey { .. })
    ));

    assert_eq!(Note::delete_all().unwrap(), 1);
    drop(token);
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 1]);
}
