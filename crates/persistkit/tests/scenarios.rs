//! End-to-end object scenarios against temporary stores.

use std::sync::mpsc;
use std::thread;

use persistkit::access;
use persistkit::{
    Affinity, Change, Color, ManagedBatch, PersistError, Predicate, Rect, StoreConfig,
    StoreError, StoreHandle,
};
use persistkit_testkit::fixtures::{Label, Note, Sketch, TempStore};
use persistkit_testkit::init_tracing;

fn titles(store: &StoreHandle) -> Vec<String> {
    access::fetch_all::<Note>(store)
        .to_vec()
        .unwrap()
        .into_iter()
        .map(|n| n.into_inner().title)
        .collect()
}

#[test]
fn add_is_insert_only_update_keeps_identity() {
    init_tracing();
    let store = TempStore::new();

    let first = access::add(&store, Note::new(1, "draft")).unwrap();
    let err = access::add(&store, Note::new(1, "again")).unwrap_err();
    assert!(matches!(err, PersistError::Store(StoreError::DuplicateKey { .. })));

    let merged = access::update(&store, Note::new(1, "final")).unwrap();
    assert_eq!(merged.id(), first.id());
    assert_eq!(titles(&store), vec!["final"]);

    let other = access::update(&store, Note::new(2, "second")).unwrap();
    assert_ne!(other.id(), first.id());
    assert_eq!(access::fetch_all::<Note>(&store).len().unwrap(), 2);
}

#[test]
fn text_keys_are_distinct_per_type() {
    let store = TempStore::new();
    access::add(&store, Label::new("1", Color::WHITE)).unwrap();
    access::add(&store, Note::new(1, "one")).unwrap();

    let label = access::find::<Label>(&store, "1").unwrap().unwrap();
    assert_eq!(label.color, Color::WHITE);
    assert!(access::find::<Label>(&store, "2").unwrap().is_none());
    assert_eq!(access::find::<Note>(&store, 1i64).unwrap().unwrap().title, "one");
}

#[test]
fn keyless_types_reject_update() {
    let store = TempStore::new();
    let sketch = Sketch::new("a", Rect::new(0.0, 0.0, 1.0, 1.0));

    assert!(matches!(
        access::update(&store, sketch.clone()),
        Err(PersistError::NoPrimaryKey { type_name: "Sketch" })
    ));
    assert!(matches!(
        access::update_batch(&store, vec![sketch.clone(), sketch.clone()]),
        Err(PersistError::NoPrimaryKey { .. })
    ));
    assert!(matches!(
        access::update_batch::<Sketch>(&store, Vec::new()),
        Err(PersistError::NoPrimaryKey { .. })
    ));

    // Async variants report synchronously and never schedule the job.
    let (tx, rx) = mpsc::channel::<()>();
    let tx2 = tx.clone();
    assert!(matches!(
        access::update_async(&store, &sketch, move |_| tx.send(()).unwrap()),
        Err(PersistError::NoPrimaryKey { .. })
    ));
    assert!(matches!(
        access::update_batch_async(&store, &[sketch.clone()], move |_| tx2.send(()).unwrap()),
        Err(PersistError::NoPrimaryKey { .. })
    ));
    store.wait_for_async_writes().unwrap();
    assert!(rx.try_recv().is_err());
    assert_eq!(access::fetch_all::<Sketch>(&store).len().unwrap(), 0);

    // Adding keyless objects is fine and each add is a new object.
    let a = access::add(&store, sketch.clone()).unwrap();
    let b = access::add(&store, sketch).unwrap();
    assert_ne!(a.id(), b.id());
}

#[test]
fn deletes_are_idempotent() {
    let store = TempStore::new();
    let note = access::add(&store, Note::new(1, "a")).unwrap();

    note.delete().unwrap();
    note.delete().unwrap();
    access::delete(&store, &Note::new(1, "a")).unwrap();
    access::delete(&store, &Note::new(99, "never stored")).unwrap();
    assert!(!note.exists().unwrap());

    // Keyless values are not persisted by value: deleting one does nothing.
    let sketch = access::add(&store, Sketch::new("s", Rect::default())).unwrap();
    access::delete(&store, &*sketch).unwrap();
    assert_eq!(access::fetch_all::<Sketch>(&store).len().unwrap(), 1);
    access::delete_managed(&store, &sketch).unwrap();
    assert_eq!(access::fetch_all::<Sketch>(&store).len().unwrap(), 0);
}

#[test]
fn edit_is_atomic() {
    let store = TempStore::new();
    let mut note = access::add(&store, Note::new(1, "a").with_body("body")).unwrap();

    let result: anyhow::Result<()> = note.edit(|n| {
        n.title = "half-done".into();
        anyhow::bail!("changed my mind")
    });
    assert!(result.is_err());
    assert_eq!(note.title, "a");
    assert_eq!(titles(&store), vec!["a"]);

    note.edit(|n| {
        n.title = "b".into();
        n.pinned = true;
        Ok::<_, anyhow::Error>(())
    })
    .unwrap();
    assert_eq!(note.title, "b");
    assert!(note.pinned);
    assert_eq!(note.body.as_deref(), Some("body"));
    assert_eq!(titles(&store), vec!["b"]);

    let err = note
        .edit(|n| {
            n.id = 2;
            Ok::<_, PersistError>(())
        })
        .unwrap_err();
    assert!(matches!(err, PersistError::PrimaryKeyChanged { .. }));
    assert_eq!(note.id, 1);
}

#[test]
fn edit_sees_live_row() {
    let store = TempStore::new();
    let mut stale = access::add(&store, Note::new(1, "a")).unwrap();
    access::update(&store, Note::new(1, "newer").with_body("x")).unwrap();

    stale
        .edit(|n| {
            n.pinned = true;
            Ok::<_, PersistError>(())
        })
        .unwrap();
    assert_eq!(stale.title, "newer");
    assert_eq!(stale.body.as_deref(), Some("x"));

    let edited = access::edit::<Note, _, PersistError>(&store, 1i64, |n| {
        n.title = "by key".into();
        Ok(())
    })
    .unwrap()
    .unwrap();
    assert_eq!(edited.id(), stale.id());
    assert!(access::edit::<Note, _, PersistError>(&store, 7i64, |_| Ok(())).unwrap().is_none());

    stale.refresh().unwrap();
    assert_eq!(stale.title, "by key");
}

#[test]
fn refresh_after_delete_is_invalidated() {
    let store = TempStore::new();
    let mut note = access::add(&store, Note::new(1, "a")).unwrap();
    access::delete_all::<Note>(&store).unwrap();

    assert!(matches!(note.refresh(), Err(PersistError::Invalidated { .. })));
    let err = note.edit(|_| Ok::<_, PersistError>(())).unwrap_err();
    assert!(matches!(err, PersistError::Invalidated { .. }));
}

#[test]
fn fresh_store_update_then_recreate() {
    let store = TempStore::new();
    assert!(titles(&store).is_empty());

    access::update(&store, Note::new(1, "a")).unwrap();
    access::update(&store, Note::new(1, "b")).unwrap();
    assert_eq!(titles(&store), vec!["b"]);

    let results = access::fetch_all::<Note>(&store);
    store.recreate().unwrap();
    assert!(store.path().exists());
    assert_eq!(results.len().unwrap(), 0);

    access::update(&store, Note::new(1, "c")).unwrap();
    assert_eq!(titles(&store), vec!["c"]);
}

#[test]
fn batches_are_atomic() {
    let store = TempStore::new();
    access::add(&store, Note::new(3, "existing")).unwrap();

    let batch = vec![Note::new(1, "one"), Note::new(2, "two"), Note::new(3, "dup")];
    let err = access::add_batch(&store, batch).unwrap_err();
    assert!(matches!(err, PersistError::Store(StoreError::DuplicateKey { .. })));
    assert_eq!(titles(&store), vec!["existing"]);

    let dup_inside = vec![Note::new(5, "five"), Note::new(5, "again")];
    assert!(access::add_batch(&store, dup_inside).is_err());
    assert_eq!(titles(&store), vec!["existing"]);

    let added = access::add_batch(&store, vec![Note::new(1, "one"), Note::new(2, "two")]).unwrap();
    assert_eq!(added.len(), 2);

    let updated = access::update_batch(&store, vec![Note::new(2, "TWO"), Note::new(4, "four")]).unwrap();
    assert_eq!(updated[0].id(), added[1].id());
    assert_eq!(titles(&store), vec!["existing", "one", "TWO", "four"]);

    access::delete_batch(&store, &[Note::new(1, ""), Note::new(4, "")]).unwrap();
    assert_eq!(titles(&store), vec!["existing", "TWO"]);

    access::delete_managed_batch(&store, &added).unwrap();
    assert_eq!(titles(&store), vec!["existing"]);
}

#[test]
fn keyless_batches_commit_all_or_nothing() {
    let store = TempStore::new();
    access::add(&store, Sketch::new("before", Rect::default())).unwrap();
    let sketches = || {
        (0..3)
            .map(|i| Sketch::new(&format!("s{i}"), Rect::new(f64::from(i), 0.0, 1.0, 1.0)))
            .collect::<Vec<_>>()
    };

    let read_only =
        StoreHandle::open_with(StoreConfig::at(store.path()).read_only(true), Affinity::Any).unwrap();
    assert!(access::add_batch(&read_only, sketches()).is_err());
    assert_eq!(access::fetch_all::<Sketch>(&store).len().unwrap(), 1);

    let added = access::add_batch(&store, sketches()).unwrap();
    assert_eq!(added.len(), 3);
    assert_eq!(access::fetch_all::<Sketch>(&store).len().unwrap(), 4);
}

#[test]
fn async_writes_commit_in_order() {
    let store = TempStore::new();
    let (tx, rx) = mpsc::channel();
    for i in 0..10 {
        let tx = tx.clone();
        access::update_async(&store, &Note::new(1, &format!("v{i}")), move |result| {
            tx.send((i, result.unwrap())).unwrap()
        })
        .unwrap();
    }
    store.wait_for_async_writes().unwrap();

    let done: Vec<_> = rx.try_iter().collect();
    assert_eq!(done.iter().map(|(i, _)| *i).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
    assert!(done.windows(2).all(|w| w[0].1 == w[1].1));
    assert_eq!(titles(&store), vec!["v9"]);

    let (tx, rx) = mpsc::channel();
    access::update_batch_async(&store, &[Note::new(2, "b"), Note::new(3, "c")], move |r| {
        tx.send(r.map(|ids| ids.len())).unwrap()
    })
    .unwrap();
    store.wait_for_async_writes().unwrap();
    assert_eq!(rx.recv().unwrap().unwrap(), 2);
}

#[test]
fn async_edit() {
    let store = TempStore::new();
    let note = access::add(&store, Note::new(1, "a")).unwrap();

    let (tx, rx) = mpsc::channel();
    note.edit_async(
        |n| {
            n.title = "async".into();
            Ok::<_, PersistError>(())
        },
        move |result| tx.send(result.map(|m| m.into_inner().title)).unwrap(),
    )
    .unwrap();
    store.wait_for_async_writes().unwrap();
    assert_eq!(rx.recv().unwrap().unwrap(), "async");

    let (tx, rx) = mpsc::channel();
    access::edit_async::<Note, _, PersistError, _>(&store, 42i64, |_| Ok(()), move |r| {
        tx.send(r.map(|_| ())).unwrap()
    })
    .unwrap();
    store.wait_for_async_writes().unwrap();
    assert!(matches!(rx.recv().unwrap(), Err(PersistError::NotFound { .. })));

    let sketch = access::add(&store, Sketch::new("s", Rect::default())).unwrap();
    let err = sketch
        .edit_async(|_| Ok::<_, PersistError>(()), |_| {})
        .unwrap_err();
    assert!(matches!(err, PersistError::NoPrimaryKey { .. }));
}

#[test]
fn observation_reports_changes() {
    init_tracing();
    let store = TempStore::new();
    access::add(&store, Note::new(1, "a")).unwrap();

    let (tx, rx) = mpsc::channel();
    let token = access::observe::<Note, _>(&store, move |change| tx.send(change.unwrap()).unwrap()).unwrap();
    match rx.try_recv().unwrap() {
        Change::Initial(results) => assert_eq!(results.len(), 1),
        other => panic!("expected initial, got {:?}", other),
    }

    access::add_batch(&store, vec![Note::new(2, "b"), Note::new(3, "c")]).unwrap();
    match rx.try_recv().unwrap() {
        Change::Update { results, insertions, deletions, modifications } => {
            assert_eq!(results.len(), 3);
            assert_eq!(insertions, vec![1, 2]);
            assert!(deletions.is_empty() && modifications.is_empty());
        }
        other => panic!("expected update, got {:?}", other),
    }

    // One notification for a whole transaction.
    store
        .write(|txn| {
            txn.delete_by_key("Note", &1i64.into())?;
            txn.upsert("Note", &3i64.into(), &persistkit::Model::to_record(&Note::new(3, "C")))
        })
        .unwrap();
    match rx.try_recv().unwrap() {
        Change::Update { results, deletions, modifications, .. } => {
            assert_eq!(deletions, vec![0]);
            assert_eq!(modifications, vec![1]);
            assert_eq!(results[1].title, "C");
        }
        other => panic!("expected update, got {:?}", other),
    }
    assert!(rx.try_recv().is_err());

    // Other types do not notify.
    access::add(&store, Label::new("x", Color::BLACK)).unwrap();
    assert!(rx.try_recv().is_err());

    drop(token);
    access::add(&store, Note::new(9, "z")).unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn observer_may_write_from_callback() {
    let store = TempStore::new();
    let writer = store.handle().clone();
    let (tx, rx) = mpsc::channel();
    let _token = access::observe::<Note, _>(&store, move |change| {
        let change = change.unwrap();
        let count = change.results().len();
        // Mirror every change into Label counts.
        access::update(&writer, Label { name: "notes".into(), color: Color::BLACK, uses: count as i64 }).unwrap();
        tx.send(count).unwrap();
    })
    .unwrap();

    access::add(&store, Note::new(1, "a")).unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(access::find::<Label>(&store, "notes").unwrap().unwrap().uses, 1);
}

#[test]
fn queries_filter_and_validate() {
    let store = TempStore::new();
    access::add_batch(
        &store,
        vec![
            Note::new(1, "alpha"),
            Note::new(2, "beta").with_body("has body"),
            Note::new(3, "gamma"),
        ],
    )
    .unwrap();

    let long = access::fetch_all_where::<Note>(&store, Predicate::field("id").ge(2)).unwrap();
    assert_eq!(long.len().unwrap(), 2);
    let narrowed = long.filter(Predicate::field("title").contains("amm")).unwrap();
    assert_eq!(narrowed.first().unwrap().unwrap().id, 3);

    let with_body = access::fetch_all_where::<Note>(&store, Predicate::field("body").is_null().not()).unwrap();
    assert_eq!(with_body.to_vec().unwrap()[0].title, "beta");

    assert!(matches!(
        access::fetch_all_where::<Note>(&store, Predicate::field("").eq(1)),
        Err(PersistError::QueryInvalid(_))
    ));
    let unknown = access::fetch_all_where::<Note>(&store, Predicate::field("nope").eq(1)).unwrap();
    assert!(matches!(unknown.len(), Err(PersistError::QueryInvalid(_))));
    let mismatched = access::fetch_all_where::<Note>(&store, Predicate::field("title").gt(3)).unwrap();
    assert!(matches!(mismatched.to_vec(), Err(PersistError::QueryInvalid(_))));

    assert_eq!(narrowed.delete_all().unwrap(), 1);
    assert_eq!(titles(&store), vec!["alpha", "beta"]);
}

#[test]
fn managed_batch_deletes_across_stores() {
    let a = TempStore::new();
    let b = TempStore::new();
    let mut objects = access::add_batch(&a, vec![Note::new(1, "a1"), Note::new(2, "a2")]).unwrap();
    objects.extend(access::add_batch(&b, vec![Note::new(1, "b1")]).unwrap());

    objects.delete_managed().unwrap();
    assert!(titles(&a).is_empty());
    assert!(titles(&b).is_empty());
}

#[test]
fn wrong_context_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store =
        StoreHandle::open_with(StoreConfig::at(dir.path().join("bound.sqlite")), Affinity::CurrentThread).unwrap();
    access::add(&store, Note::new(1, "a")).unwrap();

    let other = store.clone();
    let errors = thread::spawn(move || {
        vec![
            access::fetch_all::<Note>(&other).len().unwrap_err(),
            access::add(&other, Note::new(2, "b")).unwrap_err(),
            access::update_async(&other, &Note::new(3, "c"), |_| {}).unwrap_err(),
        ]
    })
    .join()
    .unwrap();
    for err in errors {
        assert!(matches!(err, PersistError::Store(StoreError::WrongContext { .. })), "{err}");
    }
    assert_eq!(titles(&store), vec!["a"]);
}

#[test]
fn retryable_errors() {
    let err = PersistError::from(StoreError::TransactionFailed("busy".into()));
    assert!(err.is_retryable());
    assert!(!PersistError::NoPrimaryKey { type_name: "Sketch" }.is_retryable());
}
