//! Concurrent Save Tests
//!
//! - validators are shared across threads without locking
//! - racing stale copies: exactly one wins, the rest see version conflicts
//! - saves of unrelated documents do not interfere

use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

use array_unique::schema::{FieldDef, FieldType};
use array_unique::{ArrayUniquePlugin, Collection, CollectionConfig, CompiledSchema, Schema};
use serde_json::json;

fn collection() -> Arc<Collection> {
    let mut fields = HashMap::new();
    fields.insert("_id".to_string(), FieldDef::required_string());
    fields.insert("arr".to_string(), FieldDef::optional_array(FieldType::String).unique());

    let compiled = CompiledSchema::new(Schema::new("tests", "v1", fields))
        .with_plugin(&ArrayUniquePlugin::default())
        .unwrap();
    Arc::new(Collection::new("tests", Arc::new(compiled), CollectionConfig::default()).unwrap())
}

#[test]
fn test_racing_stale_copies_one_winner() {
    const THREADS: usize = 8;

    let collection = collection();
    let id = collection.create(json!({})).unwrap().id().to_string();

    let copies: Vec<_> = (0..THREADS)
        .map(|_| collection.find_by_id(&id).unwrap().unwrap())
        .collect();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = copies
        .into_iter()
        .map(|mut copy| {
            let collection = Arc::clone(&collection);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                copy.push("arr", json!("test")).unwrap();
                barrier.wait();
                collection.save(&mut copy)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_version_conflict()))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, THREADS - 1);

    let stored = collection.find_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.get("arr"), Some(&json!(["test"])));
    assert_eq!(stored.version(), 1);
}

#[test]
fn test_unrelated_documents_save_in_parallel() {
    const THREADS: usize = 8;

    let collection = collection();
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let collection = Arc::clone(&collection);
            thread::spawn(move || {
                let mut doc = collection.create(json!({})).unwrap();
                for n in 0..10 {
                    doc.push("arr", json!(format!("{}-{}", i, n))).unwrap();
                    collection.save(&mut doc).unwrap();
                }
                doc.push("arr", json!(format!("{}-0", i))).unwrap();
                collection.save(&mut doc).is_err()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap(), "duplicate push should be rejected");
    }
    assert_eq!(collection.count().unwrap(), THREADS);
}
