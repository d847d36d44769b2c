use std::sync::Arc;

use chrono::Utc;
use file_share::storage::{FileRecord, Registry};

fn sample_file(stored_name: &str) -> FileRecord {
    FileRecord {
        id: uuid::Uuid::new_v4().to_string(),
        original_name: stored_name
            .split_once('-')
            .map(|(_, name)| name)
            .unwrap_or(stored_name)
            .to_string(),
        stored_name: stored_name.to_string(),
        size: 1024,
        content_type: "text/plain".to_string(),
        uploaded_at: Utc::now(),
    }
}

fn stored_names(records: &[FileRecord]) -> Vec<&str> {
    records.iter().map(|r| r.stored_name.as_str()).collect()
}

#[test]
fn test_starts_empty() {
    let registry = Registry::new();
    assert!(registry.is_empty());
    assert!(registry.list().is_empty());
}

#[test]
fn test_append_preserves_order() {
    let registry = Registry::new();
    registry.append(vec![sample_file("1-b.txt"), sample_file("1-a.txt")]);
    registry.append(vec![sample_file("2-c.txt")]);

    assert_eq!(
        stored_names(&registry.list()),
        ["1-b.txt", "1-a.txt", "2-c.txt"]
    );
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_find_by_stored_name() {
    let registry = Registry::new();
    let file = sample_file("1-a.txt");
    registry.append(vec![file.clone()]);

    assert_eq!(registry.find_by_stored_name("1-a.txt"), Some(file));
    assert!(registry.find_by_stored_name("1-missing.txt").is_none());
}

#[test]
fn test_remove_returns_record() {
    let registry = Registry::new();
    registry.append(vec![
        sample_file("1-a.txt"),
        sample_file("2-b.txt"),
        sample_file("3-c.txt"),
    ]);

    let removed = registry.remove("2-b.txt").expect("record should exist");
    assert_eq!(removed.stored_name, "2-b.txt");
    assert_eq!(stored_names(&registry.list()), ["1-a.txt", "3-c.txt"]);
    assert!(registry.find_by_stored_name("2-b.txt").is_none());

    assert!(registry.remove("2-b.txt").is_none());
}

#[test]
fn test_list_is_a_snapshot() {
    let registry = Registry::new();
    registry.append(vec![sample_file("1-a.txt")]);

    let snapshot = registry.list();
    registry.append(vec![sample_file("2-b.txt")]);
    registry.remove("1-a.txt");

    assert_eq!(stored_names(&snapshot), ["1-a.txt"]);
    assert_eq!(stored_names(&registry.list()), ["2-b.txt"]);
}

#[test]
fn test_duplicate_stored_name_replaces_entry() {
    let registry = Registry::new();
    registry.append(vec![sample_file("1-a.txt"), sample_file("2-b.txt")]);

    let replacement = sample_file("1-a.txt");
    registry.append(vec![replacement.clone()]);

    assert_eq!(registry.len(), 2);
    assert_eq!(stored_names(&registry.list()), ["2-b.txt", "1-a.txt"]);
    assert_eq!(registry.find_by_stored_name("1-a.txt"), Some(replacement));
}

#[test]
fn test_concurrent_appends_are_not_lost() {
    let registry = Arc::new(Registry::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..50 {
                    registry.append(vec![sample_file(&format!("{t}-{i}.bin"))]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 400);
    assert_eq!(registry.list().len(), 400);
}
