use super::*;

fn store_in(dir: &tempfile::TempDir) -> ListStore {
    ListStore::open(dir.path().join("allow.list")).expect("open")
}

#[test]
fn add_then_contains() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    assert!(store.add("10.0.0.1").expect("add"));
    assert!(store.contains("10.0.0.1").expect("contains"));
    assert!(!store.contains("10.0.0.2").expect("contains"));
}

#[test]
fn adding_the_same_value_twice_is_a_no_op_the_second_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    assert!(store.add("dup").expect("add"));
    assert!(!store.add("dup").expect("add"));
    assert_eq!(store.len().expect("len"), 1);
}

#[test]
fn remove_drops_only_the_matching_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    store.add("a").expect("add");
    store.add("b").expect("add");
    assert!(store.remove("a").expect("remove"));
    assert!(!store.contains("a").expect("contains"));
    assert!(store.contains("b").expect("contains"));
}

#[test]
fn removing_an_absent_value_reports_false() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    assert!(!store.remove("never-added").expect("remove"));
}

#[test]
fn opening_a_missing_file_starts_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    assert!(store.is_empty().expect("is_empty"));
}

#[test]
fn an_external_edit_is_picked_up_on_the_next_access() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("allow.list");
    let store = ListStore::open(&path).expect("open");
    store.add("first").expect("add");

    // Simulate an administrator hand-editing the file directly.
    std::thread::sleep(std::time::Duration::from_millis(10));
    std::fs::write(&path, "first\nsecond\n").expect("write");

    let entries = store.iter().expect("iter");
    assert_eq!(entries, vec!["first".to_string(), "second".to_string()]);
}
