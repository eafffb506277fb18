use std::fs;
use std::path::Path;

use library_tree::{BookFormats, FileTree, OpeningStatus};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn touch(path: &Path) {
    fs::write(path, b"x").unwrap();
}

fn child_names(tree: &FileTree) -> Vec<String> {
    tree.children()
        .iter()
        .map(|child| child.name().into_owned())
        .collect()
}

#[test]
fn opening_lists_directories_first_then_books_by_name() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("zeta")).unwrap();
    fs::create_dir(temp.path().join("Alpha")).unwrap();
    touch(&temp.path().join("b.epub"));
    touch(&temp.path().join("A.fb2"));
    touch(&temp.path().join("notes.docx"));
    touch(&temp.path().join("collection.zip"));

    let mut root = FileTree::root(temp.path(), "My books", Some("local".to_string()));
    root.wait_for_opening(&BookFormats::default()).unwrap();

    assert_eq!(
        child_names(&root),
        vec!["Alpha", "zeta", "A.fb2", "b.epub", "collection.zip"]
    );
    assert!(root.children().iter().all(FileTree::is_selectable));
    assert!(root.children()[0].is_directory());
}

#[test]
fn reopening_reflects_disk_changes() {
    let temp = TempDir::new().unwrap();
    touch(&temp.path().join("one.txt"));
    let formats = BookFormats::default();

    let mut root = FileTree::child(temp.path());
    root.wait_for_opening(&formats).unwrap();
    assert_eq!(child_names(&root), vec!["one.txt"]);

    touch(&temp.path().join("two.txt"));
    fs::remove_file(temp.path().join("one.txt")).unwrap();
    root.wait_for_opening(&formats).unwrap();
    assert_eq!(child_names(&root), vec!["two.txt"]);
}

#[test]
fn custom_formats_filter_children() {
    let temp = TempDir::new().unwrap();
    touch(&temp.path().join("a.epub"));
    touch(&temp.path().join("b.PDF"));

    let mut root = FileTree::child(temp.path());
    root.wait_for_opening(&BookFormats::new([".pdf"])).unwrap();
    assert_eq!(child_names(&root), vec!["b.PDF"]);
}

#[test]
fn book_files_have_no_children() {
    let temp = TempDir::new().unwrap();
    let book = temp.path().join("book.epub");
    touch(&book);

    let mut node = FileTree::child(&book);
    node.wait_for_opening(&BookFormats::default()).unwrap();
    assert!(node.children().is_empty());
    assert_eq!(node.name(), "book.epub");
    assert_eq!(node.tree_title(), book.to_string_lossy());
    assert_eq!(node.summary(), None);
}

#[test]
fn root_uses_label_and_is_not_selectable() {
    let temp = TempDir::new().unwrap();
    let root = FileTree::root(temp.path(), "My books", Some("local".to_string()));
    assert_eq!(root.name(), "My books");
    assert_eq!(root.summary(), Some("local"));
    assert!(!root.is_selectable());
    assert_eq!(root.string_id(), temp.path().to_string_lossy());
}

#[test]
fn unreadable_path_cannot_be_opened() {
    let temp = TempDir::new().unwrap();
    let missing = FileTree::child(temp.path().join("missing"));
    assert_eq!(missing.opening_status(), OpeningStatus::CannotOpen);
    assert_eq!(missing.opening_status_message(), Some("permissionDenied"));

    let present = FileTree::child(temp.path());
    assert_eq!(
        present.opening_status(),
        OpeningStatus::AlwaysReloadBeforeOpening
    );
    assert_eq!(present.opening_status_message(), None);
}

#[test]
fn listing_a_vanished_directory_fails() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("gone");
    fs::create_dir(&dir).unwrap();
    let mut node = FileTree::child(&dir);
    fs::remove_dir(&dir).unwrap();

    let err = node.wait_for_opening(&BookFormats::default()).unwrap_err();
    assert!(err.to_string().contains("gone"), "{err}");
}

#[test]
fn equality_is_by_path() {
    let temp = TempDir::new().unwrap();
    let labelled = FileTree::root(temp.path(), "Label", None);
    let plain = FileTree::child(temp.path());
    assert_eq!(labelled, plain);
    assert_ne!(plain, FileTree::child(temp.path().join("other")));
}
