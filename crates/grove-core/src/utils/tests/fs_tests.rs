use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::utils::fs::{find_files, has_extension};

#[test]
fn test_find_files_recursive_and_sorted() {
    let dir = tempdir().expect("Failed to create temp dir");
    let nested = dir.path().join("b_nested");
    fs::create_dir_all(&nested).unwrap();
    fs::write(dir.path().join("c.plugin.json"), "{}").unwrap();
    fs::write(dir.path().join("a.plugin.json"), "{}").unwrap();
    fs::write(nested.join("d.plugin.json"), "{}").unwrap();
    fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

    let found = find_files(dir.path(), &|p: &Path| has_extension(p, "json")).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["a.plugin.json", "d.plugin.json", "c.plugin.json"]);
}

#[test]
fn test_find_files_missing_path_is_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let found = find_files(dir.path().join("missing"), &|_: &Path| true).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_has_extension_ignores_case() {
    assert!(has_extension(Path::new("Book.RS"), "rs"));
    assert!(!has_extension(Path::new("Book"), "rs"));
}
