use std::collections::HashSet;
use std::env;
use std::fs;

use tinfo::{Database, Error};

mod common;
use common::Image;

/// A little on-disk tree shaped like /usr/share/terminfo.
fn scratch_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in ["fixture-vt", "fixture-dumb"] {
        let bucket = dir.path().join(&name[..1]);
        fs::create_dir_all(&bucket).unwrap();
        let image = Image {
            strings: vec![Some(b"\x1b[H".to_vec())],
            ..Image::default()
        };
        fs::write(bucket.join(name), image.build()).unwrap();
    }
    // a deeper nesting level is traversed too
    let deep = dir.path().join("deep/er");
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("fixture-deep"), Image::default().build()).unwrap();
    dir
}

#[test]
fn test_open_and_enumerate() {
    let dir = scratch_tree();
    let db = Database::open(dir.path()).unwrap();

    let names: HashSet<&str> = db.names().collect();
    assert_eq!(
        HashSet::from(["fixture-vt", "fixture-dumb", "fixture-deep"]),
        names
    );
    // no duplicate leaf names in a well-formed tree
    assert_eq!(3, db.names().count());
    assert!(db.contains("fixture-vt"));
    assert!(!db.contains("missing"));
}

#[test]
fn test_load() {
    let dir = scratch_tree();
    let db = Database::open(dir.path()).unwrap();

    let entry = db.load("fixture-vt").unwrap();
    assert_eq!("fixture", entry.names().brief());
    assert_eq!(Some(b"\x1b[H".as_slice()), entry.string("cbt"));

    assert!(matches!(
        db.load("missing"),
        Err(Error::NotFound(name)) if name == "missing"
    ));
}

#[test]
fn test_open_missing_root() {
    let dir = scratch_tree();
    let bogus = dir.path().join("not-there");
    assert!(matches!(Database::open(bogus), Err(Error::Io(_))));
}

#[test]
fn test_load_default() {
    let dir = scratch_tree();
    let db = Database::open(dir.path()).unwrap();

    // the scratch names are not real terminals, so an inherited $TERM can
    // only miss; an unset one exercises the fallback and Config paths
    match env::var("TERM") {
        Ok(term) if !term.is_empty() => {
            assert!(matches!(db.load_default(None), Err(Error::NotFound(name)) if name == term));
            assert!(
                matches!(db.load_default(Some("fixture-vt")), Err(Error::NotFound(name)) if name == term)
            );
        }
        _ => {
            assert!(matches!(db.load_default(None), Err(Error::Config(_))));
            let entry = db.load_default(Some("fixture-vt")).unwrap();
            assert_eq!("fixture", entry.names().brief());
        }
    }
}

/// The system database, when present, must index without leaf collisions.
#[test]
fn test_system_database_unique_names() {
    let root = std::path::Path::new("/usr/share/terminfo");
    if !root.is_dir() {
        return;
    }
    let mut seen = HashSet::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for dir_entry in fs::read_dir(&dir).unwrap() {
            let path = dir_entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let name = path.file_name().unwrap().to_str().unwrap().to_owned();
                assert!(seen.insert(name), "duplicate leaf {}", path.display());
            }
        }
    }

    let db = Database::open(root).unwrap();
    assert_eq!(seen.len(), db.names().count());
    let entry = db.load(db.names().next().unwrap()).unwrap();
    assert!(!entry.names().brief().is_empty());
}
