use std::fs;
use std::path::Path;

use tinfo::{Entry, Error};

mod common;
use common::{Extended, Image, Width};

#[test]
fn test_basic_16bit() {
    let entry = Image {
        names: "demo|demo-alias|Synthetic demo terminal",
        booleans: vec![1, 0, 0, 0, 1],
        numbers: vec![80, -1, 24],
        strings: vec![None, Some(b"\x07".to_vec()), Some(b"\r".to_vec())],
        ..Image::default()
    }
    .parse();

    assert_eq!("demo", entry.names().brief());
    assert_eq!(["demo-alias".to_owned()], entry.names().synonyms());
    assert_eq!(Some("Synthetic demo terminal"), entry.names().detailed());

    // booleans: position 0 = bw, position 4 = xenl
    assert!(entry.boolean("bw"));
    assert!(entry.boolean("xenl"));
    assert!(!entry.boolean("am"));

    // numbers: cols, it (absent), lines
    assert_eq!(Some(80), entry.number("cols"));
    assert_eq!(Some(24), entry.number("lines"));
    assert_eq!(None, entry.number("it"));

    // strings: cbt (absent), bel, cr
    assert_eq!(None, entry.string("cbt"));
    assert_eq!(Some(b"\x07".as_slice()), entry.string("bel"));
    assert_eq!(Some(b"\r".as_slice()), entry.string("cr"));

    assert!(!entry.is_32bit());
    assert!(!entry.is_extended());
}

#[test]
fn test_basic_32bit() {
    let entry = Image {
        width: Width::Bits32,
        booleans: vec![0, 1],
        numbers: vec![80, 0x7fff_ffff, -1],
        strings: vec![Some(b"\x1b[H\x1b[2J".to_vec())],
        ..Image::default()
    }
    .parse();

    assert!(entry.is_32bit());
    assert!(entry.boolean("am"));
    assert_eq!(Some(80), entry.number("cols"));
    assert_eq!(Some(0x7fff_ffff), entry.number("it"));
    assert_eq!(None, entry.number("lines"));
    assert_eq!(Some(b"\x1b[H\x1b[2J".as_slice()), entry.string("cbt"));
}

#[test]
fn test_no_ghost_capabilities() {
    // negative raw values never surface in the maps
    let entry = Image {
        numbers: vec![-1, -2, 5],
        strings: vec![None, None, Some(b"x".to_vec())],
        ..Image::default()
    }
    .parse();
    assert_eq!(1, entry.numbers().len());
    assert_eq!(1, entry.strings().len());
    assert!(entry.numbers().values().all(|&v| v >= 0));
}

#[test]
fn test_odd_name_padding() {
    // size_names + n_bool is odd, so a pad byte sits before the numbers
    let entry = Image {
        names: "vt",
        booleans: vec![1, 1],
        numbers: vec![132],
        strings: vec![Some(b"ok".to_vec())],
        ..Image::default()
    }
    .parse();
    assert_eq!(Some(132), entry.number("cols"));
    assert_eq!(Some(b"ok".as_slice()), entry.string("cbt"));
}

#[test]
fn test_bad_magic() {
    let mut data = Image::default().build();
    // little-endian 0x021a: neither legal magic
    data[0] = 0x1a;
    data[1] = 0x02;
    assert!(matches!(
        Entry::parse(&data),
        Err(Error::Format("bad magic"))
    ));
}

#[test]
fn test_short_read() {
    let data = Image {
        numbers: vec![80, 24],
        strings: vec![Some(b"bell".to_vec())],
        ..Image::default()
    }
    .build();
    for len in [1, 6, 13, data.len() - 1] {
        assert!(
            matches!(Entry::parse(&data[..len]), Err(Error::Format(_))),
            "prefix of {len} bytes must not decode"
        );
    }
}

#[test]
fn test_impossible_table_sizes() {
    let mut data = Image::default().build();
    // boolean count beyond the standard table
    data[4] = 0xff;
    data[5] = 0x7f;
    assert!(matches!(
        Entry::parse(&data),
        Err(Error::Format("bad table size"))
    ));
}

#[test]
fn test_extended_section() {
    let entry = Image {
        booleans: vec![1],
        numbers: vec![80],
        strings: vec![Some(b"\x07".to_vec())],
        extended: Some(Extended {
            booleans: vec![("AX", 1), ("XT", 1), ("G0", 0)],
            numbers: vec![("U8", 1), ("rgb", -1)],
            strings: vec![
                ("Setulc", None),
                ("Smulx", Some(b"\x1b[4:%p1%dm".to_vec())),
            ],
        }),
        ..Image::default()
    }
    .parse();

    assert!(entry.is_extended());

    // standard and extended capabilities share the maps
    assert!(entry.boolean("bw"));
    assert!(entry.boolean("AX"));
    assert!(entry.boolean("XT"));
    // a zero extended boolean is absent, not false
    assert!(!entry.booleans().contains_key("G0"));

    assert_eq!(Some(1), entry.number("U8"));
    assert_eq!(None, entry.number("rgb"));

    assert_eq!(Some(b"\x1b[4:%p1%dm".as_slice()), entry.string("Smulx"));
    // absent string slot: name consumed, nothing bound
    assert_eq!(None, entry.string("Setulc"));
}

#[test]
fn test_extended_absent_offset_undercount() {
    // two absent slots precede the present one and are not counted by the
    // header's present-string field; the decoder's extension loop has to
    // pick them up before it reads the name offsets
    let entry = Image {
        strings: vec![Some(b"z".to_vec())],
        extended: Some(Extended {
            booleans: Vec::new(),
            numbers: Vec::new(),
            strings: vec![
                ("Alpha", None),
                ("Beta", None),
                ("Gamma", Some(b"\x1b[G".to_vec())),
            ],
        }),
        ..Image::default()
    }
    .parse();

    assert_eq!(None, entry.string("Alpha"));
    assert_eq!(None, entry.string("Beta"));
    assert_eq!(Some(b"\x1b[G".as_slice()), entry.string("Gamma"));
}

#[test]
fn test_extended_32bit_numbers() {
    let entry = Image {
        width: Width::Bits32,
        strings: vec![Some(b"x".to_vec())],
        extended: Some(Extended {
            booleans: Vec::new(),
            numbers: vec![("CO", 0x0100_0000)],
            strings: vec![("Name", Some(b"wide".to_vec()))],
        }),
        ..Image::default()
    }
    .parse();
    assert_eq!(Some(0x0100_0000), entry.number("CO"));
    assert_eq!(Some(b"wide".as_slice()), entry.string("Name"));
}

/// Decode-totality sweep over the host database, when one is installed.
#[test]
fn test_system_database_decodes() {
    let root = Path::new("/usr/share/terminfo");
    if !root.is_dir() {
        return;
    }
    let mut seen = 0;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for dir_entry in fs::read_dir(&dir).unwrap() {
            let path = dir_entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let data = fs::read(&path).unwrap();
            let entry = Entry::parse(&data)
                .unwrap_or_else(|err| panic!("{} failed to decode: {err}", path.display()));
            assert!(
                !entry.names().brief().is_empty(),
                "{} has no name",
                path.display()
            );
            seen += 1;
        }
    }
    assert!(seen > 0);
}
