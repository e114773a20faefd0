//! Dump a terminfo entry the way `infocmp -1` would: names first, then
//! every boolean, numeric, and string capability.
//!
//! Takes either an entry name (resolved against `/usr/share/terminfo`) or a
//! path to a compiled entry.

use tinfo::{Database, Entry, Error};

fn main() {
    let arg = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TERM").ok())
        .expect("provide a terminal name or a path to a compiled entry");

    let entry = load(&arg).unwrap();

    let names = entry.names();
    print!("#\t{}", names.brief());
    for synonym in names.synonyms() {
        print!("|{synonym}");
    }
    if let Some(detailed) = names.detailed() {
        print!("|{detailed}");
    }
    println!(
        "\t({} numbers{})",
        if entry.is_32bit() { "32-bit" } else { "16-bit" },
        if entry.is_extended() { ", extended" } else { "" }
    );

    for name in entry.booleans().keys() {
        println!("\t{name},");
    }
    for (name, value) in entry.numbers() {
        println!("\t{name}#{value},");
    }
    for (name, value) in entry.strings() {
        println!("\t{name}={},", printable(value));
    }
}

fn load(arg: &str) -> Result<Entry, Error> {
    if arg.contains('/') {
        Entry::parse(&std::fs::read(arg)?)
    } else {
        Database::open("/usr/share/terminfo")?.load(arg)
    }
}

/// Render capability bytes with `^X` / `\xxx` escapes, like infocmp does.
fn printable(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            0x1b => out.push_str("\\E"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            0x01..=0x1a => {
                out.push('^');
                out.push((b'@' + b) as char);
            }
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out
}
