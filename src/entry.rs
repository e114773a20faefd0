use std::collections::BTreeMap;

use num_enum::TryFromPrimitive;

use crate::bytes::{Cursor, c_string};
use crate::caps;
use crate::error::Error;

/// The two legal file magics. The choice fixes the width of every numeric
/// field in the entry, extended section included; string offsets stay 16-bit
/// in both formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum Magic {
    /// Original format, 16-bit numbers
    Numbers16 = 0x011a,
    /// ncurses 6 format, 32-bit numbers
    Numbers32 = 0x021e,
}

impl Magic {
    fn number_width(self) -> usize {
        match self {
            Self::Numbers16 => 2,
            Self::Numbers32 => 4,
        }
    }
}

/// The `|`-separated name list at the front of an entry.
///
/// First field is the short alias the entry is looked up by, the last is a
/// human-readable description, anything between is a synonym. One- and
/// two-field lists simply have no synonyms and then no description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermNames {
    brief: String,
    synonyms: Vec<String>,
    detailed: Option<String>,
}

impl TermNames {
    fn parse(blob: &[u8]) -> Self {
        let text = String::from_utf8_lossy(blob);
        let mut fields: Vec<String> = text.split('|').map(str::to_owned).collect();
        let brief = fields.remove(0);
        let detailed = fields.pop();
        Self {
            brief,
            synonyms: fields,
            detailed,
        }
    }

    pub fn brief(&self) -> &str {
        &self.brief
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    pub fn detailed(&self) -> Option<&str> {
        self.detailed.as_deref()
    }
}

/// One decoded terminfo entry.
///
/// Standard capabilities are keyed by their ncurses short name from
/// [`caps`]; extended (user-defined) capabilities are merged into the same
/// three maps under the names carried by the entry itself. A capability
/// that is absent in the file never appears here, so lookups need no
/// negative-value convention.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    names: TermNames,
    booleans: BTreeMap<String, bool>,
    numbers: BTreeMap<String, i32>,
    strings: BTreeMap<String, Vec<u8>>,
    wide_numbers: bool,
    extended: bool,
}

impl Entry {
    /// Decode a compiled entry from bytes.
    ///
    /// Either every block parses and a complete `Entry` comes back, or the
    /// first malformation aborts the whole decode; there is no partial
    /// result to observe.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(data);

        let magic = Magic::try_from(cur.read_i16()? as u16)
            .map_err(|_| Error::Format("bad magic"))?;
        let width = magic.number_width();

        let size_names = non_negative(cur.read_i16()?)?;
        let n_bool = bounded(cur.read_i16()?, caps::BOOLEANS.len())?;
        let n_num = bounded(cur.read_i16()?, caps::NUMBERS.len())?;
        let n_str = bounded(cur.read_i16()?, caps::STRINGS.len())?;
        let size_str = non_negative(cur.read_i16()?)?;

        // `size_names` counts the trailing NUL
        let names_blob = cur.read_bytes(size_names)?;
        let names_blob = names_blob
            .split(|&b| b == 0)
            .next()
            .unwrap_or_default();

        let mut entry = Entry {
            names: TermNames::parse(names_blob),
            wide_numbers: magic == Magic::Numbers32,
            ..Self::default()
        };

        for name in caps::BOOLEANS.iter().take(n_bool) {
            if cur.read_u8()? != 0 {
                entry.booleans.insert((*name).to_owned(), true);
            }
        }
        cur.skip_pad(size_names + n_bool);

        for name in caps::NUMBERS.iter().take(n_num) {
            let value = cur.read_number(width)?;
            if value >= 0 {
                entry.numbers.insert((*name).to_owned(), value);
            }
        }

        let mut offsets = Vec::with_capacity(n_str);
        for _ in 0..n_str {
            offsets.push(cur.read_i16()?);
        }
        let table = cur.read_bytes(size_str)?;
        for (name, &offset) in caps::STRINGS.iter().zip(&offsets) {
            if offset < 0 {
                continue;
            }
            let (value, _) = c_string(table, offset as usize)?;
            entry.strings.insert((*name).to_owned(), value.to_vec());
        }
        cur.skip_pad(size_str);

        if !cur.is_at_end() {
            entry.parse_extended(&mut cur, width)?;
            entry.extended = true;
        }

        Ok(entry)
    }

    /// Decode the extended (user-defined capability) section.
    ///
    /// Layout: header, booleans, pad, numbers, string value offsets, name
    /// offsets, string table. The table holds the value strings first and
    /// the capability names after them; name offsets are relative to the
    /// byte past the last value string's terminator.
    fn parse_extended(&mut self, cur: &mut Cursor<'_>, width: usize) -> Result<(), Error> {
        let n_bool = non_negative(cur.read_i16()?)?;
        let n_num = non_negative(cur.read_i16()?)?;
        // capability slots vs. strings actually present in the offset table
        let n_str = non_negative(cur.read_i16()?)?;
        let n_present = non_negative(cur.read_i16()?)?;
        let size_str = non_negative(cur.read_i16()?)?;

        let mut bools = Vec::with_capacity(n_bool);
        for _ in 0..n_bool {
            bools.push(cur.read_u8()? != 0);
        }
        cur.skip_pad(n_bool);

        let mut numbers = Vec::with_capacity(n_num);
        for _ in 0..n_num {
            numbers.push(cur.read_number(width)?);
        }

        // The offset array is declared as `n_present` entries, but absent
        // slots were left out of that count even though they occupy the
        // array. Keep extending by the number of negatives seen until a
        // pass turns up no new ones. Entries in the wild depend on this.
        let mut value_offsets: Vec<i16> = Vec::new();
        let mut pending = n_present;
        let mut absent_seen = 0;
        while pending > 0 {
            for _ in 0..pending {
                value_offsets.push(cur.read_i16()?);
            }
            let absent = value_offsets.iter().filter(|&&o| o < 0).count();
            pending = absent - absent_seen;
            absent_seen = absent;
        }

        let mut name_offsets = Vec::with_capacity(n_bool + n_num + n_str);
        for _ in 0..n_bool + n_num + n_str {
            name_offsets.push(cur.read_i16()?);
        }

        let table = cur.read_bytes(size_str)?;

        let mut values: Vec<Option<Vec<u8>>> = Vec::with_capacity(n_str);
        let mut caps_end = None;
        for &offset in value_offsets.iter().take(n_str) {
            if offset < 0 {
                values.push(None);
                continue;
            }
            let (value, nul) = c_string(table, offset as usize)?;
            caps_end = Some(nul);
            values.push(Some(value.to_vec()));
        }
        // fewer offsets than slots: the tail slots are absent
        values.resize(n_str, None);

        // Rebase name offsets past the value strings. With no values the
        // names simply start the table.
        let names_base = caps_end.map_or(0, |nul| nul + 1);
        let mut names = Vec::with_capacity(name_offsets.len());
        for &offset in &name_offsets {
            if offset < 0 {
                names.push(None);
                continue;
            }
            let (name, _) = c_string(table, names_base + offset as usize)?;
            names.push(Some(String::from_utf8_lossy(name).into_owned()));
        }

        let mut names = names.into_iter();
        for &value in &bools {
            match names.next() {
                Some(Some(name)) if value => {
                    self.booleans.insert(name, true);
                }
                Some(_) => {}
                None => return Ok(()),
            }
        }
        for &value in &numbers {
            match names.next() {
                Some(Some(name)) if value >= 0 => {
                    self.numbers.insert(name, value);
                }
                Some(_) => {}
                None => return Ok(()),
            }
        }
        for value in values {
            match (names.next(), value) {
                (Some(Some(name)), Some(value)) => {
                    self.strings.insert(name, value);
                }
                (Some(_), _) => {}
                (None, _) => return Ok(()),
            }
        }

        Ok(())
    }

    pub fn names(&self) -> &TermNames {
        &self.names
    }

    /// Boolean capabilities present in the entry; a listed name is true.
    pub fn booleans(&self) -> &BTreeMap<String, bool> {
        &self.booleans
    }

    pub fn numbers(&self) -> &BTreeMap<String, i32> {
        &self.numbers
    }

    /// Raw (unexpanded) string capabilities.
    pub fn strings(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.strings
    }

    pub fn boolean(&self, name: &str) -> bool {
        self.booleans.contains_key(name)
    }

    pub fn number(&self, name: &str) -> Option<i32> {
        self.numbers.get(name).copied()
    }

    pub fn string(&self, name: &str) -> Option<&[u8]> {
        self.strings.get(name).map(Vec::as_slice)
    }

    /// True iff the entry was compiled with the 32-bit-number magic.
    #[must_use]
    pub fn is_32bit(&self) -> bool {
        self.wide_numbers
    }

    /// True iff the entry carries an extended capability section.
    #[must_use]
    pub fn is_extended(&self) -> bool {
        self.extended
    }
}

fn non_negative(value: i16) -> Result<usize, Error> {
    usize::try_from(value).map_err(|_| Error::Format("bad table size"))
}

fn bounded(value: i16, limit: usize) -> Result<usize, Error> {
    let count = non_negative(value)?;
    if count > limit {
        return Err(Error::Format("bad table size"));
    }
    Ok(count)
}

#[test]
fn test_term_names() {
    let names = TermNames::parse(b"xterm|xterm-debian|X11 terminal emulator");
    assert_eq!("xterm", names.brief());
    assert_eq!(["xterm-debian".to_owned()], names.synonyms());
    assert_eq!(Some("X11 terminal emulator"), names.detailed());

    let names = TermNames::parse(b"dumb|80-column dumb tty");
    assert_eq!("dumb", names.brief());
    assert!(names.synonyms().is_empty());
    assert_eq!(Some("80-column dumb tty"), names.detailed());

    let names = TermNames::parse(b"crt");
    assert_eq!("crt", names.brief());
    assert!(names.synonyms().is_empty());
    assert_eq!(None, names.detailed());
}
