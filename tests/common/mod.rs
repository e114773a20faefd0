//! Byte-level builder for synthetic compiled entries, so tests control
//! every field of the format without fixture files.
#![allow(dead_code)]

use tinfo::Entry;

#[derive(Clone, Copy, PartialEq)]
pub enum Width {
    Bits16,
    Bits32,
}

pub struct Image {
    pub width: Width,
    pub names: &'static str,
    pub booleans: Vec<u8>,
    pub numbers: Vec<i32>,
    pub strings: Vec<Option<Vec<u8>>>,
    pub extended: Option<Extended>,
}

pub struct Extended {
    pub booleans: Vec<(&'static str, u8)>,
    pub numbers: Vec<(&'static str, i32)>,
    pub strings: Vec<(&'static str, Option<Vec<u8>>)>,
}

impl Default for Image {
    fn default() -> Self {
        Self {
            width: Width::Bits16,
            names: "fixture|synthetic test terminal",
            booleans: Vec::new(),
            numbers: Vec::new(),
            strings: Vec::new(),
            extended: None,
        }
    }
}

fn short(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&(value as i16).to_le_bytes());
}

fn number(buf: &mut Vec<u8>, width: Width, value: i32) {
    match width {
        Width::Bits16 => short(buf, value),
        Width::Bits32 => buf.extend_from_slice(&value.to_le_bytes()),
    }
}

impl Image {
    pub fn build(&self) -> Vec<u8> {
        let mut table = Vec::new();
        let mut offsets = Vec::new();
        for value in &self.strings {
            match value {
                Some(bytes) => {
                    offsets.push(table.len() as i32);
                    table.extend_from_slice(bytes);
                    table.push(0);
                }
                None => offsets.push(-1),
            }
        }

        let mut buf = Vec::new();
        short(
            &mut buf,
            match self.width {
                Width::Bits16 => 0x011a,
                Width::Bits32 => 0x021e,
            },
        );
        short(&mut buf, self.names.len() as i32 + 1);
        short(&mut buf, self.booleans.len() as i32);
        short(&mut buf, self.numbers.len() as i32);
        short(&mut buf, self.strings.len() as i32);
        short(&mut buf, table.len() as i32);

        buf.extend_from_slice(self.names.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&self.booleans);
        if (self.names.len() + 1 + self.booleans.len()) % 2 == 1 {
            buf.push(0);
        }
        for &n in &self.numbers {
            number(&mut buf, self.width, n);
        }
        for &offset in &offsets {
            short(&mut buf, offset);
        }
        buf.extend_from_slice(&table);

        if let Some(ext) = &self.extended {
            if table.len() % 2 == 1 {
                buf.push(0);
            }
            ext.build(&mut buf, self.width);
        }
        buf
    }

    pub fn parse(&self) -> Entry {
        Entry::parse(&self.build()).expect("fixture image decodes")
    }
}

impl Extended {
    fn build(&self, buf: &mut Vec<u8>, width: Width) {
        let mut values = Vec::new();
        let mut value_offsets = Vec::new();
        for (_, value) in &self.strings {
            match value {
                Some(bytes) => {
                    value_offsets.push(values.len() as i32);
                    values.extend_from_slice(bytes);
                    values.push(0);
                }
                None => value_offsets.push(-1),
            }
        }

        let mut names = Vec::new();
        let mut name_offsets = Vec::new();
        let all_names = self
            .booleans
            .iter()
            .map(|(name, _)| *name)
            .chain(self.numbers.iter().map(|(name, _)| *name))
            .chain(self.strings.iter().map(|(name, _)| *name));
        for name in all_names {
            name_offsets.push(names.len() as i32);
            names.extend_from_slice(name.as_bytes());
            names.push(0);
        }

        short(buf, self.booleans.len() as i32);
        short(buf, self.numbers.len() as i32);
        short(buf, self.strings.len() as i32);
        // only present strings are counted, absent offsets still occupy
        // the array; the decoder has to cope
        let present = self.strings.iter().filter(|(_, v)| v.is_some()).count();
        short(buf, present as i32);
        short(buf, (values.len() + names.len()) as i32);

        for &(_, value) in &self.booleans {
            buf.push(value);
        }
        if self.booleans.len() % 2 == 1 {
            buf.push(0);
        }
        for &(_, value) in &self.numbers {
            number(buf, width, value);
        }
        for &offset in &value_offsets {
            short(buf, offset);
        }
        for &offset in &name_offsets {
            short(buf, offset);
        }
        buf.extend_from_slice(&values);
        buf.extend_from_slice(&names);
    }
}

/// Entry whose only string capability is `cbt` with the given source;
/// handy for driving the interpreter through a real `Entry`.
pub fn entry_with_string(source: &[u8]) -> Entry {
    Image {
        strings: vec![Some(source.to_vec())],
        ..Image::default()
    }
    .parse()
}
