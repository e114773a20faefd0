use bitflags::bitflags;

use crate::error::Error;
use crate::vm::Value;

bitflags! {
    /// Conversion flags on a `%` print token.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PrintFlags: u8 {
        /// `-`: left-justify within the field width
        const LEFT = 1 << 0;
        /// `+`: always print a sign
        const SIGN = 1 << 1;
        /// ` `: print a space where the sign would go
        const SPACE = 1 << 2;
        /// `#`: alternate form (`0`, `0x`, `0X` prefixes)
        const ALTERNATE = 1 << 3;
        /// width given with a leading zero: fill with zeros, not spaces
        const ZERO = 1 << 4;
    }
}

/// One parsed `%[flags][width[.precision]]{c,d,o,x,X,s}` conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub conversion: u8,
    pub flags: PrintFlags,
    pub width: usize,
    pub precision: Option<usize>,
}

/// Format one popped value the way C `printf` would.
pub(crate) fn format(spec: &FormatSpec, value: &Value) -> Result<Vec<u8>, Error> {
    match spec.conversion {
        b's' => {
            let Value::Str(s) = value else {
                return Err(Error::Type("%s applied to a number"));
            };
            let mut bytes = s.clone();
            if let Some(precision) = spec.precision {
                bytes.truncate(precision);
            }
            Ok(pad(spec, Vec::new(), bytes))
        }
        b'c' => {
            let Value::Int(n) = value else {
                return Err(Error::Type("%c applied to a string"));
            };
            Ok(pad(spec, Vec::new(), vec![*n as u8]))
        }
        _ => {
            let Value::Int(n) = value else {
                return Err(Error::Type("numeric conversion applied to a string"));
            };
            Ok(number(spec, *n))
        }
    }
}

fn number(spec: &FormatSpec, n: i32) -> Vec<u8> {
    // printf ignores the `0` flag on d/o/x/X whenever a precision is given
    let mut spec = spec.clone();
    if spec.precision.is_some() {
        spec.flags -= PrintFlags::ZERO;
    }
    let spec = &spec;

    let magnitude = i64::from(n).unsigned_abs();
    let mut digits = match spec.conversion {
        b'o' => format!("{magnitude:o}"),
        b'x' => format!("{magnitude:x}"),
        b'X' => format!("{magnitude:X}"),
        _ => magnitude.to_string(),
    }
    .into_bytes();

    let mut prefix = Vec::new();
    if n < 0 {
        prefix.push(b'-');
    } else if spec.flags.contains(PrintFlags::SIGN) {
        prefix.push(b'+');
    } else if spec.flags.contains(PrintFlags::SPACE) {
        prefix.push(b' ');
    }

    if let Some(precision) = spec.precision {
        if precision > digits.len() {
            digits.splice(0..0, std::iter::repeat_n(b'0', precision - digits.len()));
        }
    }

    if spec.flags.contains(PrintFlags::ALTERNATE) {
        match spec.conversion {
            // `0` only forces a leading zero; precision padding may already
            // have supplied one
            b'o' if digits[0] != b'0' => prefix.push(b'0'),
            b'x' => prefix.extend_from_slice(b"0x"),
            b'X' => prefix.extend_from_slice(b"0X"),
            _ => {}
        }
    }

    pad(spec, prefix, digits)
}

fn pad(spec: &FormatSpec, mut prefix: Vec<u8>, body: Vec<u8>) -> Vec<u8> {
    let fill = spec.width.saturating_sub(prefix.len() + body.len());
    if spec.flags.contains(PrintFlags::LEFT) {
        prefix.extend(body);
        prefix.extend(std::iter::repeat_n(b' ', fill));
        prefix
    } else if spec.flags.contains(PrintFlags::ZERO) {
        // zeros go between the sign/prefix and the digits
        prefix.extend(std::iter::repeat_n(b'0', fill));
        prefix.extend(body);
        prefix
    } else {
        let mut out = Vec::with_capacity(fill + prefix.len() + body.len());
        out.extend(std::iter::repeat_n(b' ', fill));
        out.extend(prefix);
        out.extend(body);
        out
    }
}

#[cfg(test)]
fn spec(conversion: u8, flags: PrintFlags, width: usize, precision: Option<usize>) -> FormatSpec {
    FormatSpec {
        conversion,
        flags,
        width,
        precision,
    }
}

#[cfg(test)]
fn fmt(s: &FormatSpec, v: Value) -> String {
    String::from_utf8(format(s, &v).unwrap()).unwrap()
}

#[test]
fn test_decimal_printf_parity() {
    let f = PrintFlags::empty;
    assert_eq!("42", fmt(&spec(b'd', f(), 0, None), Value::Int(42)));
    assert_eq!("   42", fmt(&spec(b'd', f(), 5, None), Value::Int(42)));
    assert_eq!("42   ", fmt(&spec(b'd', PrintFlags::LEFT, 5, None), Value::Int(42)));
    assert_eq!("00042", fmt(&spec(b'd', PrintFlags::ZERO, 5, None), Value::Int(42)));
    assert_eq!("+42", fmt(&spec(b'd', PrintFlags::SIGN, 0, None), Value::Int(42)));
    assert_eq!(" 42", fmt(&spec(b'd', PrintFlags::SPACE, 0, None), Value::Int(42)));
    assert_eq!("-7", fmt(&spec(b'd', PrintFlags::SIGN, 0, None), Value::Int(-7)));
    assert_eq!("  042", fmt(&spec(b'd', f(), 5, Some(3)), Value::Int(42)));
    assert_eq!("-0042", fmt(&spec(b'd', f(), 0, Some(4)), Value::Int(-42)));
    // zeros go after the sign
    assert_eq!("-0042", fmt(&spec(b'd', PrintFlags::ZERO, 5, None), Value::Int(-42)));
    // a precision turns the zero flag off, the remaining width is spaces
    assert_eq!("  042", fmt(&spec(b'd', PrintFlags::ZERO, 5, Some(3)), Value::Int(42)));
    assert_eq!(" 0xff", fmt(&spec(b'x', PrintFlags::ZERO | PrintFlags::ALTERNATE, 5, Some(2)), Value::Int(255)));
}

#[test]
fn test_radix_printf_parity() {
    let f = PrintFlags::empty;
    assert_eq!("ff", fmt(&spec(b'x', f(), 0, None), Value::Int(255)));
    assert_eq!("0xff", fmt(&spec(b'x', PrintFlags::ALTERNATE, 0, None), Value::Int(255)));
    assert_eq!("0XFF", fmt(&spec(b'X', PrintFlags::ALTERNATE, 0, None), Value::Int(255)));
    assert_eq!("10", fmt(&spec(b'o', f(), 0, None), Value::Int(8)));
    assert_eq!("010", fmt(&spec(b'o', PrintFlags::ALTERNATE, 0, None), Value::Int(8)));
    // precision supplies the leading zero, the alternate prefix is cancelled
    assert_eq!("010", fmt(&spec(b'o', PrintFlags::ALTERNATE, 0, Some(3)), Value::Int(8)));
    assert_eq!("0", fmt(&spec(b'o', PrintFlags::ALTERNATE, 0, None), Value::Int(0)));
    assert_eq!("0ff     ", fmt(&spec(b'x', PrintFlags::LEFT, 8, Some(3)), Value::Int(255)));
}

#[test]
fn test_strings_and_chars() {
    let f = PrintFlags::empty;
    assert_eq!("hello", fmt(&spec(b's', f(), 0, None), Value::Str(b"hello".to_vec())));
    assert_eq!("hel", fmt(&spec(b's', f(), 0, Some(3)), Value::Str(b"hello".to_vec())));
    assert_eq!(" hello", fmt(&spec(b's', f(), 6, None), Value::Str(b"hello".to_vec())));
    assert_eq!("hello ", fmt(&spec(b's', PrintFlags::LEFT, 6, None), Value::Str(b"hello".to_vec())));
    assert_eq!("A", fmt(&spec(b'c', f(), 0, None), Value::Int(65)));
    assert!(format(&spec(b's', f(), 0, None), &Value::Int(1)).is_err());
    assert!(format(&spec(b'd', f(), 0, None), &Value::Str(b"x".to_vec())).is_err());
}
